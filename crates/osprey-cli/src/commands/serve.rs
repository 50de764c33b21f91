//! Serve command implementation

use anyhow::Result;

use osprey_core::config::OspreyConfig;

use crate::cli::ServeArgs;
use crate::output::OutputWriter;

pub async fn execute(args: ServeArgs, config: &OspreyConfig, output: &OutputWriter) -> Result<()> {
    let mut config = config.clone();
    if let Some(listen) = args.listen {
        config.proxy_listen = listen;
    }
    if let Some(upstream) = args.upstream {
        config.upstream_origin = upstream;
    }

    output.info(format!(
        "Caching proxy on {} (upstream {}, tiles {})",
        config.proxy_listen, config.upstream_origin, config.tile_host
    ));

    // Runs until the process is stopped.
    osprey_proxy::run(&config).await?;
    Ok(())
}
