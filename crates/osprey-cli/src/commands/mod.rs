//! Command implementations

mod export;
mod photo;
mod pole;
mod serve;
mod site;
mod status;

use anyhow::Result;

use osprey_core::config::OspreyConfig;
use osprey_core::models::{PoleId, SiteSurvey};
use osprey_session::Session;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use crate::storage::Storage;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = OspreyConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Status(args) => status::execute(args, &cli.storage, &config, &output).await,
        Commands::Site(args) => site::execute(args, &cli.storage, &config, &output).await,
        Commands::Pole(args) => pole::execute(args, &cli.storage, &config, &output).await,
        Commands::Photo(args) => photo::execute(args, &cli.storage, &config, &output).await,
        Commands::Export(args) => export::execute(args, &cli.storage, &config, &output).await,
        Commands::Serve(args) => serve::execute(args, &config, &output).await,
    }
}

/// Open a field session against the selected backend.
async fn open_session(backend: &crate::cli::StorageBackend, config: &OspreyConfig) -> Result<(Session, Storage)> {
    let storage = Storage::new(backend, config).await?;
    tracing::debug!(backend = ?backend, "Opening field session");
    let session = Session::open(
        storage.documents.clone(),
        storage.blobs.clone(),
        storage.health.clone(),
        config.autosave_tuning(),
    )
    .await;
    Ok((session, storage))
}

/// Resolve a pole by its display name, case-insensitively.
fn resolve_pole(survey: &SiteSurvey, name: &str) -> Result<PoleId> {
    survey
        .poles
        .iter()
        .find(|pole| pole.name.eq_ignore_ascii_case(name))
        .map(|pole| pole.id)
        .ok_or_else(|| anyhow::anyhow!("No pole named '{name}' in this project"))
}
