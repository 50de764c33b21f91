//! Site command implementation

use anyhow::Result;

use osprey_core::config::OspreyConfig;

use crate::cli::{SiteArgs, StorageBackend};
use crate::output::OutputWriter;

use super::open_session;

pub async fn execute(
    args: SiteArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (mut session, _storage) = open_session(backend, config).await?;

    let nothing_to_set = args.name.is_none() && args.company.is_none() && args.group.is_none();
    if nothing_to_set {
        let survey = session.survey();
        output.kv("Site", &survey.site_name);
        output.kv("Unit", &survey.company_name);
        output.kv("Group", &survey.group_name);
        session.close().await;
        return Ok(());
    }

    if let Some(name) = args.name {
        session.set_site_name(name);
    }
    if let Some(company) = args.company {
        session.set_company_name(company);
    }
    if let Some(group) = args.group {
        session.set_group_name(group);
    }

    output.success(format!(
        "Project is now '{}' ({} / {})",
        session.survey().site_name,
        session.survey().company_name,
        session.survey().group_name
    ));

    session.close().await;
    Ok(())
}
