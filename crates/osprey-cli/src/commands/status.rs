//! Status command implementation

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use osprey_core::config::OspreyConfig;
use osprey_store::ports::StorageHealth;

use crate::cli::{StatusArgs, StorageBackend};
use crate::output::OutputWriter;

use super::open_session;

#[derive(Serialize)]
struct StatusOutput {
    site_name: String,
    company_name: String,
    group_name: String,
    pole_count: usize,
    photo_count: usize,
    save_status: String,
    durable: bool,
    usage_bytes: u64,
    quota_bytes: u64,
    percent_used: f64,
}

#[derive(Tabled)]
struct PoleRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Latitude")]
    latitude: String,
    #[tabled(rename = "Longitude")]
    longitude: String,
    #[tabled(rename = "Photos")]
    photos: usize,
    #[tabled(rename = "Notes")]
    notes: String,
}

pub async fn execute(
    args: StatusArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (session, storage) = open_session(backend, config).await?;

    let durable = storage.health.request_durability().await;
    let estimate = storage.health.estimate().await;

    let survey = session.survey();
    let photo_count: usize = survey.poles.iter().map(|pole| pole.photos.len()).sum();

    if output.is_json() {
        output.result(StatusOutput {
            site_name: survey.site_name.clone(),
            company_name: survey.company_name.clone(),
            group_name: survey.group_name.clone(),
            pole_count: survey.poles.len(),
            photo_count,
            save_status: session.autosave().current_status().to_string(),
            durable,
            usage_bytes: estimate.usage,
            quota_bytes: estimate.quota,
            percent_used: estimate.percent,
        })?;
    } else {
        output.section("Project");
        output.kv("Site", &survey.site_name);
        output.kv("Unit", &survey.company_name);
        output.kv("Group", &survey.group_name);
        output.kv("Poles", survey.poles.len());
        output.kv("Photos", photo_count);
        output.kv("Save status", session.autosave().current_status());

        output.section("Storage");
        output.kv("Durable", if durable { "yes" } else { "best-effort" });
        output.kv(
            "Usage",
            format!("{} / {} bytes ({:.1}%)", estimate.usage, estimate.quota, estimate.percent),
        );
        if estimate.percent >= 80.0 {
            output.warning("Storage is filling up; export and clear completed work soon");
        }

        if args.verbose {
            output.section("Poles");
            let rows: Vec<PoleRow> = survey
                .poles
                .iter()
                .map(|pole| PoleRow {
                    name: pole.name.clone(),
                    latitude: format!("{:.6}", pole.latitude),
                    longitude: format!("{:.6}", pole.longitude),
                    photos: pole.photos.len(),
                    notes: pole.notes.clone(),
                })
                .collect();
            output.table(rows);
        }
    }

    session.close().await;
    Ok(())
}
