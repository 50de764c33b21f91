//! Pole command implementations

use anyhow::Result;
use dialoguer::Confirm;
use tabled::Tabled;

use osprey_core::config::OspreyConfig;
use osprey_core::models::PoleUpdate;

use crate::cli::{PoleAddArgs, PoleArgs, PoleCommand, PoleDeleteArgs, PoleUpdateArgs, StorageBackend};
use crate::output::OutputWriter;

use super::{open_session, resolve_pole};

pub async fn execute(
    args: PoleArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    match args.command {
        PoleCommand::Add(args) => add(args, backend, config, output).await,
        PoleCommand::List => list(backend, config, output).await,
        PoleCommand::Update(args) => update(args, backend, config, output).await,
        PoleCommand::Delete(args) => delete(args, backend, config, output).await,
    }
}

async fn add(
    args: PoleAddArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (mut session, _storage) = open_session(backend, config).await?;

    let id = session.add_pole(args.lat, args.lng, args.alt)?;
    if let Some(notes) = args.notes {
        session.update_pole(id, PoleUpdate { notes: Some(notes), ..Default::default() })?;
    }

    let name = session
        .survey()
        .pole(id)
        .map(|pole| pole.name.clone())
        .unwrap_or_else(|| id.to_string());
    output.success(format!("Placed {name} at {:.6}, {:.6}", args.lat, args.lng));

    session.close().await;
    Ok(())
}

#[derive(Tabled)]
struct PoleListRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Latitude")]
    latitude: String,
    #[tabled(rename = "Longitude")]
    longitude: String,
    #[tabled(rename = "Altitude")]
    altitude: String,
    #[tabled(rename = "Placed")]
    placed: String,
    #[tabled(rename = "Photos")]
    photos: usize,
}

async fn list(
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (session, _storage) = open_session(backend, config).await?;

    let rows: Vec<PoleListRow> = session
        .survey()
        .poles
        .iter()
        .map(|pole| PoleListRow {
            name: pole.name.clone(),
            latitude: format!("{:.6}", pole.latitude),
            longitude: format!("{:.6}", pole.longitude),
            altitude: pole.altitude.map(|alt| format!("{alt:.1} m")).unwrap_or_else(|| "-".into()),
            placed: pole.timestamp.format("%Y-%m-%d %H:%M UTC").to_string(),
            photos: pole.photos.len(),
        })
        .collect();

    if output.is_json() {
        output.result(
            session
                .survey()
                .poles
                .iter()
                .map(|pole| {
                    serde_json::json!({
                        "name": pole.name,
                        "latitude": pole.latitude,
                        "longitude": pole.longitude,
                        "altitude": pole.altitude,
                        "placed": pole.timestamp,
                        "photos": pole.photos.len(),
                    })
                })
                .collect::<Vec<_>>(),
        )?;
    } else {
        output.table(rows);
    }

    session.close().await;
    Ok(())
}

async fn update(
    args: PoleUpdateArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (mut session, _storage) = open_session(backend, config).await?;

    let id = resolve_pole(session.survey(), &args.pole)?;
    session.update_pole(
        id,
        PoleUpdate {
            name: args.name,
            latitude: args.lat,
            longitude: args.lng,
            altitude: args.alt.map(Some),
            notes: args.notes,
        },
    )?;

    let name = session.survey().pole(id).map(|pole| pole.name.clone()).unwrap_or_default();
    output.success(format!("Updated {name}"));

    session.close().await;
    Ok(())
}

async fn delete(
    args: PoleDeleteArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (mut session, _storage) = open_session(backend, config).await?;

    let mut ids = Vec::with_capacity(args.poles.len());
    for name in &args.poles {
        ids.push(resolve_pole(session.survey(), name)?);
    }

    let photo_count: usize = ids
        .iter()
        .filter_map(|id| session.survey().pole(*id))
        .map(|pole| pole.photos.len())
        .sum();

    if !args.yes && !output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} pole(s) and {} photo(s)? This cannot be undone",
                ids.len(),
                photo_count
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output.info("Nothing deleted");
            session.close().await;
            return Ok(());
        }
    }

    session.delete_poles(&ids).await;
    output.success(format!("Deleted {} pole(s)", ids.len()));

    session.close().await;
    Ok(())
}
