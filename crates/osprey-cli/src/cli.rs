use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Osprey - Offline field survey durability and export pipeline
#[derive(Parser, Debug)]
#[command(name = "osprey")]
#[command(about = "Offline field survey durability and export pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend to use (memory or sqlite)
    #[arg(long, global = true, default_value = "sqlite")]
    pub storage: StorageBackend,

    #[command(subcommand)]
    pub command: Commands,
}

/// Storage backend selection
#[derive(Debug, Clone, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-memory storage (nothing survives the process; for development)
    Memory,
    /// SQLite persistent storage (default)
    Sqlite,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show project, save, and storage health status
    Status(StatusArgs),

    /// Rename the project, unit, or survey group
    Site(SiteArgs),

    /// Manage surveyed poles
    Pole(PoleArgs),

    /// Attach and review pole photos
    Photo(PhotoArgs),

    /// Compile the project archive and deliver it
    Export(ExportArgs),

    /// Run the offline caching proxy
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Show per-pole details
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct SiteArgs {
    /// New project (site) name
    #[arg(long)]
    pub name: Option<String>,

    /// New company/unit name
    #[arg(long)]
    pub company: Option<String>,

    /// New survey group name
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Parser, Debug)]
pub struct PoleArgs {
    #[command(subcommand)]
    pub command: PoleCommand,
}

#[derive(Subcommand, Debug)]
pub enum PoleCommand {
    /// Place a new pole at the given coordinate
    Add(PoleAddArgs),

    /// List every pole in the project
    List,

    /// Update a pole's fields
    Update(PoleUpdateArgs),

    /// Delete poles and their photo binaries
    Delete(PoleDeleteArgs),
}

#[derive(Parser, Debug)]
#[command(allow_negative_numbers = true)]
pub struct PoleAddArgs {
    /// Latitude in decimal degrees
    pub lat: f64,

    /// Longitude in decimal degrees
    pub lng: f64,

    /// Altitude in meters, when the fix carried one
    #[arg(long)]
    pub alt: Option<f64>,

    /// Field notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Parser, Debug)]
#[command(allow_negative_numbers = true)]
pub struct PoleUpdateArgs {
    /// Display name of the pole to update (e.g. POLE-001)
    pub pole: String,

    /// New display name
    #[arg(long)]
    pub name: Option<String>,

    /// New latitude in decimal degrees
    #[arg(long)]
    pub lat: Option<f64>,

    /// New longitude in decimal degrees
    #[arg(long)]
    pub lng: Option<f64>,

    /// New altitude in meters
    #[arg(long)]
    pub alt: Option<f64>,

    /// Replacement field notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Parser, Debug)]
pub struct PoleDeleteArgs {
    /// Display names of the poles to delete
    #[arg(required = true)]
    pub poles: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Parser, Debug)]
pub struct PhotoArgs {
    #[command(subcommand)]
    pub command: PhotoCommand,
}

#[derive(Subcommand, Debug)]
pub enum PhotoCommand {
    /// Attach a captured photo to a pole
    Attach(PhotoAttachArgs),

    /// Record a QA verdict on an attached photo
    Review(PhotoReviewArgs),
}

#[derive(Parser, Debug)]
#[command(allow_negative_numbers = true)]
pub struct PhotoAttachArgs {
    /// Display name of the pole the photo belongs to
    pub pole: String,

    /// Path to the full-resolution image file
    pub path: PathBuf,

    /// Path to a small preview image to inline into the document
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Latitude of the GPS fix at shutter time
    #[arg(long, requires = "lng")]
    pub lat: Option<f64>,

    /// Longitude of the GPS fix at shutter time
    #[arg(long, requires = "lat")]
    pub lng: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct PhotoReviewArgs {
    /// Display name of the pole the photo belongs to
    pub pole: String,

    /// One-based index of the photo on that pole
    pub photo: usize,

    /// Verdict (pending, passed, retake)
    #[arg(long)]
    pub status: Option<ReviewVerdict>,

    /// Reviewer remarks
    #[arg(long)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReviewVerdict {
    Pending,
    Passed,
    Retake,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Write the archive here instead of the configured downloads directory
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Skip the save-location and share tiers and go straight to the
    /// downloads directory
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address override (host:port)
    #[arg(long)]
    pub listen: Option<String>,

    /// Upstream application origin override
    #[arg(long)]
    pub upstream: Option<String>,
}
