use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Robbit - Quadtree harvester for geotagged Flickr photos
#[derive(Parser, Debug)]
#[command(name = "robbit")]
#[command(about = "Harvest geotagged photo metadata area by area", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./robbit.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Storage backend to use (memory or postgres)
    #[arg(long, global = true, default_value = "postgres")]
    pub storage: StorageBackend,

    /// PostgreSQL database URL, overrides DATABASE_URL
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-memory storage, lost on exit (for trial runs)
    Memory,
    /// PostgreSQL/PostGIS persistent storage
    Postgres,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan an area, resuming any previous progress
    Scan(ScanArgs),

    /// Discard scan progress: delete every non-root tile and reset the root
    Reset,

    /// Show tile counts per level and the number of harvested images
    Status,

    /// Manage scan areas
    Area(AreaArgs),

    /// Manage the database schema
    Db(DbArgs),
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Name of the area to scan
    #[arg(long, short = 'a')]
    pub area: String,

    /// Register the area from this GeoJSON file before scanning
    #[arg(long, value_name = "FILE")]
    pub area_file: Option<PathBuf>,

    /// Comma separated API keys, override FLICKR_API_KEYS
    #[arg(long, value_name = "KEYS")]
    pub api_keys: Option<String>,

    /// Concurrent tiles per API key
    #[arg(long)]
    pub workers_per_key: Option<usize>,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Parser, Debug)]
pub struct AreaArgs {
    #[command(subcommand)]
    pub command: AreaCommand,
}

#[derive(Subcommand, Debug)]
pub enum AreaCommand {
    /// Add or replace an area from a GeoJSON Polygon, MultiPolygon, Feature or FeatureCollection
    Add(AreaAddArgs),

    /// List area names
    List,
}

#[derive(Parser, Debug)]
pub struct AreaAddArgs {
    /// Area name (letters, digits, '-' and '_')
    pub name: String,

    /// Path to the GeoJSON file
    pub path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Apply pending schema migrations
    Migrate,

    /// Show which migrations are applied
    Status,
}
