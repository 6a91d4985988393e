//! Command implementations

mod area;
mod db;
mod reset;
mod scan;
mod status;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_settings;
use crate::output::OutputWriter;
use anyhow::Result;
use robbit_core::config::{parse_list, CliConfigOverrides};

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    let mut overrides =
        CliConfigOverrides { database_url: cli.database_url.clone(), ..CliConfigOverrides::default() };
    if let Commands::Scan(args) = &cli.command {
        overrides.api_keys = args.api_keys.as_deref().map(parse_list);
        overrides.workers_per_key = args.workers_per_key;
    }
    let settings = load_settings(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Scan(args) => scan::execute(args, cli.storage, &settings, &output).await,
        Commands::Reset => reset::execute(cli.storage, &settings, &output).await,
        Commands::Status => status::execute(cli.storage, &settings, &output).await,
        Commands::Area(args) => area::execute(args, cli.storage, &settings, &output).await,
        Commands::Db(args) => db::execute(args, &settings, &output).await,
    }
}
