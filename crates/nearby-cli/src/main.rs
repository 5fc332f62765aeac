//! nearby - command-line interface for LAN broadcast peer discovery.
//!
//! Lists devices that announce themselves on the local network, and can
//! announce this machine so other instances find it.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod settings;

use clap::Parser;

use cli::{Cli, Commands};
use error::{exit_codes, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = settings::load_config(&cli)?;

    match cli.command {
        Commands::Discover(args) => commands::run_discover(args, config, cli.json).await,
        Commands::Announce(args) => commands::run_announce(args, &config, cli.json).await,
        Commands::Interfaces => commands::run_interfaces(cli.json),
    }
}
