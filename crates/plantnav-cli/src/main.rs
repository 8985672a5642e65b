//! plantnav CLI
//!
//! Inspect rule tables and replay navigation sequences offline

use clap::{Parser, Subcommand};
use plantnav_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "plantnav")]
#[command(about = "plantnav - Mode and panel navigation rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rule table operations
    Rules(commands::rules::RulesArgs),
    /// Print the composed layer map of a mode/submode
    Layers(commands::layers::LayersArgs),
    /// Print which panels may stay open in a mode/submode
    Panels(commands::panels::PanelsArgs),
    /// Replay navigation steps against in-memory collaborators
    Simulate(commands::simulate::SimulateArgs),
}

fn main() {
    init(Profile::Development);
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Rules(args) => commands::rules::execute(args),
        Commands::Layers(args) => commands::layers::execute(args),
        Commands::Panels(args) => commands::panels::execute(args),
        Commands::Simulate(args) => commands::simulate::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
