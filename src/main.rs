mod bulk;
mod cli;
mod commands;
mod ingest;
mod model;
mod quote;
mod search;
mod store;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Add(args) => commands::item::run_add(args),
        Commands::Edit(args) => commands::item::run_edit(args),
        Commands::Remove(args) => commands::item::run_remove(args),
        Commands::Clear(args) => commands::item::run_clear(args),
        Commands::List(args) => commands::item::run_list(args),
        Commands::Search(args) => commands::search::run(args),
        Commands::Price(args) => commands::price::run(args),
        Commands::Import(args) => commands::import::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Category(args) => commands::category::run(args),
        Commands::Activity(args) => commands::activity::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
