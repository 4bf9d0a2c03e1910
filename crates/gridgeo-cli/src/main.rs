use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use gridgeo_cli::cli::{Cli, Commands};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::query::Target;
use commands::AppContext;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let ctx = match AppContext::load(cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let level = match log_level(&cli, &ctx) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: could not install log subscriber: {err}");
    }

    match run(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// `--log-level` wins over `[logging] level`.
fn log_level(cli: &Cli, ctx: &AppContext) -> Result<Level> {
    match cli.log_level {
        Some(level) => Ok(level),
        None => ctx
            .config
            .logging
            .level
            .parse::<Level>()
            .with_context(|| format!("invalid [logging] level '{}'", ctx.config.logging.level)),
    }
}

fn run(cli: &Cli, ctx: &AppContext) -> Result<()> {
    match &cli.command {
        Commands::Substations(args) => commands::query::handle(ctx, Target::Substations, args),
        Commands::Lines(args) => commands::query::handle(ctx, Target::Lines, args),
        Commands::Import { command } => commands::import::handle(ctx, command),
        Commands::Graph { network, countries } => {
            commands::graph::handle(ctx, network.as_deref(), countries)
        }
    }
}
