//! Vibe CLI - drive the offline write queue from the terminal
//!
//! Lists and flushes pending mutations, records check-ins and votes through
//! the same offline-tolerant services the apps use, and can watch
//! connectivity to flush automatically.

mod auth;
mod cli;
mod commands;
mod config_file;
mod error;


use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::checkin::run_checkin;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::queue::run_queue;
use crate::commands::vote::run_vote;
use crate::commands::watch::run_watch;
use crate::config_file::resolve;
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "vibe=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive: Directive = DEFAULT_LOG_DIRECTIVE
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let db_path = cli.db_path.as_deref();

    match cli.command {
        Commands::Queue { command } => {
            let config = resolve(config_path, db_path).map_err(CliError::Config)?;
            run_queue(command, &config).await?;
        }
        Commands::Checkin {
            answers,
            score,
            notes,
            date,
        } => {
            let config = resolve(config_path, db_path).map_err(CliError::Config)?;
            run_checkin(&answers, score, notes, date, &config).await?;
        }
        Commands::Vote { question_id, vote } => {
            let config = resolve(config_path, db_path).map_err(CliError::Config)?;
            run_vote(&question_id, vote.into(), &config).await?;
        }
        Commands::Watch { probe_url } => {
            let config = resolve(config_path, db_path).map_err(CliError::Config)?;
            run_watch(probe_url.as_deref(), &config).await?;
        }
        Commands::Auth { command } => {
            let config = resolve(config_path, db_path).map_err(CliError::Config)?;
            run_auth(command, &config.client).await?;
        }
        Commands::Config { command } => run_config(command, config_path)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
