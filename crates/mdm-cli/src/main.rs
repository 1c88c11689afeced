//! MDM CLI - Main entry point

use clap::Parser;
use mdm_cli::api::ApiClient;
use mdm_cli::state::ResultStore;
use mdm_cli::{Cli, Commands};
use mdm_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("mdm-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> mdm_cli::Result<()> {
    let client = ApiClient::new(cli.server_url.clone())?;
    let store = ResultStore::new(&cli.state_dir);

    match &cli.command {
        Commands::Import {
            table,
            file,
            format,
            no_wait,
            interval_ms,
        } => {
            mdm_cli::commands::import::run(
                &client,
                table,
                file,
                format.as_deref(),
                *no_wait,
                *interval_ms,
            )
            .await
        }

        Commands::Jobs { status, table } => {
            mdm_cli::commands::jobs::run(&client, status.as_deref(), table.as_deref()).await
        }

        Commands::Status { job_id } => mdm_cli::commands::status::run(&client, *job_id).await,

        Commands::Result {
            job_id,
            json,
            refresh,
        } => mdm_cli::commands::result::run(&client, &store, *job_id, *json, *refresh).await,

        Commands::Retry { job_id, row, set } => {
            mdm_cli::commands::retry::run(&client, &store, *job_id, *row, set).await
        }

        Commands::Tables => mdm_cli::commands::tables::run(&client).await,
    }
}
