//! MDM CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line client for the MDM import service.
//!
//! # Overview
//!
//! - **Imports**: Upload a file into a target table and follow its progress (`mdm import`)
//! - **Jobs**: List import jobs and inspect one of them (`mdm jobs`, `mdm status`)
//! - **Results**: Show the failed rows of a finished import (`mdm result`)
//! - **Retries**: Fix one failed row and send it again (`mdm retry`)
//! - **Tables**: List importable tables and their fields (`mdm tables`)
//!
//! Results fetched by `mdm result` are kept in the state directory, so a
//! series of `mdm retry` calls reconciles against the same local copy.

pub mod api;
pub mod commands;
pub mod error;
pub mod progress;
pub mod state;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// MDM - master data import client
#[derive(Parser, Debug)]
#[command(name = "mdm")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(long, env = "MDM_SERVER_URL", default_value = "http://localhost:8000", global = true)]
    pub server_url: String,

    /// Directory holding fetched import results
    #[arg(long, env = "MDM_STATE_DIR", default_value = ".mdm", global = true)]
    pub state_dir: PathBuf,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file into a target table
    Import {
        /// Target table (see `mdm tables`)
        table: String,

        /// File to upload
        file: PathBuf,

        /// File format (csv, json, jsonl); guessed from the file name when omitted
        #[arg(short, long)]
        format: Option<String>,

        /// Return right after the upload instead of following progress
        #[arg(long)]
        no_wait: bool,

        /// Milliseconds between progress polls
        #[arg(long, default_value = "500")]
        interval_ms: u64,
    },

    /// List import jobs
    Jobs {
        /// Only jobs in this status (uploading, processing, completed, failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Only jobs for this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Show one import job
    Status {
        /// Job ID
        job_id: Uuid,
    },

    /// Show the result of a finished import
    Result {
        /// Job ID
        job_id: Uuid,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Fetch the result again, discarding local retry progress
        #[arg(long)]
        refresh: bool,
    },

    /// Fix a failed row and retry it
    Retry {
        /// Job ID the row came from
        job_id: Uuid,

        /// Row number as shown by `mdm result` (1-based)
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        row: u64,

        /// Field edits applied before the retry, as field=value
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// List importable tables
    Tables,
}
