//! Reconcile CLI
//!
//! Command-line tools for inspecting conflict resolution.
//!
//! # Commands
//!
//! - `resolve` - Plan the resolution of one conflict read from JSON files
//! - `sync` - Save local records against a snapshot of remote records

mod commands;

use clap::{Parser, Subcommand};
use commands::input::{parse_copy_rule, CopyRuleArg};
use reconcile_engine::{Backoff, EngineConfig, RetryConfig};
use reconcile_protocol::{ResolverConfig, DEFAULT_CONFLICT_MARKER};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Reconcile command-line conflict resolution tools.
#[derive(Parser)]
#[command(name = "reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Keep losing versions of a record type as conflict copies
    /// (TYPE:CONTENT_FIELD[:IDENTITY_FIELD], repeatable)
    #[arg(global = true, long = "preserve", value_parser = parse_copy_rule)]
    preserve: Vec<CopyRuleArg>,

    /// Suffix appended to the content of conflict copies
    #[arg(global = true, long, default_value = DEFAULT_CONFLICT_MARKER)]
    marker: String,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan the resolution of a single conflict
    Resolve {
        /// JSON file holding the server's record
        #[arg(long)]
        server: PathBuf,

        /// JSON file holding the client's record
        #[arg(long)]
        client: PathBuf,

        /// JSON file holding the common ancestor
        #[arg(long)]
        ancestor: Option<PathBuf>,
    },

    /// Save local records against a snapshot of remote records
    Sync {
        /// JSON array of records currently held by the remote store
        #[arg(long)]
        remote: PathBuf,

        /// JSON array of local records to save
        #[arg(long)]
        local: PathBuf,

        /// Maximum resolution rounds per record
        #[arg(long, default_value_t = RetryConfig::DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,

        /// Pause before the first retried save, doubling every round
        #[arg(long, value_name = "MS")]
        backoff_ms: Option<u64>,

        /// Do not post resolution notices
        #[arg(long)]
        no_notify: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let resolver_config = cli.preserve.into_iter().fold(
        ResolverConfig::new().with_marker(cli.marker),
        |config, arg| config.with_history_preserving(arg.record_type, arg.rule),
    );

    match cli.command {
        Commands::Resolve {
            server,
            client,
            ancestor,
        } => {
            commands::resolve::run(
                &server,
                &client,
                ancestor.as_deref(),
                resolver_config,
                &cli.format,
            )?;
        }
        Commands::Sync {
            remote,
            local,
            max_attempts,
            backoff_ms,
            no_notify,
        } => {
            let mut retry = RetryConfig::new(max_attempts);
            if let Some(ms) = backoff_ms {
                retry = retry.with_backoff(Backoff::Exponential {
                    first: Duration::from_millis(ms),
                    cap: Duration::from_secs(5),
                });
            }
            let engine_config = EngineConfig::new().with_retry(retry);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(commands::sync::run(
                &remote,
                &local,
                resolver_config,
                engine_config,
                !no_notify,
                &cli.format,
            ))?;
        }
        Commands::Version => {
            println!("Reconcile CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
