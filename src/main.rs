/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Operator entry point for Syn-Net. Probes endpoints and
    records failures, lists and exports the unique issue log,
    clears it, and prints the environment snapshot.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTP(S) GET
    requests only against operator-supplied URLs.

  Dependencies:
    clap for CLI parsing, reqwest for probes, chrono for
    timestamps.

  Operational Scope:
    Invoked by operators and scripts auditing network health.

  Revision History:
    2026-10-19 COD  Reworked runtime into the Syn-Net CLI.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use tokio::runtime::Handle;

use synnet_core::snapshot::SnapshotProvider;
use synnet_core::{
    export_all_text, export_entry_text, ErrorLogStore, Failure, FileKeyValueStore, Logger,
    NetworkErrorLogger, Result, SynnetConfig, SynnetError, SystemSnapshotProvider,
};

/// Command-line arguments for Syn-Net.
#[derive(Debug, Parser)]
#[command(
    name = "synnet",
    version,
    author = "Synavera Systems",
    about = "Network failure diagnosis and deduplicated error log"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// GET a URL once and record any failure.
    Probe {
        url: String,
        /// Logical endpoint name recorded with the failure.
        #[arg(long, value_name = "NAME")]
        endpoint: Option<String>,
        /// Request timeout in seconds.
        #[arg(long, value_name = "SECS", default_value_t = 15)]
        timeout: u64,
    },
    /// List recorded issues, most recent first.
    Logs,
    /// Print the plain-text export of all issues or of one fingerprint.
    Export {
        #[arg(long, value_name = "FINGERPRINT")]
        fingerprint: Option<String>,
    },
    /// Remove every recorded issue.
    Clear,
    /// Print the current environment snapshot.
    Snapshot,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Syn-Net] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = SynnetConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("synnet_{session_stamp}.log"))));
    let logger = Arc::new(Logger::new(log_path, cli.verbose)?);
    logger.debug("INIT", "Syn-Net awakening.");

    let kv = Arc::new(FileKeyValueStore::new(config.store_dir()));
    let store = Arc::new(ErrorLogStore::with_key(
        kv,
        config.store.key.clone(),
        logger.clone(),
    ));

    let code = match cli.command {
        Command::Probe {
            url,
            endpoint,
            timeout,
        } => {
            let facade = NetworkErrorLogger::new(
                store,
                Arc::new(SystemSnapshotProvider::new()),
                logger.clone(),
                Handle::current(),
            )
            .with_limits(config.record_limits())
            .with_probe(config.probe_settings());
            probe(&facade, &url, endpoint.as_deref(), timeout, &logger).await?
        }
        Command::Logs => {
            let entries = store.entries().await;
            if entries.is_empty() {
                println!("→ No network issues recorded.");
            }
            for entry in &entries {
                println!(
                    "{}  {:<20} x{:<4} {}  [{}]",
                    format_time(entry.last_seen_at_ms),
                    entry.issue_type.name(),
                    entry.occurrence_count,
                    entry.title,
                    entry.fingerprint
                );
            }
            ExitCode::SUCCESS
        }
        Command::Export { fingerprint } => {
            let entries = store.entries().await;
            match fingerprint {
                None => println!("{}", export_all_text(&entries)),
                Some(wanted) => {
                    let entry = entries
                        .iter()
                        .find(|entry| entry.fingerprint == wanted)
                        .ok_or_else(|| {
                            SynnetError::Runtime(format!("No entry with fingerprint `{wanted}`"))
                        })?;
                    println!("{}", export_entry_text(entry));
                }
            }
            ExitCode::SUCCESS
        }
        Command::Clear => {
            store.clear().await;
            logger.info("CLEAR", format!("Cleared `{}`", store.key()));
            println!("→ Network error log cleared.");
            ExitCode::SUCCESS
        }
        Command::Snapshot => {
            let provider = SystemSnapshotProvider::new();
            let text = tokio::task::spawn_blocking(move || provider.snapshot_text())
                .await
                .map_err(|err| SynnetError::Runtime(format!("Snapshot task failed: {err}")))?;
            println!("{text}");
            ExitCode::SUCCESS
        }
    };

    logger.finalize()?;
    Ok(code)
}

async fn probe(
    facade: &NetworkErrorLogger,
    url: &str,
    endpoint: Option<&str>,
    timeout: u64,
    logger: &Logger,
) -> Result<ExitCode> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout.max(1)))
        .user_agent("Syn-Net/0.1 (linux)")
        .build()
        .map_err(|err| SynnetError::Network(format!("Failed to build HTTP client: {err}")))?;

    let failure = match client.get(url).send().await {
        Ok(response) if response.status().is_success() => None,
        Ok(response) => {
            let status = response.status();
            Some(Failure::http_status(
                status.as_u16(),
                format!("HTTP {status} from {url}"),
            ))
        }
        Err(err) => Some(Failure::from_reqwest(&err)),
    };

    let Some(failure) = failure else {
        logger.info("PROBE", format!("{url} healthy"));
        println!("→ {url} responded successfully.");
        return Ok(ExitCode::SUCCESS);
    };

    match facade.record_failure(endpoint, Some(url), failure).await {
        Some(event) => {
            println!("→ {}", event.title);
            println!("  {}", event.summary);
            println!("  fingerprint={}", event.fingerprint);
        }
        None => println!("→ Request cancelled; nothing recorded."),
    }
    Ok(ExitCode::from(1))
}

fn format_time(at_ms: i64) -> String {
    DateTime::from_timestamp_millis(at_ms)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| at_ms.to_string())
}
