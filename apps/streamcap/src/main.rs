#![forbid(unsafe_code)]

mod config;

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use streamcap_core::{LocalClock, RunError, RunOutcome, Runner, Verification};
use streamcap_plex::PlexClient;
use streamcap_probe::Probe;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::{
    time::ChronoLocal,
    writer::{BoxMakeWriter, MakeWriterExt},
};

use crate::config::{AppConfig, ProbeKind};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "streamcap",
    version,
    about = "Match the media server's remote stream bitrate cap to measured upload capacity"
)]
struct Args {
    #[arg(
        long,
        help = "Path to TOML config file (default: ~/.config/streamcap/config.toml if present)"
    )]
    config: Option<PathBuf>,

    #[arg(long, help = "Media server base URL, e.g. http://localhost:32400")]
    server_url: Option<String>,

    #[arg(
        long,
        env = "PLEX_TOKEN",
        hide_env_values = true,
        help = "Media server access token"
    )]
    token: Option<String>,

    #[arg(long, value_enum, help = "Upload speed probe to use")]
    probe: Option<ProbeKind>,

    #[arg(long, help = "Measure and adjust even when nothing is streaming")]
    no_idle_skip: bool,

    #[arg(long, help = "Also append log lines to this file")]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match AppConfig::resolve(&args) {
        Ok(config) => config,
        Err(err) => {
            let _ = init_tracing(None);
            error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_tracing(config.log_file.as_deref()) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    let banner = "=".repeat(50);
    info!("{banner}");
    info!("streamcap {} - adaptive remote quality", env!("CARGO_PKG_VERSION"));
    info!("{banner}");

    let result = tokio::select! {
        result = run(&config) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
    };

    let code = match result {
        Ok(outcome) => {
            info!("finished: {}", describe(&outcome));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    };
    info!("{banner}");
    code
}

async fn run(config: &AppConfig) -> Result<RunOutcome> {
    if config.server.token.is_empty() {
        warn!("no server token configured; requests will likely be rejected");
    }
    let server = PlexClient::new(&config.server.url, &config.server.token)
        .context("create media server client failed")?;
    let probe = Probe::from_config(&config.probe)
        .with_context(|| format!("create {} probe failed", config.probe.name()))?;
    info!(
        "server {} | probe {}",
        server.base_url(),
        config.probe.name()
    );

    let runner = Runner::new(&config.policy, server, probe, LocalClock);
    match runner.run().await {
        Ok(outcome) => Ok(outcome),
        Err(err @ RunError::Connectivity(_)) => Err(anyhow::Error::new(err).context(format!(
            "check the server url ({}) and token",
            config.server.url
        ))),
        Err(err) => Err(err.into()),
    }
}

fn describe(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Idle => "no active streams, nothing to do".to_string(),
        RunOutcome::Unchanged { decision } => {
            format!("kept {}", decision.target_label)
        }
        RunOutcome::Applied {
            decision,
            verification,
            ..
        } => match verification {
            Verification::Confirmed => format!("set {}", decision.target_label),
            Verification::Unconfirmed { .. } => {
                format!("set {} (not confirmed by server)", decision.target_label)
            }
        },
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file failed: {}", path.display()))?;
            BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_ansi(log_file.is_none())
        .with_target(false)
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow!("install log subscriber failed: {err}"))
}
