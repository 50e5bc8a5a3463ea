mod http;
mod report;

use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courier_core::observe::{ColorMode, LoggerConfig, LoggerFormat, logger_init};
use courier_core::{AgentConfig, Dispatcher, RawParameters, TaskRequest, default_dispatcher};
use tokio::net::TcpListener;
use tracing::info;

use crate::report::SlotReport;

#[derive(Parser)]
#[command(name = "courier", about = "Pluggable remote-task execution agent")]
struct Cli {
    /// `EnvFilter` directive, e.g. `info` or `courier_core=debug`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// text | json
    #[arg(long, global = true, default_value = "text")]
    log_format: LoggerFormat,
    /// auto | always | never (text format only)
    #[arg(long, global = true, default_value = "auto")]
    color: ColorMode,
    /// Load COURIER_* variables from this file (default: ./.env if present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one task and print its result as JSON
    Run {
        kind: String,
        /// Parameter object as JSON
        #[arg(default_value = "{}")]
        params: String,
    },
    /// Run a JSON array of {task_type, params} concurrently (`-` reads stdin)
    Batch { requests: String },
    /// Serve the HTTP front end
    Serve {
        #[arg(long, env = "COURIER_LISTEN", default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    logger_init(&LoggerConfig {
        format: cli.log_format,
        level: cli.log_level.clone(),
        color: cli.color,
        ..LoggerConfig::default()
    })?;

    let config = AgentConfig::from_env()?;
    let dispatcher = default_dispatcher(&config)?;

    match cli.command {
        Command::Run { kind, params } => run(&dispatcher, &kind, &params).await,
        Command::Batch { requests } => batch(&dispatcher, &requests).await,
        Command::Serve { listen } => serve(dispatcher, listen).await,
    }
}

async fn run(dispatcher: &Dispatcher, kind: &str, params: &str) -> Result<()> {
    let params: RawParameters =
        serde_json::from_str(params).context("params must be a JSON object")?;
    let result = dispatcher.dispatch_one(kind, params).await?;
    println!("{}", serde_json::to_string_pretty(result.value())?);
    Ok(())
}

async fn batch(dispatcher: &Dispatcher, requests: &str) -> Result<()> {
    let text = if requests == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        requests.to_string()
    };
    let requests: Vec<TaskRequest> =
        serde_json::from_str(&text).context("requests must be a JSON array of {task_type, params}")?;

    let reports: Vec<SlotReport> = dispatcher
        .dispatch_many(requests)
        .await
        .into_iter()
        .map(SlotReport::from)
        .collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

async fn serve(dispatcher: Dispatcher, listen: SocketAddr) -> Result<()> {
    let kinds = dispatcher.registry().len();
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!(addr = %listener.local_addr()?, kinds, "serving");

    axum::serve(listener, http::router(dispatcher))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;
    Ok(())
}
