// Path: crates/cli/src/main.rs

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use autotap_api::oracle::HttpDecisionOracle;
use autotap_drivers::adb::AdbDevice;
use autotap_services::session::SessionController;
use autotap_types::app::{TaskResult, WorkItem};
use autotap_types::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(name = "autotap", about = "Runs one UI automation session against a connected device.")]
struct Cli {
    /// TOML configuration file; defaults apply when absent.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Task label forwarded to the decision service.
    #[clap(long, default_value = "post_video")]
    task: String,
    /// Payload location on the device (file path or URI).
    #[clap(long)]
    payload: String,
    /// Caption text to enter when the flow asks for it.
    #[clap(long, default_value = "")]
    caption: String,
    /// Target application package; overrides the configured default.
    #[clap(long)]
    package: Option<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(AppConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    autotap_telemetry::init_tracing();
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;

    let device = Arc::new(AdbDevice::new(&cfg.adb));
    let oracle = Arc::new(HttpDecisionOracle::new(&cfg.oracle)?);
    let controller = SessionController::new(device.clone(), device, oracle, &cfg);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, cancelling session");
            signal_token.cancel();
        }
    });

    let item = WorkItem {
        task: cli.task,
        payload_ref: cli.payload,
        caption: cli.caption,
        package: cli.package,
    };

    let result = controller.run(item, cancel).await;
    let code = match &result {
        TaskResult::Success(message) => {
            println!("success: {}", message.as_deref().unwrap_or("done"));
            0
        }
        TaskResult::Failed(reason) => {
            eprintln!("failed: {}", reason);
            1
        }
        TaskResult::NeedUserAction(message) => {
            eprintln!("user action required: {}", message);
            2
        }
    };
    std::process::exit(code);
}
