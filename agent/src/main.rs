//! Periphery Agent - Entry Point
//!
//! Serves the controller's commands on this host until SIGTERM or SIGINT.

use std::collections::HashMap;
use std::env;

use anyhow::Context;
use periphery::app::run::run;
use periphery::config::{AgentConfig, Env};
use periphery::logs::{init_logging, LogOptions};
use periphery::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version)?);
        return Ok(());
    }

    let env = Env::load().context("invalid environment")?;

    // Initialize logging, the guard flushes the file writer on exit
    let log_options = LogOptions {
        log_level: env.log_level,
        log_dir: env.log_dir.clone(),
        json_format: env.log_json,
    };
    let _log_guard = match init_logging(&log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let config = AgentConfig::load(&env)
        .await
        .with_context(|| format!("failed to load secrets from {}", env.secrets_path.display()))?;

    info!(
        "Running periphery {} ({}) on port {}",
        version.version, version.git_hash, config.port
    );
    if let Err(e) = run(config, await_shutdown_signal()).await {
        error!("Failed to run the agent: {e}");
        return Err(e.into());
    }
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
