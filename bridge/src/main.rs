//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! modembridge - Hayes modem emulator for telnet
//!
//! Opens the configured serial port, answers AT commands on it and dials telnet servers
//! on `ATD`. Runs until interrupted.

use clap::Parser;
use modembridge_service::{Bridge, BridgeError, HealthStatus, Settings, run_startup_checks};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modembridge")]
#[command(version)]
#[command(about = "Hayes modem emulator bridging a serial line to a telnet server")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/modembridge.conf")]
    config: PathBuf,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Skip the startup health checks
    #[arg(long)]
    skip_health_check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG, which wins over "info"
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "modembridge failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, BridgeError> {
    info!("Starting modembridge v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_file(&cli.config)?;
    info!(path = %cli.config.display(), "loaded configuration");

    if cli.skip_health_check {
        info!("skipping startup health checks");
    } else {
        let checks = run_startup_checks(&settings);
        if checks
            .iter()
            .any(|check| check.name == "serial_device" && check.status == HealthStatus::Error)
        {
            error!("serial device unavailable, aborting");
            return Ok(ExitCode::FAILURE);
        }
    }

    let bridge = Bridge::open(settings)?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, initiating shutdown...");
        }
        _ = workers_exited(&bridge) => {
            error!("bridge worker exited, shutting down");
        }
    }

    let snapshot = tokio::task::spawn_blocking(move || bridge.shutdown())
        .await
        .map_err(|_| BridgeError::WorkerPanicked("shutdown"))??;
    info!(%snapshot, "Shutdown complete");
    Ok(ExitCode::SUCCESS)
}

async fn terminate() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "cannot install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}

async fn workers_exited(bridge: &Bridge) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        if !bridge.is_running() {
            return;
        }
    }
}
