//! `run` command implementation.

use std::io::IsTerminal;
use std::sync::Arc;

use actor_factory::SimulationClient;
use anyhow::{Context, Result};
use contracts::SessionConfig;
use session::{InputSource, NoInput, SessionController, SessionReport, StopHandle, StopReason};
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::keyboard::TerminalInput;

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        town = %config.town,
        host = %config.carla.host,
        port = config.carla.port,
        recording = config.enable_recording,
        validation = config.validation_mode,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::install_metrics_exporter(args.metrics_port)?;
    }

    let report = if args.mock {
        run_mock(config, args).await?
    } else {
        run_real(config, args).await?
    };

    info!(
        ticks = report.stats.ticks,
        duration_secs = report.stats.duration.as_secs_f64(),
        stop_reason = ?report.stats.stop_reason,
        "Session completed"
    );
    for failure in &report.teardown_failures {
        warn!(error = %failure, "Resource was not released cleanly");
    }
    if let Some(recording) = &report.recording {
        println!(
            "🎬 Recording saved: {} ({} frames)",
            recording.path.display(),
            recording.frames
        );
    }
    report.stats.print_summary();

    info!("Lane Session finished");
    Ok(())
}

async fn run_mock(config: SessionConfig, args: &RunArgs) -> Result<SessionReport> {
    use actor_factory::MockSimulationClient;

    info!("Running in MOCK mode (no CARLA server required)");
    drive(config, Arc::new(MockSimulationClient::new()), args).await
}

#[cfg(feature = "real-carla")]
async fn run_real(config: SessionConfig, args: &RunArgs) -> Result<SessionReport> {
    use actor_factory::RealCarlaClient;

    drive(config, Arc::new(RealCarlaClient::new()), args).await
}

#[cfg(not(feature = "real-carla"))]
async fn run_real(_config: SessionConfig, _args: &RunArgs) -> Result<SessionReport> {
    Err(CliError::CarlaUnavailable.into())
}

/// Run one session against `client`
async fn drive<C: SimulationClient>(
    config: SessionConfig,
    client: Arc<C>,
    args: &RunArgs,
) -> Result<SessionReport> {
    let host = config.carla.host.clone();
    let port = config.carla.port;

    let mut controller = SessionController::new(config, client);
    let stop = controller.stop_handle();

    let input: Box<dyn InputSource> = if !args.no_keyboard && std::io::stdin().is_terminal() {
        Box::new(TerminalInput::enable(stop.clone()).map_err(CliError::Terminal)?)
    } else {
        Box::new(NoInput)
    };
    controller = controller.with_input(input);
    if args.max_ticks > 0 {
        controller = controller.with_max_ticks(args.max_ticks);
    }

    let shutdown = tokio::spawn(watch_shutdown_signal(stop));

    print_banner();
    let result = controller.run().await;
    shutdown.abort();

    result.with_context(|| format!("Session against {host}:{port} failed"))
}

/// Turn Ctrl+C / SIGTERM into an interrupt stop request
async fn watch_shutdown_signal(stop: StopHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping session...");
    stop.request(StopReason::Interrupt);
}

fn apply_overrides(config: &mut SessionConfig, args: &RunArgs) {
    if let Some(ref town) = args.town {
        info!(town = %town, "Overriding town from CLI");
        config.town = town.clone();
    }
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding CARLA host from CLI");
        config.carla.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = %port, "Overriding CARLA port from CLI");
        config.carla.port = port;
    }
    if args.record {
        config.enable_recording = true;
    }
    if args.no_validation {
        config.validation_mode = false;
    }
}

fn print_banner() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Lane Detection Session                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("🎮 Controls");
    println!("   ├─ ESC: quit");
    println!("   ├─ SPACE: toggle autopilot");
    println!("   └─ W/S/A/D: throttle / brake / steer (autopilot off)\n");
}
