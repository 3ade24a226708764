use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use printwatch::{logging, App, GuardError, InstanceGuard, RunMarker, Settings, EXIT_ALREADY_RUNNING};

#[derive(Parser, Debug)]
#[command(name = "printwatch")]
#[command(about = "Relay spoken notifications about a 3D printer's print jobs")]
struct Args {
    /// Optional TOML settings file, overridden by PRINTWATCH_* variables
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?;
    let log_guard = logging::init(&settings.log_file)?;

    let instance = match InstanceGuard::acquire(&settings.lock_file) {
        Ok(instance) => instance,
        Err(e @ GuardError::AlreadyRunning(_)) => {
            error!("{}", e);
            eprintln!("{}", e);
            drop(log_guard);
            std::process::exit(EXIT_ALREADY_RUNNING);
        }
        Err(e) => return Err(e.into()),
    };

    // Nothing may fail between marking and clearing
    let marker_path = settings.running_marker.clone();
    let app = App::new(settings)?;
    let rt = tokio::runtime::Runtime::new()?;

    let (marker, start) = RunMarker::mark(marker_path)?;
    info!("Starting printwatch ({:?})", start);
    rt.block_on(app.run(start, shutdown_signal()));

    marker.clear();
    drop(instance);
    info!("Stopped");
    drop(log_guard);
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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
}
