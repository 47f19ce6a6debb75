//! Driver Drowsiness Monitor - Main Entry Point

use std::process::ExitCode;
use std::sync::atomic::Ordering;

use monitor::{build_session, init_logging, MonitorConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match MonitorConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    init_logging(&config.log_level, config.log_json);

    info!("=== Driver Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let session = match build_session(&config) {
        Ok(session) => session,
        Err(e) => {
            error!("Startup failed: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let stop = session.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after current frame");
            stop.store(true, Ordering::SeqCst);
        }
    });

    match tokio::task::spawn_blocking(move || session.run()).await {
        Ok(Ok(_stats)) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!("Monitoring aborted: {}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!("Monitor loop panicked: {}", e);
            ExitCode::FAILURE
        }
    }
}
