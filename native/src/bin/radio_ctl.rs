// Control service: owns the radio controller and exposes it on a Unix socket.

use log::error;
#[cfg(unix)]
use log::info;

#[cfg(unix)]
#[path = "ctl_modules/handler.rs"]
mod handler;

#[cfg(unix)]
use scratch_radio_control::ipc::{IpcServer, RadioResponse, RadioResponseType};
#[cfg(unix)]
use scratch_radio_control::{api, RadioConfig};
use std::process::ExitCode;
#[cfg(unix)]
use std::sync::Arc;

/// Server reference for shutdown signaling.
#[cfg(unix)]
static IPC_SERVER: once_cell::sync::OnceCell<Arc<IpcServer>> = once_cell::sync::OnceCell::new();

#[cfg(unix)]
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    scratch_radio_control::logging::init_logger();
    if api::init_error_reporting() {
        info!("[CTL] Sentry monitoring enabled");
    }

    let config = match RadioConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("[CTL] {}", e);
            api::capture_critical_error("Configuration", &e.to_string());
            return ExitCode::FAILURE;
        }
    };
    let socket_path = config.socket_path();

    if let Err(e) = scratch_radio_control::initialize_internal(config) {
        error!("[CTL] Failed to initialize controller: {}", e);
        api::capture_critical_error("Controller Initialization", &e.to_string());
        return ExitCode::FAILURE;
    }

    let server = IPC_SERVER.get_or_init(|| Arc::new(IpcServer::new(socket_path)));

    let notifier = server.notifier();
    let watched = api::watch_errors(move |message| {
        let _ = notifier.send(RadioResponse::notification(RadioResponseType::Error {
            message: message.to_string(),
        }));
    });
    if let Err(e) = watched {
        error!("[CTL] Error notifications unavailable: {}", e);
    }

    if let Some(path) = api::get_diagnostics().crash_log_path {
        info!("[CTL] Crash log: {}", path);
    }

    let status = api::get_status();
    info!("[CTL] Engine status: {} ({})", status.msg, status.status.code());

    let result = run_server(server);

    scratch_radio_control::cleanup_internal();
    scratch_radio_control::logging::shutdown_sentry();

    match result {
        Ok(()) => {
            info!("[CTL] Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            api::log_critical_error("IPC Server", &e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(unix)]
fn run_server(server: &IpcServer) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create Tokio runtime: {}", e))?;

    runtime.block_on(async {
        tokio::spawn(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("[CTL] Interrupted, shutting down");
                if let Some(server) = IPC_SERVER.get() {
                    server.request_shutdown();
                }
            }
        });

        let listener = server
            .bind()
            .map_err(|e| format!("Failed to bind {:?}: {}", server.socket_path(), e))?;
        server
            .serve(listener, Arc::new(handler::CommandHandler))
            .await
            .map_err(|e| format!("Server error: {}", e))
    })
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    scratch_radio_control::logging::init_logger();
    error!("[CTL] radio-ctl needs Unix domain sockets");
    ExitCode::FAILURE
}
