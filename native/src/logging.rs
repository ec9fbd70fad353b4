use log::{error, info, LevelFilter};
use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

const CRASH_LOG_DIR: &str = "ScratchRadio";
const CRASH_LOG_FILE: &str = "radio_crash.log";

/// Environment variable holding the Sentry DSN; reporting is off when unset.
pub const SENTRY_DSN_ENV: &str = "RADIO_SENTRY_DSN";
pub const SENTRY_ENVIRONMENT_ENV: &str = "RADIO_SENTRY_ENVIRONMENT";

static CRASH_LOG_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);
static SENTRY_GUARD: Mutex<Option<sentry::ClientInitGuard>> = Mutex::new(None);

/// Start Sentry reporting. Returns false when no DSN is given or the client
/// could not be enabled.
pub fn init_sentry(dsn: Option<&str>, environment: Option<&str>) -> bool {
    let Some(dsn) = dsn.filter(|d| !d.trim().is_empty()) else {
        info!("[SENTRY] No DSN configured, reporting disabled");
        return false;
    };

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: environment.map(|e| Cow::Owned(e.to_string())),
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    if !guard.is_enabled() {
        info!("[SENTRY] Client could not be enabled");
        return false;
    }

    *SENTRY_GUARD.lock().unwrap_or_else(PoisonError::into_inner) = Some(guard);
    info!("[SENTRY] Reporting enabled ({:?})", environment);
    true
}

pub fn is_sentry_enabled() -> bool {
    SENTRY_GUARD
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .is_some_and(|g| g.is_enabled())
}

/// Flush pending events and end the session.
pub fn shutdown_sentry() {
    let guard = SENTRY_GUARD
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(guard) = guard {
        info!("[SENTRY] Flushing and shutting down");
        drop(guard);
    }
}

/// Report a failure that leaves the controller unusable.
pub fn capture_critical_error(context: &str, error: &str) {
    if !is_sentry_enabled() {
        return;
    }
    sentry::with_scope(
        |scope| {
            scope.set_tag("error_type", "critical");
            scope.set_tag("context", context);
        },
        || {
            sentry::capture_message(
                &format!("[CRITICAL] {}: {}", context, error),
                sentry::Level::Fatal,
            );
        },
    );
}

/// Install env_logger; `RUST_LOG` overrides the default Warn filter.
pub fn init_logger() {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(LevelFilter::Warn);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    });
    // A logger may already be installed by the host or an earlier init.
    let _ = builder.try_init();
}

fn crash_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(CRASH_LOG_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Install a panic hook that appends a timestamped report to the crash log.
pub fn init_crash_logger() {
    let dir = crash_log_dir();
    if let Err(e) = fs::create_dir_all(&dir) {
        error!("[CRASH LOGGER] Cannot create {:?}: {}", dir, e);
    }
    let path = dir.join(CRASH_LOG_FILE);
    *CRASH_LOG_PATH.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());

    std::panic::set_hook(Box::new(|panic_info| {
        let report = panic_report(panic_info);
        if is_sentry_enabled() {
            sentry::capture_message(&report, sentry::Level::Fatal);
        }
        if let Err(e) = append_crash_log(&report) {
            error!("[CRASH LOGGER] Failed to write crash log: {}", e);
        }
        error!("\n{}", report);
    }));

    info!("[CRASH LOGGER] Writing crash reports to {:?}", path);
}

fn timestamp() -> impl std::fmt::Display {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
}

fn thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}

fn panic_report(panic_info: &std::panic::PanicHookInfo) -> String {
    let payload = panic_info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string payload>".to_string());
    let location = panic_info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "<unknown>".to_string());

    format!(
        "===== RADIO CONTROL PANIC =====\n\
         Timestamp: {}\n\
         Location: {}\n\
         Message: {}\n\
         Thread: {}\n\
         Backtrace:\n{}\n",
        timestamp(),
        location,
        payload,
        thread_name(),
        std::backtrace::Backtrace::capture()
    )
}

fn append_crash_log(report: &str) -> std::io::Result<()> {
    let guard = CRASH_LOG_PATH.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(path) = guard.as_ref() else {
        return Ok(());
    };
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", report)
}

/// Record a non-fatal but serious failure in the crash log and Sentry.
pub fn log_critical_error(context: &str, error: &str) {
    let report = format!(
        "===== CRITICAL ERROR =====\n\
         Timestamp: {}\n\
         Context: {}\n\
         Error: {}\n\
         Thread: {}\n",
        timestamp(),
        context,
        error,
        thread_name()
    );

    if is_sentry_enabled() {
        sentry::with_scope(
            |scope| scope.set_tag("context", context),
            || {
                sentry::capture_message(error, sentry::Level::Error);
            },
        );
    }
    if let Err(e) = append_crash_log(&report) {
        error!("[CRASH LOGGER] Failed to write critical error: {}", e);
    }
    error!("{}", report);
}

pub fn get_crash_log_path() -> Option<String> {
    CRASH_LOG_PATH
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
}

pub fn clear_crash_log() -> std::io::Result<()> {
    let guard = CRASH_LOG_PATH.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_ref() {
        Some(path) if path.exists() => fs::remove_file(path),
        _ => Ok(()),
    }
}
