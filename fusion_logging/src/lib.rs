use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local};
use fusion_config::FusionConfig;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default log level for the library to use. Override using the `RUST_LOG` env variable.
const DEFAULT_LOG_LEVEL_FILE: &str = "info";
const DEFAULT_LOG_LEVEL_CONSOLE: &str = "warn";

#[derive(Clone, Debug, PartialEq)]
pub enum LoggingMode {
    Directory(PathBuf),
    File(PathBuf),
    Console,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub logging_mode: LoggingMode,
    pub use_json: bool,
    pub file_prefix: String,
    pub version: String,
}

impl LoggingConfig {
    /// Builds the logging configuration from the `log` group of the client configuration.
    pub fn new(version: String, config: &FusionConfig) -> LoggingConfig {
        let logging_mode = match config.log.dest.as_deref() {
            None | Some("") => LoggingMode::Console,
            Some(log_dest) => {
                let path = PathBuf::from(log_dest);
                if log_dest.ends_with('/') || log_dest.ends_with('\\') || path.is_dir() {
                    LoggingMode::Directory(path)
                } else {
                    LoggingMode::File(path)
                }
            },
        };

        let use_json = match &config.log.format {
            Some(format) => format.to_ascii_lowercase().trim() == "json",
            None => logging_mode != LoggingMode::Console,
        };

        Self {
            logging_mode,
            use_json,
            file_prefix: config.log.prefix.clone(),
            version,
        }
    }
}

/// The main entry point to set up logging.  Should only be called once.
pub fn init_logging(cfg: LoggingConfig) {
    let maybe_log_file = match &cfg.logging_mode {
        LoggingMode::Directory(log_dir) => Some(log_file_in_dir(log_dir, &cfg.file_prefix)),
        LoggingMode::File(path) => Some(path.clone()),
        LoggingMode::Console => None,
    };

    if let Some(log_file) = maybe_log_file {
        // Attempt logging to a file, but fallback to console logging on error.
        if let Err(e) = init_logging_to_file(&log_file, cfg.use_json) {
            init_logging_to_console(&cfg);
            error!("Error logging to file {log_file:?} ({e}); falling back to console logging.");
        }
    } else {
        init_logging_to_console(&cfg);
    }

    info!("fusion client {}", &cfg.version);
}

fn init_logging_to_console(cfg: &LoggingConfig) {
    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false);
    let fmt_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL_CONSOLE))
        .unwrap_or_default();

    let registry = tracing_subscriber::registry();
    // try_init: a host application may already own the global subscriber.
    let _ = if cfg.use_json {
        registry.with(fmt_layer_base.json().with_filter(fmt_filter)).try_init()
    } else {
        registry.with(fmt_layer_base.pretty().with_filter(fmt_filter)).try_init()
    };
}

fn init_logging_to_file(path: &Path, use_json: bool) -> Result<(), std::io::Error> {
    use tracing_appender::{non_blocking, rolling};

    let (path, file_name) = match path.file_name() {
        Some(name) => (path.to_path_buf(), name.to_os_string()),
        None => (path.join("fusion.log"), OsStr::new("fusion.log").to_os_string()),
    };

    let log_directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent.to_path_buf()
        },
        _ => PathBuf::from("."),
    };

    // Make sure the log location is writeable so we error early here and dump to stderr on failure.
    std::fs::OpenOptions::new().create(true).append(true).open(&path)?;

    let file_appender = rolling::never(&log_directory, file_name);
    let (writer, guard) = non_blocking(file_appender);

    // The guard flushes buffered lines on drop, so it has to live for the rest of the process.
    static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer);
    let fmt_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL_FILE))
        .unwrap_or_default();

    let registry = tracing_subscriber::registry();
    let _ = if use_json {
        registry.with(fmt_layer_base.json().with_filter(fmt_filter)).try_init()
    } else {
        registry.with(fmt_layer_base.with_filter(fmt_filter)).try_init()
    };

    Ok(())
}

/// Build `<prefix>_<YYYYMMDD>T<HHMMSS><mmm><+/-HHMM>_<pid>.log` in `dir`.
pub fn log_file_in_dir(dir: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let now_local: DateTime<Local> = Local::now();
    let now_fixed: DateTime<FixedOffset> = now_local.with_timezone(now_local.offset());

    // ISO 8601 basic, filename-safe (no colons): 20250915T083210123-0700
    let ts = now_fixed.format("%Y%m%dT%H%M%S%3f%z");

    let pid = std::process::id();
    dir.as_ref().join(format!("{prefix}_{ts}_{pid}.log"))
}
