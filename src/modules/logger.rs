use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "relay.log";

pub fn ensure_log_dir(dir: &Path) -> Result<PathBuf, String> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| format!("Failed to create log directory: {}", e))?;
    }

    Ok(dir.to_path_buf())
}

/// Initialize logger system
///
/// Console output is always on; a daily rolling file is added when `log_dir`
/// is given and can be created.
pub fn init_logger(log_dir: Option<&Path>) {
    // Capture log macro logs (hyper, reqwest internals)
    let _ = tracing_log::LogTracer::init();

    // 1. Console output layer
    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    // 2. Optional file output layer (disable ANSI formatting)
    let mut file_error = None;
    let file_layer = match log_dir.map(ensure_log_dir) {
        Some(Ok(dir)) => {
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // The writer thread must outlive every log call, so keep it for the whole process
            std::mem::forget(guard);
            Some(
                fmt::Layer::new()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .boxed(),
            )
        }
        Some(Err(e)) => {
            file_error = Some(e);
            None
        }
        None => None,
    };

    // 3. Set filter layer (default to INFO and above)
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 4. Initialize global subscriber (use try_init to avoid crash on re-initialization)
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    match (log_dir, file_error) {
        (_, Some(e)) => tracing::warn!("File logging disabled: {}", e),
        (Some(dir), None) => info!("Logger initialized (console + {})", dir.display()),
        (None, None) => info!("Logger initialized (console)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_log_dir_creates_nested() {
        let dir = std::env::temp_dir()
            .join(format!("relay-logs-{}", uuid::Uuid::new_v4()))
            .join("nested");
        let created = ensure_log_dir(&dir).unwrap();
        assert!(created.is_dir());
        fs::remove_dir_all(dir.parent().unwrap()).ok();
    }
}
