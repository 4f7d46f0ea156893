//! Log setup: stderr, a daily rolling file, and os_log on macOS

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_BASENAME: &str = "macroreel.log";
const LOG_DIR_ENV: &str = "MACROREEL_LOG_PATH";
const LOG_RETENTION_DAYS: u64 = 7;

/// Subsystem for macOS unified logging (os_log)
#[cfg(target_os = "macos")]
const OSLOG_SUBSYSTEM: &str = "dev.macroreel";

/// Get the log directory path
pub fn get_log_dir() -> Result<PathBuf> {
    resolve_log_dir()
}

/// Install the global subscriber. Keep the returned guard alive until exit,
/// dropping it flushes the file writer.
pub fn init_logging() -> Result<WorkerGuard> {
    let log_dir = resolve_log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let pruned = prune_old_logs(
        &log_dir,
        Duration::from_secs(60 * 60 * 24 * LOG_RETENTION_DAYS),
    );

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_BASENAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    // stdout is reserved for command output
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    #[cfg(target_os = "macos")]
    {
        // Visible in Console.app and `log stream --predicate 'subsystem == "dev.macroreel"'`
        let oslog_layer = tracing_oslog::OsLogger::new(OSLOG_SUBSYSTEM, "default");

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .with(oslog_layer)
            .init();
    }

    #[cfg(not(target_os = "macos"))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    }

    if pruned > 0 {
        debug!("Pruned {} old log files from {:?}", pruned, log_dir);
    }

    Ok(guard)
}

fn resolve_log_dir() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var(LOG_DIR_ENV) {
        return Ok(PathBuf::from(override_path));
    }

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .context("Failed to determine home directory for log path")?;
        return Ok(home.join("Library").join("Logs").join("macroreel"));
    }

    let proj_dirs = ProjectDirs::from("dev", "macroreel", "macroreel")
        .context("Failed to determine project directories for log path")?;

    #[cfg(target_os = "windows")]
    {
        return Ok(proj_dirs.data_local_dir().join("Logs"));
    }

    #[cfg(target_os = "linux")]
    {
        let base = proj_dirs
            .state_dir()
            .unwrap_or_else(|| proj_dirs.data_local_dir());
        return Ok(base.join("logs"));
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        return Ok(proj_dirs.data_local_dir().join("logs"));
    }
}

/// Delete rolled log files last modified more than `max_age` ago.
/// Runs before the subscriber exists, so it reports a count instead of logging.
fn prune_old_logs(log_dir: &Path, max_age: Duration) -> usize {
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return 0;
    };
    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return 0;
    };

    let expired = entries.flatten().filter(|entry| {
        let is_log = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(LOG_FILE_BASENAME));
        let modified = entry.metadata().ok().filter(|m| m.is_file()).and_then(|m| m.modified().ok());
        is_log && modified.is_some_and(|modified| modified < cutoff)
    });

    expired
        .filter(|entry| std::fs::remove_file(entry.path()).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_removes_only_old_log_files() {
        let dir = std::env::temp_dir()
            .join("macroreel-tests")
            .join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).unwrap();

        let log = dir.join(format!("{}.2026-01-01", LOG_FILE_BASENAME));
        let other = dir.join("notes.txt");
        std::fs::write(&log, "old").unwrap();
        std::fs::write(&other, "keep").unwrap();

        // Both files are older than the max age by the time we prune
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(prune_old_logs(&dir, Duration::from_millis(10)), 1);

        assert!(!log.exists());
        assert!(other.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_prune_keeps_recent_logs() {
        let dir = std::env::temp_dir()
            .join("macroreel-tests")
            .join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).unwrap();

        let log = dir.join(LOG_FILE_BASENAME);
        std::fs::write(&log, "fresh").unwrap();
        assert_eq!(prune_old_logs(&dir, Duration::from_secs(60 * 60)), 0);
        assert!(log.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
