//! The two background loops: size rotation and daily archival.
//!
//! Both run their first pass at startup. File work happens on the blocking
//! pool so request handling is never held up.

use std::sync::Arc;

use chrono::Local;
use kintai_logs::LogRegistry;
use kintai_scheduler::{spawn_task, Schedule, ScheduledTask};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn spawn(logs: Arc<LogRegistry>, rotate_every_secs: u64, cancel: CancellationToken) -> Vec<ScheduledTask> {
    let rotate_logs = Arc::clone(&logs);
    let rotation = spawn_task(
        "log-rotation",
        Schedule::every_secs(rotate_every_secs),
        true,
        cancel.clone(),
        move || {
            let logs = Arc::clone(&rotate_logs);
            async move {
                let rotated = tokio::task::spawn_blocking(move || logs.rotate_all())
                    .await
                    .map_err(|e| e.to_string())?
                    .map_err(|e| e.to_string())?;
                if !rotated.is_empty() {
                    info!(?rotated, "logs rotated");
                }
                Ok::<(), String>(())
            }
        },
    );

    let archival = spawn_task("log-archival", Schedule::midnight(), true, cancel, move || {
        let logs = Arc::clone(&logs);
        async move {
            let today = Local::now().date_naive();
            tokio::task::spawn_blocking(move || logs.archive_previous_day(today))
                .await
                .map_err(|e| e.to_string())?
                .map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        }
    });

    vec![rotation, archival]
}

#[cfg(test)]
mod tests {
    use super::*;
    use kintai_core::config::LogsConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn startup_pass_rotates_and_archives() {
        let dir = tempfile::tempdir().unwrap();
        let policy = LogsConfig {
            max_bytes: 8,
            ..LogsConfig::default()
        };
        let logs = Arc::new(LogRegistry::new(
            dir.path().join("logs"),
            dir.path().join("logs/archive"),
            policy,
        ));
        logs.open_stream("server").unwrap().append_line("well over eight bytes").unwrap();

        let cancel = CancellationToken::new();
        let tasks = spawn(Arc::clone(&logs), 600, cancel.clone());

        let rotated = logs.active_path("server").unwrap().with_extension("log.1");
        for _ in 0..100 {
            if rotated.exists() && !logs.dates().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(rotated.exists());
        assert_eq!(logs.dates().len(), 1);

        cancel.cancel();
        for task in tasks {
            task.shutdown().await;
        }
    }
}
