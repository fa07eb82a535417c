//! Supervision of background tasks.
//!
//! A panicking poll driver must not take the host process down. The task is
//! spawned on its own, and a supervisor awaits it: a panic is logged and
//! appended as one JSON line to the configured error file. The task is not
//! restarted.

use std::any::Any;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Spawns `task` and a supervisor recording its panic, if any, into `error_file`.
///
/// The returned handle completes once the supervised task has finished.
pub(crate) fn spawn_supervised<F>(name: &'static str, error_file: PathBuf, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let inner = tokio::spawn(task);
    tokio::spawn(async move {
        match inner.await {
            Ok(()) => debug!(task = name, "backend-config: background task exited"),
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic());
                error!(task = name, %message, "backend-config: background task panicked");
                let at = OffsetDateTime::now_utc();
                let path = error_file.clone();
                let written = tokio::task::spawn_blocking(move || {
                    record_panic(&path, name, &message, at)
                })
                .await;
                match written {
                    Ok(Ok(())) => {}
                    Ok(Err(io_err)) => warn!(
                        path = %error_file.display(),
                        error = %io_err,
                        "backend-config: failed to record panic"
                    ),
                    Err(join_err) => warn!(
                        error = %join_err,
                        "backend-config: panic recorder did not complete"
                    ),
                }
            }
            Err(_) => debug!(task = name, "backend-config: background task cancelled"),
        }
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}

/// Appends `{"task", "message", "time"}` as a single line to `path`.
pub(crate) fn record_panic(
    path: &Path,
    task: &str,
    message: &str,
    at: OffsetDateTime,
) -> io::Result<()> {
    let time = at
        .format(&Rfc3339)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    let line = json!({
        "task": task,
        "message": message,
        "time": time,
    });
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
