//! The process-identity file read by the external supervisor

use malt_errors::{Error, StateError};
use std::path::Path;
use tokio::fs;

/// Record the running server's pid. Called at startup; overwrites any stale
/// file from a previous run.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_pid(path: &Path, pid: u32) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }
    fs::write(path, format!("{pid}\n"))
        .await
        .map_err(|e| StateError::WriteFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(())
}

/// Read the recorded pid. Only the first line is significant.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not start with a
/// decimal pid.
pub async fn read_pid(path: &Path) -> Result<u32, Error> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;

    let line = content.lines().next().unwrap_or("").trim();
    line.parse().map_err(|_| {
        StateError::PidFileInvalid {
            message: format!("not a pid: {line:?}"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pid_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pid.tmp");

        write_pid(&path, 4242).await.unwrap();
        assert_eq!(read_pid(&path).await.unwrap(), 4242);

        // Overwrite on restart
        write_pid(&path, 4243).await.unwrap();
        assert_eq!(read_pid(&path).await.unwrap(), 4243);
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pid.tmp");
        tokio::fs::write(&path, "not-a-pid\n").await.unwrap();

        let err = read_pid(&path).await.unwrap_err();
        assert!(matches!(
            err,
            Error::State(StateError::PidFileInvalid { .. })
        ));
    }
}
