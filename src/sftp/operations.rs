//! Single-file operations over an open session
//!
//! Each operation is idempotent and either produces a complete
//! `FileObservation` or fails before producing anything.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use super::path_utils::{parse_octal_mode, remote_file_name};
use super::session::RemoteFs;
use super::types::{FileObservation, RemoteFileTarget};
use crate::error::RemoteFileError;

/// Upper bound on the read buffer pre-allocated from the reported size
const READ_CAPACITY_HINT: usize = 1024 * 1024;

/// Stat and read a remote file.
pub async fn fetch(
    fs: &mut dyn RemoteFs,
    target: &RemoteFileTarget,
) -> Result<FileObservation, RemoteFileError> {
    let path = target.path.as_str();
    debug!("Fetching remote file: {}", path);

    let metadata = match fs.lstat(path).await {
        Ok(metadata) => metadata,
        Err(e) if target.allow_missing => {
            debug!("{} not readable ({}), reporting as missing", path, e);
            return Ok(FileObservation::missing());
        }
        Err(e) => return Err(RemoteFileError::lookup("stat failed", path, e)),
    };

    let mut file = fs
        .open(path)
        .await
        .map_err(|e| RemoteFileError::lookup("open failed", path, e))?;

    // Reported size is only a hint; the file may have changed since lstat
    let hint = usize::try_from(metadata.size).unwrap_or(0).min(READ_CAPACITY_HINT);
    let mut contents = Vec::with_capacity(hint);
    file.read_to_end(&mut contents)
        .await
        .map_err(|e| RemoteFileError::io("read failed", path, e))?;

    debug!("Read {} bytes from {}", contents.len(), path);
    Ok(FileObservation::from_metadata(
        remote_file_name(path),
        contents,
        &metadata,
    ))
}

/// Create or overwrite a remote file, optionally set its mode, and re-stat it.
pub async fn store(
    fs: &mut dyn RemoteFs,
    target: &RemoteFileTarget,
) -> Result<FileObservation, RemoteFileError> {
    let path = target.path.as_str();
    debug!("Writing {} bytes to file: {}", target.contents.len(), path);

    let mut file = fs
        .create(path)
        .await
        .map_err(|e| RemoteFileError::io("create failed", path, e))?;

    file.write_all(&target.contents)
        .await
        .map_err(|e| RemoteFileError::io("write failed", path, e))?;
    file.shutdown()
        .await
        .map_err(|e| RemoteFileError::io("write failed", path, e))?;
    drop(file);

    if let Some(mode) = target.permissions.as_deref().filter(|m| !m.is_empty()) {
        let bits = parse_octal_mode(mode).ok_or_else(|| {
            RemoteFileError::config(
                "invalid permissions",
                format!("{:?} is not an octal file mode", mode),
            )
        })?;

        fs.chmod(path, bits)
            .await
            .map_err(|e| RemoteFileError::io("chmod failed", path, e))?;
        debug!("Set mode {:o} on {}", bits, path);
    }

    let metadata = fs
        .lstat(path)
        .await
        .map_err(|e| RemoteFileError::io("stat failed", path, e))?;

    info!("Successfully wrote {} bytes to {}", target.contents.len(), path);
    Ok(FileObservation::from_metadata(
        remote_file_name(path),
        target.contents.clone(),
        &metadata,
    ))
}

/// Delete a remote file. Deleting an absent file succeeds.
pub async fn remove(fs: &mut dyn RemoteFs, target: &RemoteFileTarget) -> Result<(), RemoteFileError> {
    let path = target.path.as_str();
    info!("Deleting: {}", path);

    match fs.remove(path).await {
        Ok(()) => Ok(()),
        Err(e) => match RemoteFileError::lookup("delete failed", path, e) {
            RemoteFileError::NotFound { .. } => {
                debug!("{} already absent", path);
                Ok(())
            }
            other => Err(other),
        },
    }
}
