//! Managed remote file lifecycle
//!
//! Create and update both overwrite the file. Read refreshes recorded state
//! and reports `None` once the file is gone so the controller can recreate it.

use tracing::{info, warn};

use super::model::RemoteFileModel;
use crate::error::RemoteFileError;
use crate::sftp::{RemoteFileClient, RemoteFileTarget};

/// Create/read/update/delete/import for one managed file
#[derive(Clone, Default)]
pub struct RemoteFileResource {
    client: RemoteFileClient,
}

impl RemoteFileResource {
    pub fn new(client: RemoteFileClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, plan: RemoteFileModel) -> Result<RemoteFileModel, RemoteFileError> {
        self.write(plan).await
    }

    pub async fn update(&self, plan: RemoteFileModel) -> Result<RemoteFileModel, RemoteFileError> {
        self.write(plan).await
    }

    /// Refresh recorded state from the remote file
    ///
    /// Returns `Ok(None)` when the file no longer exists.
    pub async fn read(
        &self,
        state: RemoteFileModel,
    ) -> Result<Option<RemoteFileModel>, RemoteFileError> {
        let attrs = state.connection_attributes()?;
        let policy = state.retry_policy()?;
        let target = RemoteFileTarget::read(state.path.clone(), false);
        if target.path.is_empty() {
            return Err(RemoteFileError::config("missing path", "path is required"));
        }

        match self.client.fetch(&attrs, &target, policy).await {
            Ok(obs) => {
                let mut next = state;
                next.apply(&obs);
                next.id = Some(next.resource_id());
                Ok(Some(next))
            }
            Err(e) if e.is_not_found() => {
                warn!("{} no longer exists, dropping from state", state.resource_id());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, state: &RemoteFileModel) -> Result<(), RemoteFileError> {
        let attrs = state.connection_attributes()?;
        let policy = state.retry_policy()?;
        let target = state.read_target()?;
        self.client.remove(&attrs, &target, policy).await
    }

    /// Build the starting state for an existing file from a `host:path` ID
    ///
    /// Credentials are not part of the ID; the caller fills them in before
    /// the first read.
    pub fn import(id: &str) -> Result<RemoteFileModel, RemoteFileError> {
        let (host, path) = match id.split(':').collect::<Vec<_>>().as_slice() {
            [host, path] if !host.is_empty() && !path.is_empty() => {
                (host.to_string(), path.to_string())
            }
            _ => {
                return Err(RemoteFileError::config(
                    "invalid import id",
                    format!("expected host:path, got {:?}", id),
                ))
            }
        };

        info!("Importing {}:{}", host, path);
        Ok(RemoteFileModel {
            id: Some(id.to_string()),
            host,
            path,
            ..Default::default()
        })
    }

    async fn write(&self, plan: RemoteFileModel) -> Result<RemoteFileModel, RemoteFileError> {
        let attrs = plan.connection_attributes()?;
        let policy = plan.retry_policy()?;
        let target = plan.write_target()?;

        let obs = self.client.store(&attrs, &target, policy).await?;

        let mut next = plan;
        next.last_modified = Some(obs.last_modified);
        next.size = Some(obs.size);
        next.id = Some(next.resource_id());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::{model, MemoryConnector};
    use crate::sftp::operations::tests::MemoryFs;

    fn resource(fs: &MemoryFs) -> RemoteFileResource {
        RemoteFileResource::new(RemoteFileClient::with_connector(MemoryConnector::new(
            fs.clone(),
        )))
    }

    #[tokio::test]
    async fn test_create_records_computed_attributes() {
        let fs = MemoryFs::default();
        let mut plan = model("/srv/app/motd");
        plan.contents = Some("welcome\n".into());
        plan.permissions = Some("0640".into());

        let state = resource(&fs).create(plan).await.unwrap();

        assert_eq!(state.id.as_deref(), Some("files.internal:/srv/app/motd"));
        assert_eq!(state.size, Some(8));
        assert!(state.last_modified.is_some());
        assert_eq!(state.contents.as_deref(), Some("welcome\n"));

        let file = fs.file("/srv/app/motd").unwrap();
        assert_eq!(file.data, b"welcome\n");
        assert_eq!(file.mode & 0o7777, 0o640);
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let fs = MemoryFs::default().with_file("/srv/app/motd", b"old");
        let mut plan = model("/srv/app/motd");
        plan.contents = Some("new contents".into());

        let state = resource(&fs).update(plan).await.unwrap();
        assert_eq!(state.size, Some(12));
        assert_eq!(fs.file("/srv/app/motd").unwrap().data, b"new contents");
    }

    #[tokio::test]
    async fn test_read_detects_drift() {
        let fs = MemoryFs::default().with_file("/srv/app/motd", b"edited by hand");
        let mut state = model("/srv/app/motd");
        state.contents = Some("welcome\n".into());

        let next = resource(&fs).read(state).await.unwrap().unwrap();
        assert_eq!(next.contents.as_deref(), Some("edited by hand"));
        assert_eq!(next.size, Some(14));
    }

    #[tokio::test]
    async fn test_read_missing_drops_state() {
        let fs = MemoryFs::default();
        let mut state = model("/srv/app/gone");
        state.retry_count = Some(1);

        assert!(resource(&fs).read(state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing() {
        let fs = MemoryFs::default().with_file("/srv/app/motd", b"x");
        let res = resource(&fs);
        let state = model("/srv/app/motd");

        res.delete(&state).await.unwrap();
        assert!(fs.file("/srv/app/motd").is_none());
        res.delete(&state).await.unwrap();
    }

    #[test]
    fn test_import() {
        let m = RemoteFileResource::import("files.internal:/etc/hosts").unwrap();
        assert_eq!(m.host, "files.internal");
        assert_eq!(m.path, "/etc/hosts");
        assert_eq!(m.id.as_deref(), Some("files.internal:/etc/hosts"));

        for bad in ["nohost", "a:b:c", ":/etc/hosts", "host:", ""] {
            assert!(
                RemoteFileResource::import(bad).is_err(),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
