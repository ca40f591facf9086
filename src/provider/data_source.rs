//! Read-only view of a remote file

use super::model::RemoteFileModel;
use crate::error::RemoteFileError;
use crate::sftp::RemoteFileClient;

#[derive(Clone, Default)]
pub struct RemoteFileDataSource {
    client: RemoteFileClient,
}

impl RemoteFileDataSource {
    pub fn new(client: RemoteFileClient) -> Self {
        Self { client }
    }

    /// Observe the file, yielding the "missing" record when it is absent
    /// and `allow_missing` is set. `triggers` pass through untouched.
    pub async fn read(&self, config: RemoteFileModel) -> Result<RemoteFileModel, RemoteFileError> {
        let attrs = config.connection_attributes()?;
        let policy = config.retry_policy()?;
        let target = config.read_target()?;

        let obs = self.client.fetch(&attrs, &target, policy).await?;

        let mut next = config;
        next.apply(&obs);
        next.id = Some(obs.id);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::{model, MemoryConnector};
    use crate::sftp::operations::tests::MemoryFs;
    use crate::sftp::{MISSING_ID, MISSING_SIZE};
    use std::collections::BTreeMap;

    fn data_source(fs: &MemoryFs) -> RemoteFileDataSource {
        RemoteFileDataSource::new(RemoteFileClient::with_connector(MemoryConnector::new(
            fs.clone(),
        )))
    }

    #[tokio::test]
    async fn test_read_existing() {
        let fs = MemoryFs::default().with_file("/var/run/app.pid", b"4242\n");
        let mut config = model("/var/run/app.pid");
        config.triggers = Some(BTreeMap::from([("build".to_string(), "17".to_string())]));

        let out = data_source(&fs).read(config).await.unwrap();
        assert_eq!(out.id.as_deref(), Some("app.pid"));
        assert_eq!(out.contents.as_deref(), Some("4242\n"));
        assert_eq!(out.size, Some(5));
        assert_eq!(out.triggers.unwrap()["build"], "17");
    }

    #[tokio::test]
    async fn test_read_missing_allowed() {
        let fs = MemoryFs::default();
        let mut config = model("/var/run/app.pid");
        config.allow_missing = Some(true);

        let out = data_source(&fs).read(config).await.unwrap();
        assert_eq!(out.id.as_deref(), Some(MISSING_ID));
        assert_eq!(out.contents.as_deref(), Some(""));
        assert_eq!(out.size, Some(MISSING_SIZE));
    }

    #[tokio::test]
    async fn test_read_missing_not_allowed() {
        let fs = MemoryFs::default();
        let mut config = model("/var/run/app.pid");
        config.retry_count = Some(0);

        let err = data_source(&fs).read(config).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
