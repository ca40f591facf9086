//! Remote file client
//!
//! Runs resolve -> connect -> operate -> close as one retryable unit.
//! Every attempt builds its own configuration and session.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::operations::{fetch, remove, store};
use super::retry::{with_retry, RetryPolicy};
use super::session::{Connector, RemoteFs, SshConnector};
use super::types::{FileObservation, RemoteFileTarget};
use crate::error::RemoteFileError;
use crate::ssh::{resolve, ConnectionAttributes};

type OpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteFileError>> + Send + 'a>>;

type Operation<T> = for<'a> fn(&'a mut dyn RemoteFs, &'a RemoteFileTarget) -> OpFuture<'a, T>;

fn fetch_op<'a>(
    fs: &'a mut dyn RemoteFs,
    target: &'a RemoteFileTarget,
) -> OpFuture<'a, FileObservation> {
    Box::pin(fetch(fs, target))
}

fn store_op<'a>(
    fs: &'a mut dyn RemoteFs,
    target: &'a RemoteFileTarget,
) -> OpFuture<'a, FileObservation> {
    Box::pin(store(fs, target))
}

fn remove_op<'a>(fs: &'a mut dyn RemoteFs, target: &'a RemoteFileTarget) -> OpFuture<'a, ()> {
    Box::pin(remove(fs, target))
}

/// Entry point for single-file reconciliation
#[derive(Clone)]
pub struct RemoteFileClient {
    connector: Arc<dyn Connector>,
    cancel: Option<CancellationToken>,
}

impl Default for RemoteFileClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteFileClient {
    /// Client that talks to real SSH servers
    pub fn new() -> Self {
        Self::with_connector(Arc::new(SshConnector))
    }

    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            cancel: None,
        }
    }

    /// Abort in-flight dials, operations and retry waits when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Read a remote file
    pub async fn fetch(
        &self,
        attrs: &ConnectionAttributes,
        target: &RemoteFileTarget,
        policy: RetryPolicy,
    ) -> Result<FileObservation, RemoteFileError> {
        info!("Reading {}:{}", attrs.host, target.path);
        self.run(attrs, target, policy, fetch_op).await
    }

    /// Create or overwrite a remote file
    pub async fn store(
        &self,
        attrs: &ConnectionAttributes,
        target: &RemoteFileTarget,
        policy: RetryPolicy,
    ) -> Result<FileObservation, RemoteFileError> {
        info!("Writing {}:{}", attrs.host, target.path);
        self.run(attrs, target, policy, store_op).await
    }

    /// Delete a remote file; absence counts as success
    pub async fn remove(
        &self,
        attrs: &ConnectionAttributes,
        target: &RemoteFileTarget,
        policy: RetryPolicy,
    ) -> Result<(), RemoteFileError> {
        info!("Deleting {}:{}", attrs.host, target.path);
        self.run(attrs, target, policy, remove_op).await
    }

    async fn run<T>(
        &self,
        attrs: &ConnectionAttributes,
        target: &RemoteFileTarget,
        policy: RetryPolicy,
        op: Operation<T>,
    ) -> Result<T, RemoteFileError> {
        with_retry(policy, self.cancel.as_ref(), || self.attempt(attrs, target, op)).await
    }

    /// One attempt. A session that was opened is always closed.
    async fn attempt<T>(
        &self,
        attrs: &ConnectionAttributes,
        target: &RemoteFileTarget,
        op: Operation<T>,
    ) -> Result<T, RemoteFileError> {
        let config = resolve(attrs)?;
        let mut session = self.cancellable(self.connector.connect(&config)).await?;

        let result = self.cancellable(op(session.as_mut(), target)).await;

        session.close().await;
        debug!("Attempt against {} finished", config.address);
        result
    }

    async fn cancellable<T, Fut>(&self, fut: Fut) -> Result<T, RemoteFileError>
    where
        Fut: Future<Output = Result<T, RemoteFileError>>,
    {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    result = fut => result,
                    _ = token.cancelled() => Err(RemoteFileError::Cancelled),
                }
            }
            None => fut.await,
        }
    }
}
