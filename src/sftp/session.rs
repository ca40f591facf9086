//! SFTP Session management
//!
//! A session owns one SSH connection and one SFTP sub-channel for the
//! duration of a single file operation. Sessions are never pooled.

use std::io;

use async_trait::async_trait;
use russh::client::Handle;
use russh::Disconnect;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::{FileAttributes, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::types::RemoteMetadata;
use crate::error::RemoteFileError;
use crate::ssh::{dial, ClientHandler, ResolvedConfig};

pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// File-transfer primitives over an open sub-channel
#[async_trait]
pub trait RemoteFs: Send {
    /// Stat without following a final symlink
    async fn lstat(&mut self, path: &str) -> io::Result<RemoteMetadata>;

    /// Open for reading
    async fn open(&mut self, path: &str) -> io::Result<RemoteReader>;

    /// Create or truncate for writing
    async fn create(&mut self, path: &str) -> io::Result<RemoteWriter>;

    async fn chmod(&mut self, path: &str, mode: u32) -> io::Result<()>;

    async fn remove(&mut self, path: &str) -> io::Result<()>;

    /// Release the sub-channel and then the secure channel. Best effort.
    async fn close(&mut self);
}

/// Opens sessions; the seam tests substitute with an in-memory filesystem
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ResolvedConfig) -> Result<Box<dyn RemoteFs>, RemoteFileError>;
}

/// Connector that dials a real SSH server and starts the `sftp` subsystem
#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, config: &ResolvedConfig) -> Result<Box<dyn RemoteFs>, RemoteFileError> {
        let handle = dial(config).await?;
        let session = SftpSession::open(handle, &config.address).await?;
        Ok(Box::new(session))
    }
}

/// SFTP Session wrapper
pub struct SftpSession {
    /// russh SFTP session
    sftp: RusshSftpSession,
    /// Owning SSH connection
    handle: Handle<ClientHandler>,
    address: String,
}

impl SftpSession {
    /// Open the SFTP subsystem on an authenticated connection
    pub async fn open(
        handle: Handle<ClientHandler>,
        address: &str,
    ) -> Result<Self, RemoteFileError> {
        info!("Opening SFTP subsystem on {}", address);

        let sftp = match start_subsystem(&handle).await {
            Ok(sftp) => sftp,
            Err(e) => {
                disconnect(&handle, address).await;
                return Err(e);
            }
        };

        Ok(Self {
            sftp,
            handle,
            address: address.to_string(),
        })
    }
}

async fn start_subsystem(
    handle: &Handle<ClientHandler>,
) -> Result<RusshSftpSession, RemoteFileError> {
    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| RemoteFileError::transport("subchannel failed", e))?;

    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| RemoteFileError::transport("subchannel failed", e))?;

    RusshSftpSession::new(channel.into_stream())
        .await
        .map_err(|e| RemoteFileError::transport("subchannel failed", e))
}

async fn disconnect(handle: &Handle<ClientHandler>, address: &str) {
    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, "", "English")
        .await
    {
        debug!("Ignoring SSH disconnect error for {}: {}", address, e);
    }
}

#[async_trait]
impl RemoteFs for SftpSession {
    async fn lstat(&mut self, path: &str) -> io::Result<RemoteMetadata> {
        let attrs = self
            .sftp
            .symlink_metadata(path)
            .await
            .map_err(map_sftp_error)?;

        Ok(RemoteMetadata {
            size: attrs.size.unwrap_or(0),
            mtime: attrs.mtime,
            permissions: attrs.permissions,
        })
    }

    async fn open(&mut self, path: &str) -> io::Result<RemoteReader> {
        let file = self.sftp.open(path).await.map_err(map_sftp_error)?;
        Ok(Box::new(file))
    }

    async fn create(&mut self, path: &str) -> io::Result<RemoteWriter> {
        let file = self.sftp.create(path).await.map_err(map_sftp_error)?;
        Ok(Box::new(file))
    }

    async fn chmod(&mut self, path: &str, mode: u32) -> io::Result<()> {
        let attrs = FileAttributes {
            permissions: Some(mode),
            ..FileAttributes::empty()
        };
        self.sftp
            .set_metadata(path, attrs)
            .await
            .map_err(map_sftp_error)
    }

    async fn remove(&mut self, path: &str) -> io::Result<()> {
        self.sftp.remove_file(path).await.map_err(map_sftp_error)
    }

    async fn close(&mut self) {
        if let Err(e) = self.sftp.close().await {
            debug!("Ignoring SFTP close error for {}: {}", self.address, e);
        }
        disconnect(&self.handle, &self.address).await;
        debug!("Session to {} closed", self.address);
    }
}

/// Map SFTP errors onto `io::Error` kinds so absence stays typed
fn map_sftp_error(err: SftpErrorInner) -> io::Error {
    match &err {
        SftpErrorInner::Status(status) => {
            let kind = match status.status_code {
                StatusCode::NoSuchFile => io::ErrorKind::NotFound,
                StatusCode::PermissionDenied => io::ErrorKind::PermissionDenied,
                StatusCode::NoConnection | StatusCode::ConnectionLost => {
                    io::ErrorKind::ConnectionAborted
                }
                StatusCode::OpUnsupported => io::ErrorKind::Unsupported,
                _ => io::ErrorKind::Other,
            };
            io::Error::new(kind, err.to_string())
        }
        SftpErrorInner::Timeout => io::Error::new(io::ErrorKind::TimedOut, err.to_string()),
        _ => io::Error::other(err.to_string()),
    }
}
