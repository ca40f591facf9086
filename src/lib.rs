//! Remote file reconciliation over SSH/SFTP
//!
//! Reads, writes and deletes one file on a remote host per call. Every call
//! opens its own SSH session, runs the file operation, closes the session
//! and is retried as a whole at a fixed interval.

pub mod error;
pub mod provider;
pub mod sftp;
pub mod ssh;

pub use error::RemoteFileError;
pub use provider::{RemoteFileDataSource, RemoteFileModel, RemoteFileResource};
pub use sftp::{FileObservation, RemoteFileClient, RemoteFileTarget, RetryPolicy};
pub use ssh::ConnectionAttributes;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging
///
/// Honors `RUST_LOG`, defaults to `info`. Output goes to stderr so stdout
/// stays free for responses.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
