//! SFTP file management module
//!
//! Provides single-file fetch, store and remove over a per-attempt SFTP
//! session, wrapped in a fixed-interval retry loop.

pub mod client;
pub mod operations;
pub mod path_utils;
pub mod retry;
pub mod session;
pub mod types;

pub use client::RemoteFileClient;
pub use operations::{fetch, remove, store};
pub use retry::{
    is_retryable_error, with_retry, RetryPolicy, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL,
};
pub use session::{Connector, RemoteFs, SftpSession, SshConnector};
pub use types::*;
