//! Remote file error types
//!
//! Every failure carries the phase that produced it (`"dial failed"`,
//! `"stat failed"`, ...) so the final error handed back after retries is
//! diagnosable on its own.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteFileError {
    /// Malformed or insufficient caller input. Retrying cannot fix it.
    #[error("{context}: {reason}")]
    Config { context: &'static str, reason: String },

    /// Dial, handshake, authentication or sub-channel failure.
    #[error("{context}: {reason}")]
    Transport { context: &'static str, reason: String },

    /// Remote file I/O failure not attributable to absence.
    #[error("{context} for {path}: {source}")]
    Io {
        context: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The target path does not exist.
    #[error("remote file not found: {path}: {source}")]
    NotFound {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl RemoteFileError {
    pub fn config(context: &'static str, reason: impl ToString) -> Self {
        Self::Config {
            context,
            reason: reason.to_string(),
        }
    }

    pub fn transport(context: &'static str, reason: impl ToString) -> Self {
        Self::Transport {
            context,
            reason: reason.to_string(),
        }
    }

    pub fn io(context: &'static str, path: &str, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_string(),
            source,
        }
    }

    /// Wrap a failure from an operation that looks the path up (stat, remove),
    /// promoting it to `NotFound` when the cause says the path is absent.
    pub fn lookup(context: &'static str, path: &str, source: io::Error) -> Self {
        if is_not_found(&source) {
            Self::NotFound {
                path: path.to_string(),
                source,
            }
        } else {
            Self::Io {
                context,
                path: path.to_string(),
                source,
            }
        }
    }

    /// Whether this error means the remote path does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source, .. } => is_not_found(source),
            _ => false,
        }
    }

    /// Errors that no amount of re-driving can fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Cancelled)
    }
}

/// Decide whether an I/O failure means "the path does not exist".
///
/// The typed `ErrorKind::NotFound` signal is authoritative. SFTP servers do not
/// always answer with `SSH_FX_NO_SUCH_FILE`, so as a last resort the message is
/// inspected for the wording OpenSSH and most libraries use.
pub fn is_not_found(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::NotFound {
        return true;
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("no such file") || msg.contains("file does not exist")
}

// Render as the display string for JSON responses
impl serde::Serialize for RemoteFileError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
