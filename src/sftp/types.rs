//! SFTP data types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Identifier reported for an absent file when absence is tolerated
pub const MISSING_ID: &str = "missing";

/// Size reported for an absent file when absence is tolerated
pub const MISSING_SIZE: i64 = -1;

/// Attributes returned by a link-aware stat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// File size in bytes
    pub size: u64,
    /// Last modified time (Unix timestamp)
    pub mtime: Option<u32>,
    /// Permission bits, including file type bits when the server sends them
    pub permissions: Option<u32>,
}

/// The remote file an operation acts on
#[derive(Debug, Clone, Default)]
pub struct RemoteFileTarget {
    /// Remote path; the identity of the file
    pub path: String,
    /// Read only: report absence as a "missing" observation instead of failing
    pub allow_missing: bool,
    /// Write only: desired contents
    pub contents: Vec<u8>,
    /// Write only: octal mode string, e.g. "0644"
    pub permissions: Option<String>,
}

impl RemoteFileTarget {
    pub fn read(path: impl Into<String>, allow_missing: bool) -> Self {
        Self {
            path: path.into(),
            allow_missing,
            ..Default::default()
        }
    }

    pub fn write(
        path: impl Into<String>,
        contents: impl Into<Vec<u8>>,
        permissions: Option<String>,
    ) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            permissions,
            ..Default::default()
        }
    }
}

/// Post-operation state of a remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObservation {
    /// File base name, or "missing"
    pub id: String,
    /// File contents (empty for a missing file)
    pub contents: Vec<u8>,
    /// Last modified time (RFC 3339)
    pub last_modified: String,
    /// Size in bytes, or -1 for a missing file
    pub size: i64,
}

impl FileObservation {
    /// Observation for a file that is absent and allowed to be.
    pub fn missing() -> Self {
        Self {
            id: MISSING_ID.to_string(),
            contents: Vec::new(),
            last_modified: format_timestamp(Utc::now()),
            size: MISSING_SIZE,
        }
    }

    pub fn from_metadata(name: String, contents: Vec<u8>, metadata: &RemoteMetadata) -> Self {
        let modified = metadata
            .mtime
            .and_then(|t| DateTime::<Utc>::from_timestamp(i64::from(t), 0))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            id: name,
            contents,
            last_modified: format_timestamp(modified),
            size: i64::try_from(metadata.size).unwrap_or(i64::MAX),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.size == MISSING_SIZE
    }
}

fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_observation() {
        let obs = FileObservation::missing();
        assert_eq!(obs.id, "missing");
        assert!(obs.contents.is_empty());
        assert_eq!(obs.size, -1);
        assert!(obs.is_missing());
        assert!(DateTime::parse_from_rfc3339(&obs.last_modified).is_ok());
    }

    #[test]
    fn test_from_metadata() {
        let metadata = RemoteMetadata {
            size: 5,
            mtime: Some(1_700_000_000),
            permissions: Some(0o100644),
        };
        let obs = FileObservation::from_metadata("app.conf".into(), b"hello".to_vec(), &metadata);
        assert_eq!(obs.id, "app.conf");
        assert_eq!(obs.size, 5);
        assert_eq!(obs.last_modified, "2023-11-14T22:13:20Z");
        assert!(!obs.is_missing());
    }
}
