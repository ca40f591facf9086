//! SSH connection configuration
//!
//! `ConnectionAttributes` is what the caller declared; `ResolvedConfig` is the
//! validated, ready-to-dial form. Resolution never touches the network.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use russh::keys::{PrivateKey, PublicKey};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::keys::{fingerprint, parse_host_key, parse_private_key};
use crate::error::RemoteFileError;

/// SSH port used when the caller leaves it unset
pub const DEFAULT_PORT: u16 = 22;

/// Connect timeout used when the caller leaves it unset
pub const DEFAULT_TIMEOUT: &str = "5m";

/// Declared connection attributes
#[derive(Clone, Default)]
pub struct ConnectionAttributes {
    /// Remote host name or address
    pub host: String,

    /// SSH port (default: 22)
    pub port: Option<u16>,

    /// Username for authentication
    pub user: Option<String>,

    /// Password; takes precedence over `private_key` when both are set
    pub password: Option<Zeroizing<String>>,

    /// Unencrypted private key text
    pub private_key: Option<Zeroizing<String>>,

    /// Host key to pin; when absent any host key is accepted
    pub host_key: Option<Vec<u8>>,

    /// Connect timeout as a duration string (default: "5m")
    pub timeout: Option<String>,
}

impl fmt::Debug for ConnectionAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAttributes")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("host_key", &self.host_key.as_ref().map(|k| k.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Authentication method selected by the resolver
#[derive(Clone)]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    PublicKey(Arc<PrivateKey>),
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Password(_) => f.write_str("Password(<redacted>)"),
            AuthMethod::PublicKey(key) => {
                write!(f, "PublicKey({})", key.algorithm().as_str())
            }
        }
    }
}

/// How the server's host key is checked during the handshake
#[derive(Debug, Clone)]
pub enum HostKeyPolicy {
    /// Only the supplied key is accepted
    Pinned(PublicKey),
    /// Any key is accepted. Insecure, kept as the default when no key is given.
    AcceptAny,
}

/// Validated configuration for one connection attempt
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// `host:port`
    pub address: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: AuthMethod,
    pub host_key_policy: HostKeyPolicy,
    /// Bound on dial + handshake + authentication
    pub timeout: Duration,
}

/// Parse a duration string such as `"5m"`, `"10s"`, `"1h30m"` or `"250ms"`.
pub fn parse_duration(
    value: &str,
    context: &'static str,
) -> Result<Duration, RemoteFileError> {
    humantime::parse_duration(value.trim())
        .map_err(|e| RemoteFileError::config(context, format!("{:?}: {}", value, e)))
}

/// Turn declared attributes into a ready-to-dial configuration.
pub fn resolve(attrs: &ConnectionAttributes) -> Result<ResolvedConfig, RemoteFileError> {
    let auth = match (&attrs.password, &attrs.private_key) {
        (Some(password), _) => AuthMethod::Password(password.clone()),
        (None, Some(key)) => AuthMethod::PublicKey(Arc::new(parse_private_key(key)?)),
        (None, None) => {
            return Err(RemoteFileError::config(
                "missing credentials",
                "must provide either a password or private key",
            ))
        }
    };

    let host_key_policy = match &attrs.host_key {
        Some(raw) => HostKeyPolicy::Pinned(parse_host_key(raw)?),
        None => HostKeyPolicy::AcceptAny,
    };

    let timeout = parse_duration(
        attrs.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT),
        "invalid timeout",
    )?;

    let port = attrs.port.unwrap_or(DEFAULT_PORT);
    let address = format!("{}:{}", attrs.host, port);

    match &host_key_policy {
        HostKeyPolicy::Pinned(key) => {
            debug!("Pinning host key {} for {}", fingerprint(key), address);
        }
        HostKeyPolicy::AcceptAny => {
            warn!(
                "No host key supplied for {}; any host key will be accepted (insecure)",
                address
            );
        }
    }

    Ok(ResolvedConfig {
        address,
        host: attrs.host.clone(),
        port,
        user: attrs.user.clone().unwrap_or_default(),
        auth,
        host_key_policy,
        timeout,
    })
}
