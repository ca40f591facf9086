//! SSH Client implementation using russh

use std::sync::Arc;

use russh::client::{self, Handle};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::PublicKey;
use tracing::{debug, info, warn};

use super::config::{AuthMethod, HostKeyPolicy, ResolvedConfig};
use super::keys::fingerprint;
use crate::error::RemoteFileError;

/// Client handler for russh callbacks
///
/// Applies the resolved host-key policy during key exchange.
pub struct ClientHandler {
    /// `host:port`, for log lines
    address: String,
    policy: HostKeyPolicy,
}

impl ClientHandler {
    pub fn new(address: String, policy: HostKeyPolicy) -> Self {
        Self { address, policy }
    }
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::Pinned(expected) => {
                if expected.key_data() == server_public_key.key_data() {
                    debug!("Host key verified for {}", self.address);
                    Ok(true)
                } else {
                    warn!(
                        "HOST KEY MISMATCH for {}! Expected {}, got {}",
                        self.address,
                        fingerprint(expected),
                        fingerprint(server_public_key)
                    );
                    Ok(false)
                }
            }
            HostKeyPolicy::AcceptAny => {
                debug!(
                    "Accepting unverified host key {} for {}",
                    fingerprint(server_public_key),
                    self.address
                );
                Ok(true)
            }
        }
    }
}

/// Connect and authenticate, bounded by `config.timeout`.
///
/// Every failure on this path is reported as `"dial failed"`.
pub async fn dial(config: &ResolvedConfig) -> Result<Handle<ClientHandler>, RemoteFileError> {
    info!("Connecting to SSH server at {}", config.address);

    let connect = async {
        let ssh_config = Arc::new(client::Config::default());
        let handler = ClientHandler::new(config.address.clone(), config.host_key_policy.clone());

        let mut handle = client::connect(ssh_config, config.address.as_str(), handler)
            .await
            .map_err(|e| RemoteFileError::transport("dial failed", e))?;

        debug!("SSH handshake completed with {}", config.address);

        let authenticated = match &config.auth {
            AuthMethod::Password(password) => handle
                .authenticate_password(&config.user, password.as_str())
                .await
                .map_err(|e| RemoteFileError::transport("dial failed", e))?,
            AuthMethod::PublicKey(key) => {
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(|e| RemoteFileError::transport("dial failed", e))?
                    .flatten();

                handle
                    .authenticate_publickey(
                        &config.user,
                        PrivateKeyWithHashAlg::new(Arc::clone(key), hash_alg),
                    )
                    .await
                    .map_err(|e| RemoteFileError::transport("dial failed", e))?
            }
        };

        if !authenticated.success() {
            return Err(RemoteFileError::transport(
                "dial failed",
                format!("authentication rejected by server for user '{}'", config.user),
            ));
        }

        Ok::<_, RemoteFileError>(handle)
    };

    let handle = tokio::time::timeout(config.timeout, connect)
        .await
        .map_err(|_| {
            RemoteFileError::transport(
                "dial failed",
                format!("connection to {} timed out after {:?}", config.address, config.timeout),
            )
        })??;

    info!("SSH authentication successful for {}", config.address);
    Ok(handle)
}
