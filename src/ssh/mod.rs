//! SSH module - resolves connection attributes and dials authenticated sessions
//!
//! This module provides the secure-channel half of the transport using the
//! russh library.
//!
//! # Features
//! - Password and public-key authentication (password wins when both are set)
//! - Host key pinning, with an insecure accept-any fallback
//! - Dial bounded by a caller-supplied timeout

mod client;
mod config;
mod keys;

pub use client::{dial, ClientHandler};
pub use config::{
    parse_duration, resolve, AuthMethod, ConnectionAttributes, HostKeyPolicy, ResolvedConfig,
    DEFAULT_PORT, DEFAULT_TIMEOUT,
};
pub use keys::{fingerprint, parse_host_key, parse_private_key};
