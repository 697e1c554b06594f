//! # chunknet-oracle
//!
//! Read/subscribe client for the Chunknet multidata feeds oracle contract.
//!
//! The client is a stateless façade over one contract binding bound to one
//! address. All transport concerns (call encoding, network access, event
//! delivery) live behind the [`binding::ContractBinding`] trait.
//!
//! ## Modules
//!
//! - [`client`] - [`OracleClient`] and its builder
//! - [`binding`] - Traits the transport layer implements
//! - [`subscription`] - Unsubscribe handles and event payload decoding
//! - [`config`] - TOML client configuration

pub mod binding;
pub mod client;
pub mod config;
pub mod subscription;

pub use client::{OracleClient, OracleClientBuilder};
pub use subscription::Subscription;

use binding::BindingError;
use chunknet_types::DecodeError;

/// Error types for oracle client operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// No binding provider was supplied at construction.
    #[error("a provider instance is required")]
    MissingProvider,

    /// No contract address was supplied at construction.
    #[error("a contract address is required")]
    MissingAddress,

    /// The configured contract address is not a valid 20-byte hex address.
    #[error("invalid contract address {address:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// The requested metric id or name is not registered.
    #[error("metric not found: {0}")]
    NotFound(String),

    /// The bound contract has no implementation for a declared function.
    #[error("function {function} is not implemented by the bound contract")]
    NotImplemented {
        /// Signature or name of the missing function.
        function: String,
    },

    /// Any other failure of the binding layer.
    #[error("binding error: {0}")]
    Binding(BindingError),

    /// The binding returned a value of an unexpected shape.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The configuration file could not be read.
    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`config::ClientConfig`].
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl From<BindingError> for OracleError {
    fn from(err: BindingError) -> Self {
        match err {
            // View calls on this contract only revert for unknown keys.
            BindingError::Reverted(reason) => Self::NotFound(reason),
            BindingError::NotImplemented { function } => Self::NotImplemented { function },
            other => Self::Binding(other),
        }
    }
}

/// Convenience result type for oracle client operations.
pub type Result<T> = std::result::Result<T, OracleError>;
