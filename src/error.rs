//! Error types for device discovery and the renderer registry.

use std::io;
use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by descriptions, watchers and the plugin registry.
#[derive(Error, Debug)]
pub enum Error {
    /// A native handle could not be turned into a description.
    #[error("invalid device: {0}")]
    InvalidDevice(String),

    /// A hierarchy query found no matching device.
    #[error("no such device")]
    NoSuchDevice,

    /// The device database or its monitor could not be opened or configured.
    #[error("{context}: {source}")]
    ConnectionFailure {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// A renderer plugin name was registered twice.
    #[error("renderer plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    /// No renderer plugin is registered under this name.
    #[error("unknown renderer plugin '{0}'")]
    UnknownPlugin(String),
}

impl Error {
    pub(crate) fn connection(context: &'static str, source: io::Error) -> Self {
        Error::ConnectionFailure { context, source }
    }
}
