//! Error types for plugin registration, loading and the bound operations.

use crate::plugin::Plugin;

/// Result type for blockdev operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the plugin registry and loaders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Identifier outside the known plugin range (including the sentinel).
    #[error("Invalid plugin identifier: {0}")]
    InvalidPlugin(u32),

    /// The shared object could not be opened.
    #[error("Failed to load {so_name}: {reason}")]
    LoadFailed { so_name: String, reason: String },

    /// The shared object was opened but lacks a required entry point.
    #[error("Missing symbol {symbol} in {so_name}")]
    MissingSymbol {
        so_name: String,
        symbol: &'static str,
    },

    /// The loader produced a handle for a different technology than requested.
    #[error("Loader returned a {found} handle for the {expected} plugin")]
    PluginMismatch { expected: Plugin, found: Plugin },

    /// The plugin did not load, so its operations cannot be used.
    #[error("Plugin not available: {0}")]
    PluginUnavailable(Plugin),

    /// A bound operation reported failure.
    #[error("{plugin} {operation} failed: {message}")]
    OperationFailed {
        plugin: Plugin,
        operation: &'static str,
        message: String,
    },

    /// An argument cannot be passed across the C boundary.
    #[error("Invalid argument for {operation}: {message}")]
    InvalidArgument {
        operation: &'static str,
        message: String,
    },

    /// The process-wide registry has already been initialized.
    #[error("Library already initialized")]
    AlreadyInitialized,
}

impl Error {
    /// Whether this error came out of a load attempt.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::LoadFailed { .. } | Error::MissingSymbol { .. } | Error::PluginMismatch { .. }
        )
    }
}
