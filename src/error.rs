//! Error types for echonet-emulator.

use thiserror::Error;

/// Main error type for all emulator operations.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// I/O error during socket operations (bind, send).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Packet construction request failed validation.
    ///
    /// The message names the offending field (`tid`, `seoj`, `deoj`,
    /// `esv`, `operations`, `epc`, `edt`). No partial frame is ever
    /// emitted alongside this error.
    #[error("invalid packet: {0}")]
    Compose(String),

    /// Destination address is not a dotted-quad IPv4 string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The send queue already holds its maximum number of items.
    ///
    /// Returned immediately, before any I/O is attempted.
    #[error("the send queue is full")]
    QueueFull,

    /// The transport engine has gone away (its task panicked or the
    /// engine was dropped while a send was in flight).
    #[error("transport engine closed")]
    EngineClosed,
}

impl EmulatorError {
    /// Shorthand for a compose validation failure.
    pub(crate) fn compose(msg: impl Into<String>) -> Self {
        Self::Compose(msg.into())
    }
}

/// Result type alias using EmulatorError.
pub type Result<T> = std::result::Result<T, EmulatorError>;
