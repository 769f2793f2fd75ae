//! Error types for HFP argument decoding and indicator configuration

use thiserror::Error;

/// Errors raised while decoding a single argument token
///
/// These never escape [`ConnectionRecord::feed`](crate::ConnectionRecord::feed).
/// The scanner logs them, discards the offending token and keeps going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token contains a byte that is not valid for the expected shape
    #[error("malformed token: {0:?}")]
    MalformedToken(String),

    /// Decimal token does not fit the destination type
    #[error("integer overflow: {0}")]
    IntegerOverflow(String),

    /// Bitmask token has the wrong width or a digit other than 0/1
    #[error("invalid bitmask: expected {width} binary digits, got {len}")]
    InvalidBitmask { width: u8, len: usize },

    /// Indicator value outside the descriptor's bounds
    #[error("value {value} out of range {min}..={max}")]
    ValueOutOfRange { value: u32, min: u8, max: u8 },

    /// Destination list is full
    #[error("capacity exceeded: {capacity} items")]
    CapacityExceeded { capacity: usize },

    /// Indicator index does not name an indicator on this connection
    #[error("unknown indicator index: {0}")]
    UnknownIndicator(u32),

    /// Token did not fit into the line buffer
    #[error("token longer than {0} bytes")]
    TokenTooLong(usize),
}

/// Errors raised while configuring the indicator registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Table is larger than the per-connection storage
    #[error("too many indicators: {count} (capacity {capacity})")]
    TooManyIndicators { count: usize, capacity: usize },

    /// A process-wide registry has already been installed
    #[error("indicator registry already installed")]
    AlreadyInstalled,

    /// Descriptor fails a consistency check
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
}
