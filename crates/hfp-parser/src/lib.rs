//! HFP AT Command Parser
//!
//! This crate incrementally parses the AT command dialect spoken between a
//! Bluetooth Hands-Free unit (HF) and an Audio Gateway (AG). Bytes are fed
//! one at a time as they arrive from RFCOMM or a serial link; the parser
//! never blocks and never asks for more input.
//!
//! # Architecture
//!
//! - [`scanner`]: total transition function over [`ParserState`]
//! - [`command`]: static table mapping command names to [`CommandId`] and
//!   [`ArgumentShape`]
//! - [`decode`]: one decoder per argument shape
//! - [`registry`]: shared AG and generic status indicator tables
//! - [`connection`]: the per-connection [`ConnectionRecord`] the decoders
//!   write into
//!
//! Malformed input never aborts parsing. Unknown commands are skipped up to
//! their line end, bad tokens are dropped while the positional cursor still
//! advances, and list items beyond capacity are discarded.
//!
//! # Example
//!
//! ```rust
//! use hfp_parser::{CommandId, ConnectionRecord};
//!
//! let mut conn = ConnectionRecord::new();
//! for &byte in b"\r\nAT+BAC=1,2\r\n" {
//!     conn.feed(byte);
//! }
//!
//! assert_eq!(conn.command(), CommandId::AvailableCodecs);
//! assert_eq!(conn.remote_codecs(), &[1, 2]);
//! ```

pub mod command;
pub mod connection;
pub mod decode;
pub mod error;
pub mod registry;
pub mod scanner;

pub use command::{ArgumentShape, CommandForm, CommandId};
pub use connection::{ConnectionRecord, LINE_BUFFER_SIZE, MAX_CODECS};
pub use error::{ParseError, RegistryError};
pub use registry::{
    ag_indicator_descriptors, generic_status_indicator_descriptors, AgIndicatorDescriptor,
    GenericStatusIndicator, IndicatorRegistry, MAX_AG_INDICATORS, MAX_GENERIC_STATUS_INDICATORS,
};
pub use scanner::ParserState;
