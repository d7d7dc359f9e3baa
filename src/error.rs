//! Error types for PPM modeling and coding.
//!
//! This module provides the [`PpmError`] type which covers every failure the
//! compressor can report, from configuration validation through decoding.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Configuration | [`Config`] | Rejected before any stream work begins |
//! | Input | [`InputFormat`], [`SymbolOutOfRange`] | Source produced an unusable record |
//! | Resource | [`Io`] | Injected reader/writer failed |
//! | Decoding | [`CorruptStream`] | Compressed bytes do not match the model |
//! | Persistence | [`InvalidModel`] | Saved model failed validation |
//!
//! ## Example
//!
//! ```rust
//! use ppm_stream::{ModelConfig, PpmError};
//!
//! match ModelConfig::try_new(0, 5, "D") {
//!     Err(PpmError::Config(e)) => eprintln!("bad configuration: {e}"),
//!     Err(e) => eprintln!("error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! ```
//!
//! [`Config`]: PpmError::Config
//! [`InputFormat`]: PpmError::InputFormat
//! [`SymbolOutOfRange`]: PpmError::SymbolOutOfRange
//! [`Io`]: PpmError::Io
//! [`CorruptStream`]: PpmError::CorruptStream
//! [`InvalidModel`]: PpmError::InvalidModel

use std::io;

use thiserror::Error;

/// Reasons a [`ModelConfig`](crate::ModelConfig) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The alphabet must contain at least one symbol.
    #[error("alphabet size must be positive (got {0})")]
    NonPositiveAlphabet(i64),

    /// The alphabet is larger than the coder's precision allows.
    #[error("alphabet size {size} exceeds the maximum of {max}")]
    AlphabetTooLarge { size: i64, max: u32 },

    /// Context orders count symbols and cannot be negative.
    #[error("max order must not be negative (got {0})")]
    NegativeOrder(i64),

    /// The order exceeds the supported context depth.
    #[error("max order {order} exceeds the maximum of {max}")]
    OrderTooLarge { order: i64, max: usize },

    /// The escape method is not one of `A`, `B`, `C` or `D`.
    #[error("unknown escape method {0:?} (expected one of A, B, C, D)")]
    UnknownEscapeMethod(String),
}

/// Error type for PPM operations.
///
/// Every fallible operation in the crate returns this type. It implements
/// [`std::error::Error`], and I/O failures keep their original
/// [`io::Error`] as the source.
#[derive(Debug, Error)]
pub enum PpmError {
    /// The model configuration is invalid.
    ///
    /// Raised before any symbol is read; nothing is partially applied.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A numeric-mode record failed to parse as an unsigned integer.
    ///
    /// `line` is 1-based. The stream is aborted rather than skipping the
    /// record, because compression needs the exact symbol sequence.
    #[error("formatting error on line {line}: {content:?} is not an unsigned integer")]
    InputFormat {
        /// Line number of the offending record.
        line: u64,
        /// The record as read, without its line terminator.
        content: String,
    },

    /// A symbol falls outside the configured alphabet.
    ///
    /// Also raised when a byte sink receives a value that does not fit in
    /// a byte.
    #[error("symbol {symbol} is outside the alphabet of size {alphabet_size}")]
    SymbolOutOfRange {
        /// The offending value.
        symbol: u64,
        /// Size of the alphabet it was checked against.
        alphabet_size: u64,
    },

    /// An I/O error occurred on an injected source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The compressed input cannot be decoded with this model.
    ///
    /// Either the encoder used a different model/configuration, or the
    /// compressed bytes are damaged or truncated. The decoder never tries to
    /// resynchronize.
    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),

    /// A persisted model failed validation while loading.
    #[error("invalid model data: {0}")]
    InvalidModel(String),
}

pub type Result<T> = std::result::Result<T, PpmError>;
