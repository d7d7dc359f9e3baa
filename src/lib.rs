//! Adaptive PPM compression with arithmetic coding.
//!
//! Symbols from an alphabet of configurable size are predicted from the
//! preceding context (Prediction by Partial Matching) and coded with a
//! binary arithmetic coder. Encoder and decoder update identical models, so
//! the compressed stream carries no header and no model: both sides must be
//! built from the same [`ModelConfig`] (and, when one is reused, the same
//! accumulated statistics).
//!
//! ```
//! use ppm_stream::{compress_slice, decompress_to_vec, Model, ModelConfig};
//!
//! let config = ModelConfig::default();
//! let text: Vec<u32> = b"abracadabra".iter().map(|&b| u32::from(b)).collect();
//!
//! let packed = compress_slice(&mut Model::new(config), &text)?;
//! assert_eq!(decompress_to_vec(&mut Model::new(config), &packed)?, text);
//! # Ok::<(), ppm_stream::PpmError>(())
//! ```
//!
//! ## Features
//! - Core library depends only on `thiserror` and `tracing`
//! - `async` - Whole-file helpers with tokio
//! - `cli` - The `ppm` command-line tool

pub mod coder;
pub mod config;
mod crc32;
pub mod driver;
pub mod error;
pub mod model;
pub mod symbols;

#[cfg(feature = "async")]
mod file_io;

#[cfg(test)]
mod tests;

pub use config::{EscapeMethod, ModelConfig, MAX_ALPHABET_SIZE, MAX_ORDER};
pub use driver::{
    compress_slice, decode, decompress_to_vec, encode, LogProgress, NoProgress, ProgressHook,
    StreamOptions, StreamStats,
};
pub use error::{ConfigError, PpmError, Result};
pub use model::{Model, Predictor, Token, DEFAULT_TITLE};
pub use symbols::{
    ByteSink, ByteSource, NumberSink, NumberSource, SliceSource, SymbolMode, SymbolSink,
    SymbolSource,
};

#[cfg(feature = "async")]
pub use file_io::{compress_file, decompress_file};
