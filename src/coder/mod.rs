//! Arithmetic coding.
//!
//! The model hands the coder intervals `[cum_low, cum_high)` out of a
//! `total`; the coder turns a sequence of them into bits and back.
//!
//! ```rust
//! use ppm_stream::coder::{ArithmeticDecoder, ArithmeticEncoder};
//!
//! let mut encoder = ArithmeticEncoder::new(Vec::new());
//! encoder.encode(2, 3, 4)?;
//! let bytes = encoder.finish()?;
//!
//! let mut decoder = ArithmeticDecoder::new(&bytes[..])?;
//! assert_eq!(decoder.decode_target(4)?, 2);
//! decoder.decode_consume(2, 3, 4)?;
//! # Ok::<(), ppm_stream::PpmError>(())
//! ```

mod arithmetic;
mod bit_io;

pub use arithmetic::{ArithmeticDecoder, ArithmeticEncoder, MAX_TOTAL};
pub use bit_io::{BitReader, BitWriter};
