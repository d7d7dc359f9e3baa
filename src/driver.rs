//! Stream driver.
//!
//! Pulls symbols from a [`SymbolSource`], codes them against a [`Model`] and
//! writes the compressed bytes, or runs the same loop backwards. Statistics
//! are kept per stream in [`StreamStats`]; the model carries over between
//! streams.
//!
//! ```
//! use ppm_stream::{compress_slice, decompress_to_vec, Model, ModelConfig};
//!
//! let config = ModelConfig::try_new(4, 2, "C").unwrap();
//! let symbols = [0, 1, 2, 3, 0, 1, 2, 3, 0, 1];
//!
//! let packed = compress_slice(&mut Model::new(config), &symbols).unwrap();
//! let unpacked = decompress_to_vec(&mut Model::new(config), &packed).unwrap();
//! assert_eq!(unpacked, symbols);
//! ```

use std::fmt;
use std::io::{Read, Write};

use tracing::{debug, info};

use crate::coder::{ArithmeticDecoder, ArithmeticEncoder};
use crate::error::Result;
use crate::model::{Context, Model, Predictor, Token};
use crate::symbols::{SliceSource, SymbolMode, SymbolSink, SymbolSource};

/// Counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Tokens coded so far, the end-of-stream sentinel included
    pub position: u64,
    /// User symbols coded
    pub symbols: u64,
    /// Compressed bytes written (encode) or consumed (decode)
    pub compressed_bytes: u64,
}

impl StreamStats {
    /// Compressed bits per input symbol; 0 for an empty stream.
    pub fn bpc(&self) -> f64 {
        if self.symbols == 0 {
            return 0.0;
        }
        (self.compressed_bytes * 8) as f64 / self.symbols as f64
    }
}

impl fmt::Display for StreamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bytes input {} bytes output {} {:.3} bpc",
            self.symbols,
            self.compressed_bytes,
            self.bpc()
        )
    }
}

/// Receives periodic [`StreamStats`] snapshots.
pub trait ProgressHook {
    fn progress(&mut self, stats: &StreamStats);
}

impl<F: FnMut(&StreamStats)> ProgressHook for F {
    fn progress(&mut self, stats: &StreamStats) {
        self(stats)
    }
}

/// Hook that ignores every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressHook for NoProgress {
    fn progress(&mut self, _stats: &StreamStats) {}
}

/// Hook that reports each snapshot as an info-level log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressHook for LogProgress {
    fn progress(&mut self, stats: &StreamStats) {
        info!("position {} {}", stats.position, stats);
    }
}

/// Per-stream knobs that do not affect the coded output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Call the progress hook every this many positions; 0 disables it
    pub progress_interval: u64,
    /// Log the whole model at debug level after every update
    pub dump_model: bool,
    pub symbol_mode: SymbolMode,
}

impl StreamOptions {
    fn due(&self, position: u64) -> bool {
        self.progress_interval > 0 && position % self.progress_interval == 0
    }
}

fn dump(model: &Model, options: &StreamOptions, position: u64) {
    if options.dump_model {
        debug!("model after position {}:\n{}", position, model);
    }
}

/// Compress every symbol of `source` into `writer`, then the end-of-stream
/// sentinel.
///
/// Returns the stream's counters. `model` keeps the statistics gathered,
/// so a second call continues where this one left off.
pub fn encode<S, W, H>(
    model: &mut Model,
    mut source: S,
    writer: W,
    options: &StreamOptions,
    hook: &mut H,
) -> Result<StreamStats>
where
    S: SymbolSource,
    W: Write,
    H: ProgressHook + ?Sized,
{
    let mut coder = ArithmeticEncoder::new(writer);
    let mut predictor = Predictor::new();
    let mut context = Context::new();
    let mut stats = StreamStats::default();

    while let Some(symbol) = source.next_symbol()? {
        predictor.encode(model, &context, Token::Symbol(symbol), &mut coder)?;
        model.tree().escalate(&mut context, symbol);
        stats.position += 1;
        stats.symbols += 1;
        dump(model, options, stats.position);
        if options.due(stats.position) {
            stats.compressed_bytes = coder.bytes_written();
            hook.progress(&stats);
        }
    }

    predictor.encode(model, &context, Token::EndOfStream, &mut coder)?;
    stats.position += 1;
    let (_, written) = coder.finish_counted()?;
    stats.compressed_bytes = written;

    info!(
        symbols = stats.symbols,
        bytes = stats.compressed_bytes,
        bpc = stats.bpc(),
        "encoded stream"
    );
    Ok(stats)
}

/// Decode tokens from `reader` into `sink` until the end-of-stream sentinel.
///
/// `model` must be in the state the encoder's model was in when the stream
/// started: same configuration and same accumulated statistics.
pub fn decode<R, K, H>(
    model: &mut Model,
    reader: R,
    mut sink: K,
    options: &StreamOptions,
    hook: &mut H,
) -> Result<StreamStats>
where
    R: Read,
    K: SymbolSink,
    H: ProgressHook + ?Sized,
{
    let mut coder = ArithmeticDecoder::new(reader)?;
    let mut predictor = Predictor::new();
    let mut context = Context::new();
    let mut stats = StreamStats::default();

    loop {
        let token = predictor.decode(model, &context, &mut coder)?;
        stats.position += 1;
        let Token::Symbol(symbol) = token else {
            break;
        };
        sink.put_symbol(symbol)?;
        model.tree().escalate(&mut context, symbol);
        stats.symbols += 1;
        dump(model, options, stats.position);
        if options.due(stats.position) {
            stats.compressed_bytes = coder.bytes_read();
            hook.progress(&stats);
        }
    }

    sink.finish()?;
    stats.compressed_bytes = coder.bytes_read();
    info!(
        symbols = stats.symbols,
        bytes = stats.compressed_bytes,
        bpc = stats.bpc(),
        "decoded stream"
    );
    Ok(stats)
}

/// Compress in-memory symbols with default options.
pub fn compress_slice(model: &mut Model, symbols: &[u32]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode(
        model,
        SliceSource::new(symbols),
        &mut out,
        &StreamOptions::default(),
        &mut NoProgress,
    )?;
    Ok(out)
}

/// Decompress a whole in-memory stream with default options.
pub fn decompress_to_vec(model: &mut Model, data: &[u8]) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    decode(
        model,
        data,
        &mut out,
        &StreamOptions::default(),
        &mut NoProgress,
    )?;
    Ok(out)
}
