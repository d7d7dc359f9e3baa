//! Whole-file helpers on top of tokio.
//!
//! The file is read into memory, coded with the blocking driver, and the
//! result written back in one go. Suitable for inputs that fit in memory;
//! for anything else use [`encode`](crate::encode) over a buffered reader.

use std::path::Path;

use tracing::debug;

use crate::driver::{decode, encode, NoProgress, StreamOptions, StreamStats};
use crate::error::Result;
use crate::model::Model;

/// Compress the file at `input` into `output`.
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn compress_file(
    model: &mut Model,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &StreamOptions,
) -> Result<StreamStats> {
    let data = tokio::fs::read(input.as_ref()).await?;
    debug!(path = %input.as_ref().display(), len = data.len(), "read input");

    let mut packed = Vec::new();
    let source = options.symbol_mode.source(&data[..]);
    let stats = encode(model, source, &mut packed, options, &mut NoProgress)?;

    tokio::fs::write(output.as_ref(), &packed).await?;
    Ok(stats)
}

/// Decompress the file at `input` into `output`.
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn decompress_file(
    model: &mut Model,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &StreamOptions,
) -> Result<StreamStats> {
    let packed = tokio::fs::read(input.as_ref()).await?;
    debug!(path = %input.as_ref().display(), len = packed.len(), "read input");

    let mut data = Vec::new();
    let stats = {
        let sink = options.symbol_mode.sink(&mut data);
        decode(model, &packed[..], sink, options, &mut NoProgress)?
    };

    tokio::fs::write(output.as_ref(), &data).await?;
    Ok(stats)
}
