//! Symbol sources and sinks.
//!
//! The driver pulls symbols lazily from a [`SymbolSource`] and pushes
//! decoded ones into a [`SymbolSink`]. Both wrap already-open readers and
//! writers; nothing here opens files.
//!
//! | Mode | Source | Sink | Record |
//! |------|--------|------|--------|
//! | [`SymbolMode::Bytes`] | [`ByteSource`] | [`ByteSink`] | one byte |
//! | [`SymbolMode::Numbers`] | [`NumberSource`] | [`NumberSink`] | decimal line |

use std::io::{self, BufRead, Read, Write};

use crate::error::{PpmError, Result};

/// How raw input maps to symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolMode {
    /// One symbol per byte.
    #[default]
    Bytes,
    /// One unsigned decimal integer per line.
    Numbers,
}

impl SymbolMode {
    /// Source reading this mode's records from `reader`.
    pub fn source<'a, R: BufRead + 'a>(self, reader: R) -> Box<dyn SymbolSource + 'a> {
        match self {
            SymbolMode::Bytes => Box::new(ByteSource::new(reader)),
            SymbolMode::Numbers => Box::new(NumberSource::new(reader)),
        }
    }

    /// Sink writing this mode's records to `writer`.
    pub fn sink<'a, W: Write + 'a>(self, writer: W) -> Box<dyn SymbolSink + 'a> {
        match self {
            SymbolMode::Bytes => Box::new(ByteSink::new(writer)),
            SymbolMode::Numbers => Box::new(NumberSink::new(writer)),
        }
    }
}

/// Lazy, finite sequence of symbols.
pub trait SymbolSource {
    /// Next symbol, or `None` once the input is exhausted.
    fn next_symbol(&mut self) -> Result<Option<u32>>;
}

/// Destination for decoded symbols.
pub trait SymbolSink {
    fn put_symbol(&mut self, symbol: u32) -> Result<()>;

    /// Called once after the last symbol.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Bytes from a reader, one symbol each.
pub struct ByteSource<R: Read> {
    bytes: io::Bytes<R>,
}

impl<R: Read> ByteSource<R> {
    /// Wrap `reader`. Pass a buffered reader; bytes are pulled one at a time.
    pub fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
        }
    }
}

impl<R: Read> SymbolSource for ByteSource<R> {
    fn next_symbol(&mut self) -> Result<Option<u32>> {
        match self.bytes.next() {
            Some(byte) => Ok(Some(u32::from(byte?))),
            None => Ok(None),
        }
    }
}

/// Newline-separated unsigned decimal integers.
///
/// Surrounding whitespace is ignored. An empty line is accepted only as the
/// very last line of the input; anything else that is not a number aborts
/// with [`PpmError::InputFormat`].
pub struct NumberSource<R: BufRead> {
    reader: R,
    line: String,
    line_no: u64,
    /// Blank line seen; only end of input may follow
    pending_blank: Option<u64>,
}

impl<R: BufRead> NumberSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            pending_blank: None,
        }
    }
}

impl<R: BufRead> SymbolSource for NumberSource<R> {
    fn next_symbol(&mut self) -> Result<Option<u32>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let record = self.line.trim();
            if record.is_empty() {
                self.pending_blank.get_or_insert(self.line_no);
                continue;
            }
            if let Some(blank) = self.pending_blank {
                return Err(PpmError::InputFormat {
                    line: blank,
                    content: String::new(),
                });
            }
            return record
                .parse::<u32>()
                .map(Some)
                .map_err(|_| PpmError::InputFormat {
                    line: self.line_no,
                    content: record.to_string(),
                });
        }
    }
}

/// In-memory symbols, mostly for tests and embedding.
pub struct SliceSource<'a> {
    symbols: std::slice::Iter<'a, u32>,
}

impl<'a> SliceSource<'a> {
    pub fn new(symbols: &'a [u32]) -> Self {
        Self {
            symbols: symbols.iter(),
        }
    }
}

impl SymbolSource for SliceSource<'_> {
    fn next_symbol(&mut self) -> Result<Option<u32>> {
        Ok(self.symbols.next().copied())
    }
}

/// Writes each symbol as one byte.
pub struct ByteSink<W: Write> {
    writer: W,
}

impl<W: Write> ByteSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SymbolSink for ByteSink<W> {
    fn put_symbol(&mut self, symbol: u32) -> Result<()> {
        let byte = u8::try_from(symbol).map_err(|_| PpmError::SymbolOutOfRange {
            symbol: u64::from(symbol),
            alphabet_size: 256,
        })?;
        self.writer.write_all(&[byte])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes each symbol as a decimal line.
pub struct NumberSink<W: Write> {
    writer: W,
}

impl<W: Write> NumberSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SymbolSink for NumberSink<W> {
    fn put_symbol(&mut self, symbol: u32) -> Result<()> {
        writeln!(self.writer, "{symbol}")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl SymbolSink for Vec<u32> {
    fn put_symbol(&mut self, symbol: u32) -> Result<()> {
        self.push(symbol);
        Ok(())
    }
}

impl<S: SymbolSource + ?Sized> SymbolSource for &mut S {
    fn next_symbol(&mut self) -> Result<Option<u32>> {
        (**self).next_symbol()
    }
}

impl<S: SymbolSink + ?Sized> SymbolSink for &mut S {
    fn put_symbol(&mut self, symbol: u32) -> Result<()> {
        (**self).put_symbol(symbol)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

impl<S: SymbolSource + ?Sized> SymbolSource for Box<S> {
    fn next_symbol(&mut self) -> Result<Option<u32>> {
        (**self).next_symbol()
    }
}

impl<S: SymbolSink + ?Sized> SymbolSink for Box<S> {
    fn put_symbol(&mut self, symbol: u32) -> Result<()> {
        (**self).put_symbol(symbol)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
