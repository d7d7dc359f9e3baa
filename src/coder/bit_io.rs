//! Bit-level adaptors over byte streams.
//!
//! Bits are packed MSB first. The reader never fails on end of input; it
//! supplies zero bits and counts how many it invented so the decoder can
//! tell a short flush from a truncated stream.

use std::io::{self, Read, Write};

const BUFFER_SIZE: usize = 4096;

/// Bit writer over any [`Write`].
pub struct BitWriter<W: Write> {
    inner: W,
    /// Partially filled output byte
    current: u8,
    /// Bits used in `current`
    bits_in_current: u32,
    bytes_written: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            current: 0,
            bits_in_current: 0,
            bytes_written: 0,
        }
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.current = (self.current << 1) | u8::from(bit);
        self.bits_in_current += 1;
        if self.bits_in_current == 8 {
            self.inner.write_all(&[self.current])?;
            self.bytes_written += 1;
            self.current = 0;
            self.bits_in_current = 0;
        }
        Ok(())
    }

    /// Write `count` copies of the same bit.
    #[inline]
    pub fn write_repeated(&mut self, bit: bool, count: u64) -> io::Result<()> {
        for _ in 0..count {
            self.write_bit(bit)?;
        }
        Ok(())
    }

    /// Pad the last byte with zeros and flush the inner writer.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.bits_in_current > 0 {
            let byte = self.current << (8 - self.bits_in_current);
            self.inner.write_all(&[byte])?;
            self.bytes_written += 1;
            self.current = 0;
            self.bits_in_current = 0;
        }
        self.inner.flush()
    }

    /// Whole bytes handed to the inner writer so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Recover the inner writer. Call [`flush`](Self::flush) first or the
    /// trailing partial byte is lost.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Bit reader over any [`Read`].
pub struct BitReader<R: Read> {
    inner: R,
    buffer: Box<[u8; BUFFER_SIZE]>,
    /// Valid bytes in `buffer`
    filled: usize,
    /// Next byte to consume from `buffer`
    pos: usize,
    /// Byte currently being shifted out
    current: u8,
    /// Bits left in `current`
    bits_in_current: u32,
    bytes_read: u64,
    /// Zero bits supplied after the end of input
    padding_bits: u64,
    at_eof: bool,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Box::new([0; BUFFER_SIZE]),
            filled: 0,
            pos: 0,
            current: 0,
            bits_in_current: 0,
            bytes_read: 0,
            padding_bits: 0,
            at_eof: false,
        }
    }

    /// Refill the byte buffer. Returns false at end of input.
    fn fill_buffer(&mut self) -> io::Result<bool> {
        if self.at_eof {
            return Ok(false);
        }
        loop {
            match self.inner.read(&mut self.buffer[..]) {
                Ok(0) => {
                    self.at_eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.filled = n;
                    self.pos = 0;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Read a single bit, or a zero bit past the end of input.
    #[inline]
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.bits_in_current == 0 {
            if self.pos >= self.filled && !self.fill_buffer()? {
                self.padding_bits += 1;
                return Ok(false);
            }
            self.current = self.buffer[self.pos];
            self.pos += 1;
            self.bytes_read += 1;
            self.bits_in_current = 8;
        }
        self.bits_in_current -= 1;
        Ok((self.current >> self.bits_in_current) & 1 != 0)
    }

    /// Bytes actually taken from the inner reader.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Zero bits invented after the end of input.
    pub fn padding_bits(&self) -> u64 {
        self.padding_bits
    }
}
