//! Binary arithmetic coder with pending-bit underflow handling.
//!
//! Classic low/high formulation with a 32-bit register (held in `u64` so
//! that `range * total` never overflows). Encoder and decoder share the
//! interval narrowing in [`narrow`] and the same renormalization thresholds;
//! any divergence between them would corrupt every following symbol.

use std::io::{Read, Write};

use super::bit_io::{BitReader, BitWriter};
use crate::error::{PpmError, Result};

/// Register width in bits.
const CODE_BITS: u32 = 32;
const TOP_VALUE: u64 = (1 << CODE_BITS) - 1;
const FIRST_QTR: u64 = 1 << (CODE_BITS - 2);
const HALF: u64 = 2 * FIRST_QTR;
const THIRD_QTR: u64 = 3 * FIRST_QTR;

/// Largest `total` an interval may be expressed over.
///
/// After renormalization the register spans more than a quarter of the
/// code space, so every sub-interval of a total below this stays non-empty.
pub const MAX_TOTAL: u32 = (FIRST_QTR - 1) as u32;

/// Padding bits the decoder may invent before the input counts as truncated.
const MAX_PADDING_BITS: u64 = CODE_BITS as u64;

/// Narrow `[low, high]` to the `[cum_low, cum_high)` share of `total`.
#[inline]
fn narrow(low: &mut u64, high: &mut u64, cum_low: u32, cum_high: u32, total: u32) {
    debug_assert!(cum_low < cum_high && cum_high <= total && total <= MAX_TOTAL);
    let range = *high - *low + 1;
    *high = *low + range * u64::from(cum_high) / u64::from(total) - 1;
    *low += range * u64::from(cum_low) / u64::from(total);
}

/// Encoding side.
pub struct ArithmeticEncoder<W: Write> {
    low: u64,
    high: u64,
    /// Opposite bits owed after the next decided bit
    pending: u64,
    output: BitWriter<W>,
}

impl<W: Write> ArithmeticEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            low: 0,
            high: TOP_VALUE,
            pending: 0,
            output: BitWriter::new(writer),
        }
    }

    /// Emit a decided bit followed by any pending opposite bits.
    #[inline]
    fn bit_plus_pending(&mut self, bit: bool) -> Result<()> {
        self.output.write_bit(bit)?;
        self.output.write_repeated(!bit, self.pending)?;
        self.pending = 0;
        Ok(())
    }

    /// Code the interval `[cum_low, cum_high)` out of `total`.
    pub fn encode(&mut self, cum_low: u32, cum_high: u32, total: u32) -> Result<()> {
        narrow(&mut self.low, &mut self.high, cum_low, cum_high, total);
        loop {
            if self.high < HALF {
                self.bit_plus_pending(false)?;
            } else if self.low >= HALF {
                self.bit_plus_pending(true)?;
                self.low -= HALF;
                self.high -= HALF;
            } else if self.low >= FIRST_QTR && self.high < THIRD_QTR {
                self.pending += 1;
                self.low -= FIRST_QTR;
                self.high -= FIRST_QTR;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
        }
        Ok(())
    }

    /// Flush the register. Two more bits select a quarter that lies wholly
    /// inside the final interval whatever the decoder reads after them.
    pub fn finish(self) -> Result<W> {
        self.finish_counted().map(|(writer, _)| writer)
    }

    /// [`finish`](Self::finish), also returning the total bytes emitted.
    pub fn finish_counted(mut self) -> Result<(W, u64)> {
        self.pending += 1;
        let bit = self.low >= FIRST_QTR;
        self.bit_plus_pending(bit)?;
        self.output.flush()?;
        let written = self.output.bytes_written();
        Ok((self.output.into_inner(), written))
    }

    /// Bytes emitted so far, not counting the partially filled last byte.
    pub fn bytes_written(&self) -> u64 {
        self.output.bytes_written()
    }

    pub fn get_ref(&self) -> &W {
        self.output.get_ref()
    }
}

/// Decoding side.
pub struct ArithmeticDecoder<R: Read> {
    low: u64,
    high: u64,
    /// Code value read so far
    value: u64,
    input: BitReader<R>,
}

impl<R: Read> ArithmeticDecoder<R> {
    /// Prime the code register with the first `CODE_BITS` bits.
    pub fn new(reader: R) -> Result<Self> {
        let mut input = BitReader::new(reader);
        let mut value = 0u64;
        for _ in 0..CODE_BITS {
            value = (value << 1) | u64::from(input.read_bit()?);
        }
        Ok(Self {
            low: 0,
            high: TOP_VALUE,
            value,
            input,
        })
    }

    /// Locate the code value within `[0, total)`.
    pub fn decode_target(&self, total: u32) -> Result<u32> {
        if self.value < self.low || self.value > self.high {
            return Err(PpmError::CorruptStream(format!(
                "code value {:#x} outside register [{:#x}, {:#x}]",
                self.value, self.low, self.high
            )));
        }
        let range = self.high - self.low + 1;
        let target = ((self.value - self.low + 1) * u64::from(total) - 1) / range;
        if target >= u64::from(total) {
            return Err(PpmError::CorruptStream(format!(
                "target {target} outside total {total}"
            )));
        }
        Ok(target as u32)
    }

    /// Remove the interval `[cum_low, cum_high)` of `total` from the input.
    pub fn decode_consume(&mut self, cum_low: u32, cum_high: u32, total: u32) -> Result<()> {
        narrow(&mut self.low, &mut self.high, cum_low, cum_high, total);
        loop {
            if self.high < HALF {
                // top bits are zero on all three registers
            } else if self.low >= HALF {
                // Wrapping: a consumed interval that missed the code value
                // leaves it outside the register; decode_target reports that.
                self.value = self.value.wrapping_sub(HALF);
                self.low -= HALF;
                self.high -= HALF;
            } else if self.low >= FIRST_QTR && self.high < THIRD_QTR {
                self.value = self.value.wrapping_sub(FIRST_QTR);
                self.low -= FIRST_QTR;
                self.high -= FIRST_QTR;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.value = ((self.value << 1) | u64::from(self.input.read_bit()?)) & TOP_VALUE;
        }
        if self.input.padding_bits() > MAX_PADDING_BITS {
            return Err(PpmError::CorruptStream(
                "compressed input ended before the end-of-stream marker".to_string(),
            ));
        }
        Ok(())
    }

    /// Compressed bytes consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.input.bytes_read()
    }
}
