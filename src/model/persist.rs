//! Binary model persistence.
//!
//! Layout, all integers as little-endian base-128 varints unless noted:
//!
//! ```text
//! "PPMM"  version:u8
//! title_len  title bytes
//! alphabet_size  max_order  escape:u8 ('A'..'D')  flags:u8 (1 = full, 2 = update exclusions)
//! node_count
//! node 0 (root):     n  (symbol count) * n
//! node i > 0:        parent edge  n  (symbol count) * n
//! crc32:u32 LE over everything before it
//! ```
//!
//! Nodes are stored in arena order, so a parent always precedes its
//! children and symbol lists keep the order the coder relies on.

use std::collections::HashSet;
use std::io::{self, Read, Write};

use super::tree::{ContextTree, NodeId};
use super::Model;
use crate::coder::MAX_TOTAL;
use crate::config::{EscapeMethod, ModelConfig};
use crate::crc32::{crc32, Crc32};
use crate::error::{PpmError, Result};

const MAGIC: &[u8; 4] = b"PPMM";
const VERSION: u8 = 1;

const FLAG_FULL_EXCLUSIONS: u8 = 0x01;
const FLAG_UPDATE_EXCLUSIONS: u8 = 0x02;

/// Longest accepted title, in bytes.
const MAX_TITLE_LEN: u64 = 1 << 16;

/// Write a variable-length integer: 7 data bits per byte, high bit set
/// when more bytes follow.
fn write_vint<W: Write>(writer: &mut W, mut value: u64) -> io::Result<()> {
    let mut buf = [0u8; 10];
    let mut len = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            len += 1;
            break;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
    writer.write_all(&buf[..len])
}

/// Read a variable-length integer from a byte slice.
/// Returns the value and the number of bytes consumed.
#[inline]
fn read_vint(data: &[u8]) -> Option<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        // at most 10 bytes for u64
        if i >= 10 {
            return None;
        }

        result |= u64::from(byte & 0x7F) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None
}

/// Cursor over the model body.
struct VintReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> VintReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read(&mut self, what: &str) -> Result<u64> {
        let (value, consumed) = read_vint(&self.data[self.offset..])
            .ok_or_else(|| invalid(format!("truncated or oversized {what}")))?;
        self.offset += consumed;
        Ok(value)
    }

    /// Read a varint that must fit below `limit`.
    fn read_below(&mut self, what: &str, limit: u64) -> Result<u64> {
        let value = self.read(what)?;
        if value >= limit {
            return Err(invalid(format!("{what} {value} out of range (limit {limit})")));
        }
        Ok(value)
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(invalid("unexpected end of data".to_string()));
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

fn invalid(msg: String) -> PpmError {
    PpmError::InvalidModel(msg)
}

/// Forwards writes while checksumming them.
struct CrcWriter<W: Write> {
    inner: W,
    crc: Crc32,
}

impl<W: Write> Write for CrcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.crc.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Model {
    /// Serialize the model, counts included.
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = CrcWriter {
            inner: writer,
            crc: Crc32::new(),
        };
        out.write_all(MAGIC)?;
        out.write_all(&[VERSION])?;

        write_vint(&mut out, self.title.len() as u64)?;
        out.write_all(self.title.as_bytes())?;

        let config = &self.config;
        write_vint(&mut out, u64::from(config.alphabet_size()))?;
        write_vint(&mut out, config.max_order() as u64)?;
        let mut flags = 0u8;
        if config.full_exclusions() {
            flags |= FLAG_FULL_EXCLUSIONS;
        }
        if config.update_exclusions() {
            flags |= FLAG_UPDATE_EXCLUSIONS;
        }
        out.write_all(&[config.escape_method().as_char() as u8, flags])?;

        write_vint(&mut out, self.tree.len() as u64)?;
        for (_, node) in self.tree.nodes() {
            if let Some(parent) = node.parent() {
                write_vint(&mut out, parent.index() as u64)?;
                write_vint(&mut out, u64::from(node.edge()))?;
            }
            write_vint(&mut out, node.stats().len() as u64)?;
            for entry in node.stats() {
                write_vint(&mut out, u64::from(entry.symbol))?;
                write_vint(&mut out, u64::from(entry.count))?;
            }
        }

        let crc = out.crc.finish();
        let mut inner = out.inner;
        inner.write_all(&crc.to_le_bytes())?;
        inner.flush()?;
        Ok(())
    }

    /// Serialize into a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let _ = self.save(&mut buf);
        buf
    }

    /// Read a model written by [`save`](Self::save).
    pub fn load<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Parse and validate a serialized model.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MAGIC.len() + 1 + 4 {
            return Err(invalid(format!("{} bytes is too short", data.len())));
        }
        if &data[..4] != MAGIC {
            return Err(invalid("bad magic".to_string()));
        }
        if data[4] != VERSION {
            return Err(invalid(format!("unsupported version {}", data[4])));
        }
        let (body, tail) = data.split_at(data.len() - 4);
        let stored = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let actual = crc32(body);
        if stored != actual {
            return Err(invalid(format!(
                "checksum mismatch (stored {stored:#010x}, computed {actual:#010x})"
            )));
        }

        let mut reader = VintReader::new(&body[5..]);

        let title_len = reader.read_below("title length", MAX_TITLE_LEN)?;
        let title = std::str::from_utf8(reader.read_bytes(title_len as usize)?)
            .map_err(|e| invalid(format!("title is not UTF-8: {e}")))?
            .to_string();

        let alphabet_size = reader.read("alphabet size")?;
        let max_order = reader.read("max order")?;
        let escape = reader.read_u8()?;
        let escape_method = EscapeMethod::from_char(char::from(escape))
            .ok_or_else(|| invalid(format!("unknown escape method byte {escape:#04x}")))?;
        let flags = reader.read_u8()?;
        if flags & !(FLAG_FULL_EXCLUSIONS | FLAG_UPDATE_EXCLUSIONS) != 0 {
            return Err(invalid(format!("unknown flags {flags:#04x}")));
        }
        let config = ModelConfig::from_parts(
            i64::try_from(alphabet_size).unwrap_or(i64::MAX),
            i64::try_from(max_order).unwrap_or(i64::MAX),
            escape_method,
            flags & FLAG_FULL_EXCLUSIONS != 0,
            flags & FLAG_UPDATE_EXCLUSIONS != 0,
        )
        .map_err(|e| invalid(e.to_string()))?;

        let tree = read_tree(&mut reader, &config)?;
        if reader.remaining() != 0 {
            return Err(invalid(format!("{} trailing bytes", reader.remaining())));
        }

        Ok(Self {
            title,
            config,
            tree,
        })
    }
}

/// Rebuild the arena node by node, checking every structural invariant.
///
/// Counts are taken as stored. A node total only has to stay codable: its
/// sum plus the largest escape weight any method gives it fits in
/// [`MAX_TOTAL`].
fn read_tree(reader: &mut VintReader<'_>, config: &ModelConfig) -> Result<ContextTree> {
    let alphabet = u64::from(config.alphabet_size());
    let mut tree = ContextTree::new(config.max_order());
    let mut seen = HashSet::new();

    // every node takes at least one byte
    let max_nodes = reader.remaining() as u64;
    let node_count = reader.read_below("node count", max_nodes + 1)?;
    if node_count == 0 {
        return Err(invalid("missing root node".to_string()));
    }

    for index in 0..node_count as usize {
        let id = if index == 0 {
            tree.root()
        } else {
            let parent = NodeId::from_index(reader.read_below("parent", index as u64)? as usize);
            if tree.node(parent).order() >= config.max_order() {
                return Err(invalid(format!("node {index} deeper than max order")));
            }
            let edge = reader.read_below("context symbol", alphabet)? as u32;
            if tree.child(parent, edge).is_some() {
                return Err(invalid(format!("node {index} duplicates a context")));
            }
            tree.get_or_create(parent, edge)
        };

        let max_entries = alphabet.min(reader.remaining() as u64);
        let entries = reader.read_below("entry count", max_entries + 1)?;
        let mut total = 0u64;
        seen.clear();
        for _ in 0..entries {
            let symbol = reader.read_below("symbol", alphabet)? as u32;
            let count = reader.read("count")?;
            if count == 0 {
                return Err(invalid(format!("node {index} has a zero count")));
            }
            total = total.saturating_add(count);
            if total.saturating_add(entries) > u64::from(MAX_TOTAL) {
                return Err(invalid(format!("node {index} total is too large to code")));
            }
            if !seen.insert(symbol) {
                return Err(invalid(format!("node {index} repeats symbol {symbol}")));
            }
            tree.push_entry(id, symbol, count as u32);
        }
    }

    Ok(tree)
}
