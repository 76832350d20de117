//! Bit-level cursor over stash buffers
//!
//! Stash and item records pack fields LSB-first: the first bit of a field is
//! the lowest unread bit of the current byte, and multi-byte integers come out
//! little-endian. Header fields happen to be byte-aligned; item records are
//! not, except at record boundaries.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Widest field a single read or write can move
pub const MAX_FIELD_BITS: u32 = 64;

/// A captured run of bits whose meaning is not modeled.
///
/// Bits are stored LSB-first in `bytes`, exactly as they appeared in the
/// stream, and are replayed unchanged on encode. A deserialized value must
/// carry exactly `len.div_ceil(8)` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawOpaqueBits")]
pub struct OpaqueBits {
    len: usize,
    bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct RawOpaqueBits {
    len: usize,
    bytes: Vec<u8>,
}

impl TryFrom<RawOpaqueBits> for OpaqueBits {
    type Error = String;

    fn try_from(raw: RawOpaqueBits) -> std::result::Result<Self, Self::Error> {
        let needed = raw.len.div_ceil(8);
        if raw.bytes.len() != needed {
            return Err(format!(
                "{} opaque bits need {needed} bytes, got {}",
                raw.len,
                raw.bytes.len()
            ));
        }
        Ok(Self::new(raw.len, raw.bytes))
    }
}

impl OpaqueBits {
    pub fn new(len: usize, mut bytes: Vec<u8>) -> Self {
        bytes.resize(len.div_ceil(8), 0);
        if len % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << (len % 8)) - 1;
            }
        }
        Self { len, bytes }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            bytes: vec![0; len.div_ceil(8)],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bit at `index`; bits past the end read as zero
    pub fn bit(&self, index: usize) -> bool {
        index < self.len && (self.bytes[index / 8] >> (index % 8)) & 1 == 1
    }

    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

/// Reader over a complete in-memory buffer
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position in bits
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Current position in whole bytes (rounded down)
    pub fn byte_offset(&self) -> usize {
        self.pos / 8
    }

    pub fn seek(&mut self, bit_offset: usize) -> Result<()> {
        if bit_offset > self.total_bits() {
            return Err(Error::OutOfBounds {
                offset: bit_offset,
                requested: 0,
                available: 0,
            });
        }
        self.pos = bit_offset;
        Ok(())
    }

    pub fn total_bits(&self) -> usize {
        self.data.len() * 8
    }

    pub fn remaining_bits(&self) -> usize {
        self.total_bits().saturating_sub(self.pos)
    }

    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    fn ensure(&self, bits: usize) -> Result<()> {
        let available = self.remaining_bits();
        if bits > available {
            return Err(Error::OutOfBounds {
                offset: self.pos,
                requested: bits,
                available,
            });
        }
        Ok(())
    }

    fn ensure_aligned(&self) -> Result<()> {
        if !self.is_aligned() {
            return Err(Error::MisalignedAccess(self.pos));
        }
        Ok(())
    }

    /// Read `n` bits as an unsigned value. A zero-width read yields 0.
    pub fn read_bits(&mut self, n: u32) -> Result<u64> {
        if n > MAX_FIELD_BITS {
            return Err(Error::InvalidWidth(n));
        }
        self.ensure(n as usize)?;

        let mut value = 0u64;
        let mut done = 0u32;
        while done < n {
            let byte = self.data[self.pos / 8];
            let shift = (self.pos % 8) as u32;
            let take = (8 - shift).min(n - done);
            let chunk = (u64::from(byte) >> shift) & ((1u64 << take) - 1);
            value |= chunk << done;
            done += take;
            self.pos += take as usize;
        }

        Ok(value)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(n)?;
        self.pos += n * 8;
        Ok(bytes)
    }

    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8]> {
        self.ensure_aligned()?;
        self.ensure(n * 8)?;
        let start = self.pos / 8;
        Ok(&self.data[start..start + n])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    /// Everything after the current (aligned) position, without consuming it
    pub fn rest(&self) -> Result<&'a [u8]> {
        self.ensure_aligned()?;
        Ok(&self.data[self.pos / 8..])
    }

    /// Capture `n` bits verbatim
    pub fn read_opaque(&mut self, n: usize) -> Result<OpaqueBits> {
        self.ensure(n)?;
        let mut bytes = Vec::with_capacity(n.div_ceil(8));
        let mut left = n;
        while left > 0 {
            let take = left.min(8);
            bytes.push(self.read_bits(take as u32)? as u8);
            left -= take;
        }
        Ok(OpaqueBits::new(n, bytes))
    }

    /// Skip to the next byte boundary, returning the skipped padding bits
    pub fn align(&mut self) -> Result<OpaqueBits> {
        let pad = (8 - self.pos % 8) % 8;
        self.read_opaque(pad)
    }
}

/// Writer that grows its buffer as bits are appended.
///
/// After a `seek` backwards, writes overwrite existing bits in place; the
/// buffer length is the furthest position ever written.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    pos: usize,
    end: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, bit_offset: usize) -> Result<()> {
        if bit_offset > self.end {
            return Err(Error::OutOfBounds {
                offset: bit_offset,
                requested: 0,
                available: self.end,
            });
        }
        self.pos = bit_offset;
        Ok(())
    }

    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        if n > MAX_FIELD_BITS {
            return Err(Error::InvalidWidth(n));
        }
        if n < MAX_FIELD_BITS && value >> n != 0 {
            return Err(Error::ValueOverflow {
                value: i128::from(value),
                bits: n,
            });
        }

        let mut done = 0u32;
        while done < n {
            let index = self.pos / 8;
            if index >= self.bytes.len() {
                self.bytes.push(0);
            }
            let shift = (self.pos % 8) as u32;
            let take = (8 - shift).min(n - done);
            let mask = (((1u16 << take) - 1) as u8) << shift;
            let chunk = (((value >> done) & ((1u64 << take) - 1)) as u8) << shift;
            self.bytes[index] = (self.bytes[index] & !mask) | chunk;
            done += take;
            self.pos += take as usize;
        }
        self.end = self.end.max(self.pos);

        Ok(())
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(u64::from(bit), 1)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.is_aligned() {
            return Err(Error::MisalignedAccess(self.pos));
        }
        for &byte in bytes {
            self.write_bits(u64::from(byte), 8)?;
        }
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_opaque(&mut self, bits: &OpaqueBits) -> Result<()> {
        if bits.as_bytes().len() < bits.len().div_ceil(8) {
            return Err(Error::InvalidDocument(format!(
                "{} opaque bits stored in {} bytes",
                bits.len(),
                bits.as_bytes().len()
            )));
        }
        let mut left = bits.len();
        for &byte in bits.as_bytes() {
            if left == 0 {
                break;
            }
            let take = left.min(8);
            self.write_bits(u64::from(byte) & ((1u64 << take) - 1), take as u32)?;
            left -= take;
        }
        Ok(())
    }

    /// Pad to the next byte boundary, replaying `padding` when it has exactly
    /// the length needed and writing zeros otherwise
    pub fn pad_to_byte(&mut self, padding: &OpaqueBits) -> Result<()> {
        let pad = (8 - self.pos % 8) % 8;
        if padding.len() == pad {
            self.write_opaque(padding)
        } else {
            self.write_bits(0, pad as u32)
        }
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.truncate(self.end.div_ceil(8));
        self.bytes
    }
}
