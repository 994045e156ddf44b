use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encoding::{EncoderTrap, EncodingRef};

use crate::err::CursorError;
use crate::utils::Endian;

/// The write-side counterpart of [`ByteCursor`](crate::utils::ByteCursor).
///
/// Writes at a position inside the buffer overwrite, writes at the end append. Seeking past the
/// end is a programming error and fails instead of silently growing the buffer.
#[derive(Clone, Debug)]
pub struct ByteWriter {
    buf: Vec<u8>,
    pos: usize,
    endian: Endian,
    saved: Vec<usize>,
}

impl ByteWriter {
    pub fn new(endian: Endian) -> Self {
        Self::with_capacity(0, endian)
    }

    pub fn with_capacity(capacity: usize, endian: Endian) -> Self {
        ByteWriter {
            buf: Vec::with_capacity(capacity),
            pos: 0,
            endian,
            saved: Vec::new(),
        }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn set_pos(&mut self, pos: usize) -> Result<(), CursorError> {
        if pos > self.buf.len() {
            return Err(CursorError::OutOfBounds {
                position: pos,
                len: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn push_position(&mut self) {
        self.saved.push(self.pos);
    }

    pub fn pop_position(&mut self) -> Result<(), CursorError> {
        self.pos = self.saved.pop().ok_or(CursorError::EmptyPositionStack)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let overlap = bytes.len().min(self.buf.len() - self.pos);
        self.buf[self.pos..self.pos + overlap].copy_from_slice(&bytes[..overlap]);
        self.buf.extend_from_slice(&bytes[overlap..]);
        self.pos += bytes.len();
    }

    pub fn write_zeros(&mut self, n: usize) {
        for _ in 0..n {
            self.write_bytes(&[0]);
        }
    }

    /// Write the low `width` bytes (1..=8) of `value`.
    pub fn write_uint_with(&mut self, value: u64, width: usize, endian: Endian) {
        let mut tmp = [0u8; 8];
        let masked = if width >= 8 {
            value
        } else {
            value & ((1u64 << (width * 8)) - 1)
        };
        match endian {
            Endian::Big => BigEndian::write_uint(&mut tmp, masked, width),
            Endian::Little => LittleEndian::write_uint(&mut tmp, masked, width),
        }
        self.write_bytes(&tmp[..width]);
    }

    /// Write `value` as a `width`-byte two's complement integer.
    pub fn write_int_with(&mut self, value: i64, width: usize, endian: Endian) {
        self.write_uint_with(value as u64, width, endian);
    }

    #[inline]
    pub fn write_uint(&mut self, value: u64, width: usize) {
        self.write_uint_with(value, width, self.endian);
    }

    #[inline]
    pub fn write_int(&mut self, value: i64, width: usize) {
        self.write_int_with(value, width, self.endian);
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_f32_with(&mut self, value: f32, endian: Endian) {
        self.write_uint_with(u64::from(value.to_bits()), 4, endian);
    }

    pub fn write_f64_with(&mut self, value: f64, endian: Endian) {
        self.write_uint_with(value.to_bits(), 8, endian);
    }

    /// Write a Pascal string, truncated to 255 encoded bytes.
    pub fn write_pascal_string(&mut self, s: &str, codec: EncodingRef) {
        let mut raw = encode_text(s, codec);
        raw.truncate(usize::from(u8::MAX));
        self.write_u8(raw.len() as u8);
        self.write_bytes(&raw);
    }
}

/// Encode `s` with `codec`, replacing characters the encoding cannot represent.
pub fn encode_text(s: &str, codec: EncodingRef) -> Vec<u8> {
    codec.encode(s, EncoderTrap::Replace).unwrap_or_else(|_| {
        s.bytes()
            .map(|b| if b.is_ascii() { b } else { b'?' })
            .collect()
    })
}
