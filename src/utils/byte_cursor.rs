use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encoding::{DecoderTrap, EncodingRef};
use serde::Serialize;

use crate::err::{CursorError, DecodeError, DecodeResult};
use crate::utils::bytes;

/// Byte order of multi-byte integers and floats.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// A read cursor over an immutable byte slice.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`, with explicit bounds control: every
/// read either consumes exactly the bytes it asked for or fails with
/// [`DecodeError::InsufficientData`] and leaves the position untouched.
///
/// Multi-byte reads use the cursor-wide [`Endian`] unless a `*_with` variant overrides it.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
    saved: Vec<usize>,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8], endian: Endian) -> Self {
        ByteCursor {
            buf,
            pos: 0,
            endian,
            saved: Vec::new(),
        }
    }

    #[inline]
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
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
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_pos(&mut self, pos: usize) -> DecodeResult<()> {
        if pos > self.buf.len() {
            return Err(CursorError::OutOfBounds {
                position: pos,
                len: self.buf.len(),
            }
            .into());
        }
        self.pos = pos;
        Ok(())
    }

    pub fn advance(&mut self, n: usize, what: &'static str) -> DecodeResult<()> {
        if n > self.remaining() {
            return Err(bytes::insufficient(what, self.pos, n, self.buf.len()));
        }
        self.pos += n;
        Ok(())
    }

    /// Save the current position, to be restored with [`ByteCursor::pop_position`].
    pub fn push_position(&mut self) {
        self.saved.push(self.pos);
    }

    pub fn pop_position(&mut self) -> Result<(), CursorError> {
        self.pos = self.saved.pop().ok_or(CursorError::EmptyPositionStack)?;
        Ok(())
    }

    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// The unread tail of the buffer, without consuming it.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn take_bytes(&mut self, len: usize, what: &'static str) -> DecodeResult<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    pub fn take_rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    pub fn array<const N: usize>(&mut self, what: &'static str) -> DecodeResult<[u8; N]> {
        let v = bytes::read_array_r::<N>(self.buf, self.pos, what)?;
        self.pos += N;
        Ok(v)
    }

    /// Read a `width`-byte (1..=8) unsigned integer.
    pub fn uint_with(
        &mut self,
        width: usize,
        endian: Endian,
        what: &'static str,
    ) -> DecodeResult<u64> {
        let v = match endian {
            Endian::Big => bytes::read_uint_r::<BigEndian>(self.buf, self.pos, width, what)?,
            Endian::Little => bytes::read_uint_r::<LittleEndian>(self.buf, self.pos, width, what)?,
        };
        self.pos += width;
        Ok(v)
    }

    /// Read a `width`-byte (1..=8) two's complement integer.
    pub fn int_with(&mut self, width: usize, endian: Endian, what: &'static str) -> DecodeResult<i64> {
        let v = match endian {
            Endian::Big => bytes::read_int_r::<BigEndian>(self.buf, self.pos, width, what)?,
            Endian::Little => bytes::read_int_r::<LittleEndian>(self.buf, self.pos, width, what)?,
        };
        self.pos += width;
        Ok(v)
    }

    #[inline]
    pub fn uint(&mut self, width: usize, what: &'static str) -> DecodeResult<u64> {
        self.uint_with(width, self.endian, what)
    }

    #[inline]
    pub fn int(&mut self, width: usize, what: &'static str) -> DecodeResult<i64> {
        self.int_with(width, self.endian, what)
    }

    #[inline]
    pub fn u8_named(&mut self, what: &'static str) -> DecodeResult<u8> {
        let b = self
            .peek_u8()
            .ok_or_else(|| bytes::insufficient(what, self.pos, 1, self.buf.len()))?;
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    pub fn u16_named(&mut self, what: &'static str) -> DecodeResult<u16> {
        Ok(self.uint(2, what)? as u16)
    }

    #[inline]
    pub fn i16_named(&mut self, what: &'static str) -> DecodeResult<i16> {
        Ok(self.int(2, what)? as i16)
    }

    #[inline]
    pub fn u32_named(&mut self, what: &'static str) -> DecodeResult<u32> {
        Ok(self.uint(4, what)? as u32)
    }

    pub fn f32_with(&mut self, endian: Endian, what: &'static str) -> DecodeResult<f32> {
        Ok(f32::from_bits(self.uint_with(4, endian, what)? as u32))
    }

    pub fn f64_with(&mut self, endian: Endian, what: &'static str) -> DecodeResult<f64> {
        Ok(f64::from_bits(self.uint_with(8, endian, what)?))
    }

    /// Read a Pascal string: one length byte followed by that many bytes of `codec` text.
    pub fn pascal_string(&mut self, codec: EncodingRef, what: &'static str) -> DecodeResult<String> {
        let start = self.pos;
        let len = self.u8_named(what)? as usize;
        let raw = match self.take_bytes(len, what) {
            Ok(raw) => raw,
            Err(e) => {
                self.pos = start;
                return Err(e);
            }
        };
        decode_text(raw, codec, (start + 1) as u64)
    }
}

/// Decode `raw` with `codec`, failing on bytes the encoding cannot represent.
pub fn decode_text(raw: &[u8], codec: EncodingRef, offset: u64) -> DecodeResult<String> {
    codec
        .decode(raw, DecoderTrap::Strict)
        .map_err(|m| DecodeError::StringDecodeFailure {
            encoding: codec.name(),
            offset,
            message: m.to_string(),
        })
}
