//! Reading and writing elements that hold a single value.

use log::warn;

use crate::err::{DecodeError, DecodeResult};
use crate::model::{MacDate, Point, Rect, Value};
use crate::settings::CodecSettings;
use crate::template::{ElementKind, IntFormat, Padding};
use crate::utils::{ByteCursor, ByteWriter, decode_text, encode_text};

pub(crate) fn decode_integer(
    format: IntFormat,
    cursor: &mut ByteCursor<'_>,
    what: &'static str,
) -> DecodeResult<Value> {
    if format.signed {
        Ok(Value::Signed(cursor.int(format.width, what)?))
    } else {
        Ok(Value::Unsigned(cursor.uint(format.width, what)?))
    }
}

pub(crate) fn encode_integer(format: IntFormat, value: &Value, writer: &mut ByteWriter) {
    let n = value.as_i128().unwrap_or(0);
    let clamped = format.clamp(n);
    if clamped != n {
        warn!("{n} does not fit a {}-byte integer, writing {clamped}", format.width);
    }
    writer.write_uint(clamped as u64, format.width);
}

/// A decoded element without children.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Leaf {
    pub value: Value,
    /// Bytes read after string content, kept so they can be written back unchanged.
    pub padding: Vec<u8>,
}

/// Decode an element without children. `kind` must not be a container.
pub(crate) fn decode_leaf(
    kind: &ElementKind,
    cursor: &mut ByteCursor<'_>,
    settings: &CodecSettings,
) -> DecodeResult<Leaf> {
    let codec = settings.get_text_codec();
    let mut padding = Vec::new();

    let value = match *kind {
        ElementKind::Integer(format) => decode_integer(format, cursor, "integer")?,
        ElementKind::Float { width: 4 } => {
            Value::Float32(cursor.f32_with(cursor.endian(), "float")?)
        }
        ElementKind::Float { .. } => Value::Float64(cursor.f64_with(cursor.endian(), "double")?),
        ElementKind::Date => Value::Date(MacDate(cursor.u32_named("date")?)),
        ElementKind::Rect => Value::Rect(Rect {
            top: cursor.i16_named("rect top")?,
            left: cursor.i16_named("rect left")?,
            bottom: cursor.i16_named("rect bottom")?,
            right: cursor.i16_named("rect right")?,
        }),
        ElementKind::Point => Value::Point(Point {
            v: cursor.i16_named("point v")?,
            h: cursor.i16_named("point h")?,
        }),
        ElementKind::Filler { len } => Value::Bytes(cursor.take_bytes(len, "filler")?.to_vec()),
        ElementKind::Align { to } => {
            let pad = align_padding(cursor.pos(), to);
            Value::Bytes(cursor.take_bytes(pad, "alignment")?.to_vec())
        }
        ElementKind::BoundedString { padding: pad } => {
            let start = cursor.pos();
            let rest = cursor.rest();
            let window = match pad {
                Padding::Fixed(size) => rest.len().min(size),
                _ => rest.len(),
            };
            let len = rest[..window]
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(window);

            if let Padding::Fixed(size) = pad {
                if len >= size {
                    return Err(DecodeError::LengthMismatch {
                        what: "fixed-size string",
                        offset: start as u64,
                        length: len as u64,
                        max: size.saturating_sub(1) as u64,
                    });
                }
            }

            let raw = cursor.take_bytes(len, "string")?;
            let text = decode_text(raw, codec, start as u64)?;
            padding = cursor
                .take_bytes(pad.pad_len(len, 0), "string padding")?
                .to_vec();
            Value::Text(text)
        }
        ElementKind::PrefixedString {
            prefix,
            padding: pad,
            max,
        } => {
            let start = cursor.pos();
            let len = read_length(cursor, prefix, max as u64, "string length")?;
            let raw = cursor.take_bytes(len, "string")?;
            let text = decode_text(raw, codec, (start + prefix) as u64)?;
            padding = cursor
                .take_bytes(pad.pad_len(len, prefix), "string padding")?
                .to_vec();
            Value::Text(text)
        }
        ElementKind::PrefixedBlob {
            prefix,
            includes_prefix,
        } => {
            let start = cursor.pos();
            let stored = cursor.uint(prefix, "blob length")?;
            let len = if includes_prefix {
                stored
                    .checked_sub(prefix as u64)
                    .ok_or(DecodeError::LengthMismatch {
                        what: "blob length smaller than its own prefix",
                        offset: start as u64,
                        length: stored,
                        max: prefix as u64,
                    })?
            } else {
                stored
            };
            check_remaining(cursor, start, len)?;
            Value::Bytes(cursor.take_bytes(len as usize, "blob")?.to_vec())
        }
        ElementKind::FixedBlob { len } => Value::Bytes(cursor.take_bytes(len, "fixed blob")?.to_vec()),
        ElementKind::TrailingBlob => Value::Bytes(cursor.take_rest().to_vec()),
        ElementKind::TrailingText => {
            let start = cursor.pos();
            Value::Text(decode_text(cursor.take_rest(), codec, start as u64)?)
        }
        _ => Value::None,
    };

    Ok(Leaf { value, padding })
}

/// Encode an element without children. `kept` is the padding its string was decoded with.
pub(crate) fn encode_leaf(
    kind: &ElementKind,
    value: &Value,
    kept: &[u8],
    writer: &mut ByteWriter,
    settings: &CodecSettings,
) {
    let codec = settings.get_text_codec();

    match *kind {
        ElementKind::Integer(format) => encode_integer(format, value, writer),
        ElementKind::Float { width: 4 } => {
            let v = match *value {
                Value::Float32(v) => v,
                Value::Float64(v) => v as f32,
                _ => 0.0,
            };
            writer.write_f32_with(v, writer.endian());
        }
        ElementKind::Float { .. } => {
            let v = match *value {
                Value::Float32(v) => f64::from(v),
                Value::Float64(v) => v,
                _ => 0.0,
            };
            writer.write_f64_with(v, writer.endian());
        }
        ElementKind::Date => {
            let MacDate(secs) = match value {
                Value::Date(d) => *d,
                _ => MacDate::default(),
            };
            writer.write_uint(u64::from(secs), 4);
        }
        ElementKind::Rect => {
            let r = match value {
                Value::Rect(r) => *r,
                _ => Rect::default(),
            };
            for v in [r.top, r.left, r.bottom, r.right] {
                writer.write_int(i64::from(v), 2);
            }
        }
        ElementKind::Point => {
            let p = match value {
                Value::Point(p) => *p,
                _ => Point::default(),
            };
            writer.write_int(i64::from(p.v), 2);
            writer.write_int(i64::from(p.h), 2);
        }
        ElementKind::Filler { len } | ElementKind::FixedBlob { len } => {
            let bytes = value.as_bytes().unwrap_or_default();
            let n = bytes.len().min(len);
            writer.write_bytes(&bytes[..n]);
            writer.write_zeros(len - n);
        }
        ElementKind::Align { to } => {
            let pad = align_padding(writer.pos(), to);
            match value.as_bytes() {
                Some(bytes) if bytes.len() == pad => writer.write_bytes(bytes),
                _ => writer.write_zeros(pad),
            }
        }
        ElementKind::BoundedString { padding } => {
            let mut raw = encode_text(value.as_str().unwrap_or_default(), codec);
            // A NUL inside the content would end the string early on the next decode.
            if let Some(nul) = raw.iter().position(|&b| b == 0) {
                raw.truncate(nul);
            }
            if let Padding::Fixed(size) = padding {
                truncate_logged(&mut raw, size.saturating_sub(1));
            }
            writer.write_bytes(&raw);
            write_padding(writer, kept, padding.pad_len(raw.len(), 0), true);
        }
        ElementKind::PrefixedString {
            prefix,
            padding,
            max,
        } => {
            let mut raw = encode_text(value.as_str().unwrap_or_default(), codec);
            truncate_logged(&mut raw, max);
            writer.write_uint(raw.len() as u64, prefix);
            writer.write_bytes(&raw);
            write_padding(writer, kept, padding.pad_len(raw.len(), prefix), false);
        }
        ElementKind::PrefixedBlob {
            prefix,
            includes_prefix,
        } => {
            let mut bytes = value.as_bytes().unwrap_or_default();
            let extra = if includes_prefix { prefix } else { 0 };
            let max = IntFormat::unsigned(prefix).max() as u64 - extra as u64;
            if bytes.len() as u64 > max {
                warn!("blob of {} bytes truncated to {max}", bytes.len());
                bytes = &bytes[..max as usize];
            }
            writer.write_uint((bytes.len() + extra) as u64, prefix);
            writer.write_bytes(bytes);
        }
        ElementKind::TrailingBlob => writer.write_bytes(value.as_bytes().unwrap_or_default()),
        ElementKind::TrailingText => {
            writer.write_bytes(&encode_text(value.as_str().unwrap_or_default(), codec))
        }
        _ => {}
    }
}

/// Kept padding is reused only while it still has the length the content needs. The first
/// padding byte of a C string is its terminator and is always NUL.
fn write_padding(writer: &mut ByteWriter, kept: &[u8], len: usize, terminated: bool) {
    match kept.split_first() {
        Some((_, rest)) if kept.len() == len && terminated => {
            writer.write_u8(0);
            writer.write_bytes(rest);
        }
        Some(_) if kept.len() == len => writer.write_bytes(kept),
        _ => writer.write_zeros(len),
    }
}

fn align_padding(pos: usize, to: usize) -> usize {
    match pos.checked_rem(to) {
        Some(rem) => (to - rem) % to,
        None => 0,
    }
}

fn truncate_logged(raw: &mut Vec<u8>, max: usize) {
    if raw.len() > max {
        warn!("string of {} bytes truncated to {max}", raw.len());
        raw.truncate(max);
    }
}

fn read_length(
    cursor: &mut ByteCursor<'_>,
    prefix: usize,
    max: u64,
    what: &'static str,
) -> DecodeResult<usize> {
    let start = cursor.pos();
    let len = cursor.uint(prefix, what)?;
    if len > max {
        return Err(DecodeError::LengthMismatch {
            what,
            offset: start as u64,
            length: len,
            max,
        });
    }
    check_remaining(cursor, start, len)?;
    Ok(len as usize)
}

fn check_remaining(cursor: &ByteCursor<'_>, start: usize, len: u64) -> DecodeResult<()> {
    if len > cursor.remaining() as u64 {
        return Err(DecodeError::LengthMismatch {
            what: "length prefix exceeds remaining data",
            offset: start as u64,
            length: len,
            max: cursor.remaining() as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Endian;

    fn decode_one(kind: &ElementKind, data: &[u8]) -> DecodeResult<(Value, usize)> {
        let mut cursor = ByteCursor::new(data, Endian::Big);
        let leaf = decode_leaf(kind, &mut cursor, &CodecSettings::default())?;
        Ok((leaf.value, cursor.pos()))
    }

    fn encode_one(kind: &ElementKind, value: &Value) -> Vec<u8> {
        let mut writer = ByteWriter::new(Endian::Big);
        encode_leaf(kind, value, &[], &mut writer, &CodecSettings::default());
        writer.into_inner()
    }

    fn reencode(kind: &ElementKind, data: &[u8]) -> Vec<u8> {
        let mut cursor = ByteCursor::new(data, Endian::Big);
        let leaf = decode_leaf(kind, &mut cursor, &CodecSettings::default()).unwrap();
        let mut writer = ByteWriter::new(Endian::Big);
        encode_leaf(kind, &leaf.value, &leaf.padding, &mut writer, &CodecSettings::default());
        writer.into_inner()
    }

    #[test]
    fn test_string_padding_bytes_are_kept() {
        let c004 = ElementKind::BoundedString {
            padding: Padding::Fixed(4),
        };
        assert_eq!(reencode(&c004, b"ab\0X"), b"ab\0X");

        let estr = ElementKind::PrefixedString {
            prefix: 1,
            padding: Padding::Even,
            max: 255,
        };
        assert_eq!(reencode(&estr, b"\x02abZ"), b"\x02abZ");

        let p006 = ElementKind::PrefixedString {
            prefix: 1,
            padding: Padding::Fixed(6),
            max: 5,
        };
        assert_eq!(reencode(&p006, b"\x02ab\0\x11\x22"), b"\x02ab\0\x11\x22");

        // Padding of another length is replaced by zeros.
        let mut writer = ByteWriter::new(Endian::Big);
        encode_leaf(&c004, &Value::from("a"), b"\0X", &mut writer, &CodecSettings::default());
        assert_eq!(writer.into_inner(), b"a\0\0\0");
    }

    #[test]
    fn test_even_plus_one_strings() {
        let kind = ElementKind::BoundedString {
            padding: Padding::EvenPlusOne,
        };
        assert_eq!(encode_one(&kind, &Value::from("AB")), b"AB\0");
        assert_eq!(encode_one(&kind, &Value::from("ABC")), b"ABC\0");

        assert_eq!(
            decode_one(&kind, b"AB\0XX").unwrap(),
            (Value::from("AB"), 3)
        );
        assert_eq!(
            decode_one(&kind, b"ABC\0X").unwrap(),
            (Value::from("ABC"), 4)
        );
    }

    #[test]
    fn test_fixed_c_string() {
        let kind = ElementKind::BoundedString {
            padding: Padding::Fixed(4),
        };
        assert_eq!(decode_one(&kind, b"ab\0\0!").unwrap(), (Value::from("ab"), 4));
        assert!(matches!(
            decode_one(&kind, b"abcd"),
            Err(DecodeError::LengthMismatch { length: 4, max: 3, .. })
        ));
        assert!(matches!(
            decode_one(&kind, b"ab"),
            Err(DecodeError::InsufficientData { .. })
        ));
        assert_eq!(encode_one(&kind, &Value::from("abcdef")), b"abc\0");
    }

    #[test]
    fn test_c_string_needs_terminator() {
        let kind = ElementKind::BoundedString {
            padding: Padding::Terminator,
        };
        assert!(matches!(
            decode_one(&kind, b"abc"),
            Err(DecodeError::InsufficientData { .. })
        ));
        assert_eq!(encode_one(&kind, &Value::from("a\0b")), b"a\0");
    }

    #[test]
    fn test_pascal_strings() {
        let odd = ElementKind::PrefixedString {
            prefix: 1,
            padding: Padding::Odd,
            max: 255,
        };
        assert_eq!(encode_one(&odd, &Value::from("ab")), b"\x02ab");
        assert_eq!(encode_one(&odd, &Value::from("abc")), b"\x03abc\0");

        let fixed = ElementKind::PrefixedString {
            prefix: 1,
            padding: Padding::Fixed(6),
            max: 5,
        };
        assert_eq!(encode_one(&fixed, &Value::from("abcdefgh")), b"\x05abcde");
        assert_eq!(
            decode_one(&fixed, b"\x02ab\0\0\0").unwrap(),
            (Value::from("ab"), 6)
        );
        assert!(matches!(
            decode_one(&fixed, b"\x06abcdef"),
            Err(DecodeError::LengthMismatch { length: 6, max: 5, .. })
        ));
        assert!(matches!(
            decode_one(&odd, b"\x09abc"),
            Err(DecodeError::LengthMismatch { length: 9, max: 3, .. })
        ));
    }

    #[test]
    fn test_blobs() {
        let inclusive = ElementKind::PrefixedBlob {
            prefix: 2,
            includes_prefix: true,
        };
        assert_eq!(
            decode_one(&inclusive, &[0, 4, 0xAA, 0xBB]).unwrap(),
            (Value::Bytes(vec![0xAA, 0xBB]), 4)
        );
        assert_eq!(
            encode_one(&inclusive, &Value::Bytes(vec![0xAA, 0xBB])),
            [0, 4, 0xAA, 0xBB]
        );
        assert!(matches!(
            decode_one(&inclusive, &[0, 1]),
            Err(DecodeError::LengthMismatch { length: 1, .. })
        ));

        let fixed = ElementKind::FixedBlob { len: 3 };
        assert!(matches!(
            decode_one(&fixed, &[1, 2]),
            Err(DecodeError::InsufficientData { need: 3, have: 2, .. })
        ));
        assert_eq!(encode_one(&fixed, &Value::Bytes(vec![9])), [9, 0, 0]);
    }

    #[test]
    fn test_integers_clamp_on_encode() {
        let kind = ElementKind::Integer(IntFormat::signed(1));
        assert_eq!(encode_one(&kind, &Value::Signed(300)), [0x7F]);
        assert_eq!(encode_one(&kind, &Value::Signed(-2)), [0xFE]);
        assert_eq!(
            decode_one(&kind, &[0xFE]).unwrap(),
            (Value::Signed(-2), 1)
        );
    }

    #[test]
    fn test_scalars() {
        let (value, used) = decode_one(&ElementKind::Rect, &[0, 1, 0, 2, 0, 3, 0xFF, 0xFF]).unwrap();
        assert_eq!(
            value,
            Value::Rect(Rect {
                top: 1,
                left: 2,
                bottom: 3,
                right: -1
            })
        );
        assert_eq!(used, 8);

        let (value, _) = decode_one(&ElementKind::Float { width: 4 }, &1.5f32.to_be_bytes()).unwrap();
        assert_eq!(value, Value::Float32(1.5));
        assert_eq!(
            encode_one(&ElementKind::Date, &Value::Date(MacDate(0x0102_0304))),
            [1, 2, 3, 4]
        );
    }

    #[test]
    fn test_alignment_is_relative_to_buffer_start() {
        let mut cursor = ByteCursor::new(&[7, 0, 0, 0, 9], Endian::Big);
        cursor.advance(1, "skip").unwrap();
        let leaf = decode_leaf(
            &ElementKind::Align { to: 4 },
            &mut cursor,
            &CodecSettings::default(),
        )
        .unwrap();
        assert_eq!(leaf.value, Value::Bytes(vec![0, 0, 0]));
        assert_eq!(cursor.pos(), 4);
    }

    #[test]
    fn test_zero_alignment_adds_nothing() {
        assert_eq!(align_padding(3, 0), 0);
        assert_eq!(align_padding(3, 1), 0);
        assert_eq!(align_padding(5, 4), 3);
    }
}
