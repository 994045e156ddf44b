use std::fmt;

use jiff::Timestamp;
use serde::{Serialize, Serializer};

/// Seconds between the classic Mac OS epoch (1904-01-01) and the Unix epoch.
pub const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// A `DATE` value: unsigned seconds since 1904-01-01 00:00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacDate(pub u32);

impl MacDate {
    pub fn to_timestamp(self) -> Option<Timestamp> {
        Timestamp::from_second(i64::from(self.0) - MAC_EPOCH_OFFSET).ok()
    }

    /// `None` if `ts` is outside the range a `DATE` can hold.
    pub fn from_timestamp(ts: Timestamp) -> Option<Self> {
        u32::try_from(ts.as_second() + MAC_EPOCH_OFFSET)
            .ok()
            .map(MacDate)
    }
}

impl fmt::Display for MacDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_timestamp() {
            Some(ts) => write!(f, "{}", ts.strftime("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for MacDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// QuickDraw rectangle, stored as top, left, bottom, right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rect {
    pub top: i16,
    pub left: i16,
    pub bottom: i16,
    pub right: i16,
}

/// QuickDraw point, stored vertical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Point {
    pub v: i16,
    pub h: i16,
}

/// The value held by one element of a decoded tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Elements without a value of their own (dividers, groups, markers).
    #[default]
    None,
    Signed(i64),
    Unsigned(u64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Rect(Rect),
    Point(Point),
    Date(MacDate),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "empty",
            Value::Signed(_) => "signed integer",
            Value::Unsigned(_) => "unsigned integer",
            Value::Float32(_) | Value::Float64(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Rect(_) => "rect",
            Value::Point(_) => "point",
            Value::Date(_) => "date",
        }
    }

    /// Integer values widened so signed and unsigned compare on one scale.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Signed(v) => Some(i128::from(v)),
            Value::Unsigned(v) => Some(i128::from(v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Signed(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

pub(crate) fn to_hex_string(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02X}", b);
    }
    s
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Signed(v) => write!(f, "{}", v),
            Value::Unsigned(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", to_hex_string(b)),
            Value::Rect(r) => write!(f, "({}, {}, {}, {})", r.top, r.left, r.bottom, r.right),
            Value::Point(p) => write!(f, "({}, {})", p.v, p.h),
            Value::Date(d) => write!(f, "{}", d),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Signed(v) => serializer.serialize_i64(*v),
            Value::Unsigned(v) => serializer.serialize_u64(*v),
            Value::Float32(v) => serializer.serialize_f32(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&to_hex_string(b)),
            Value::Rect(r) => r.serialize(serializer),
            Value::Point(p) => p.serialize(serializer),
            Value::Date(d) => d.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_date_conversion() {
        assert_eq!(MacDate(0).to_string(), "1904-01-01T00:00:00Z");
        assert_eq!(
            MacDate(MAC_EPOCH_OFFSET as u32).to_timestamp(),
            Some(Timestamp::UNIX_EPOCH)
        );
        assert_eq!(
            MacDate::from_timestamp(Timestamp::UNIX_EPOCH),
            Some(MacDate(MAC_EPOCH_OFFSET as u32))
        );
        assert_eq!(
            MacDate::from_timestamp(Timestamp::from_second(-MAC_EPOCH_OFFSET - 1).unwrap()),
            None
        );
    }

    #[test]
    fn test_json_shapes() {
        assert_eq!(
            serde_json::to_string(&Value::Bytes(vec![0xde, 0xad])).unwrap(),
            "\"DEAD\""
        );
        assert_eq!(
            serde_json::to_string(&Value::Point(Point { v: 1, h: -2 })).unwrap(),
            "{\"v\":1,\"h\":-2}"
        );
        assert_eq!(serde_json::to_string(&Value::None).unwrap(), "null");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Value::Rect(Rect {
                top: 1,
                left: 2,
                bottom: 3,
                right: 4
            })
            .to_string(),
            "(1, 2, 3, 4)"
        );
        assert_eq!(Value::Unsigned(7).to_string(), "7");
    }
}
