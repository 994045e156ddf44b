use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A four-byte element/record type code, e.g. `DWRD` or `PNT `.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCode([u8; 4]);

impl TypeCode {
    pub const fn new(bytes: [u8; 4]) -> Self {
        TypeCode(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    /// For family codes such as `P020` or `H00A`, the size encoded by the three trailing hex
    /// digits.
    pub fn numeric_suffix(&self) -> Option<usize> {
        let mut n = 0usize;
        for &b in &self.0[1..] {
            let digit = (b as char).to_digit(16)?;
            n = n * 16 + digit as usize;
        }
        Some(n)
    }
}

impl From<[u8; 4]> for TypeCode {
    fn from(bytes: [u8; 4]) -> Self {
        TypeCode(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTypeCode(pub String);

impl fmt::Display for InvalidTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is not a 1-4 character ASCII type code", self.0)
    }
}

impl std::error::Error for InvalidTypeCode {}

impl FromStr for TypeCode {
    type Err = InvalidTypeCode;

    /// Short codes are padded with spaces, so `"PNT"` parses as `PNT `.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 4 || !s.is_ascii() {
            return Err(InvalidTypeCode(s.to_owned()));
        }
        let mut bytes = [b' '; 4];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(TypeCode(bytes))
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode({})", self)
    }
}

impl Serialize for TypeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
