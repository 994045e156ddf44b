use bitflags::bitflags;
use serde::Serialize;

use crate::model::{MacDate, Point, Rect, Value};

/// How an integer element is stored and shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Radix {
    Decimal,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IntFormat {
    pub width: usize,
    pub signed: bool,
    pub radix: Radix,
}

impl IntFormat {
    pub const fn signed(width: usize) -> Self {
        IntFormat {
            width,
            signed: true,
            radix: Radix::Decimal,
        }
    }

    pub const fn unsigned(width: usize) -> Self {
        IntFormat {
            width,
            signed: false,
            radix: Radix::Decimal,
        }
    }

    pub const fn hex(width: usize) -> Self {
        IntFormat {
            width,
            signed: false,
            radix: Radix::Hex,
        }
    }

    /// Width in bits, kept within what the codec can read.
    fn bits(&self) -> u32 {
        (self.width.clamp(1, 8) * 8) as u32
    }

    pub fn min(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.bits() - 1))
        } else {
            0
        }
    }

    pub fn max(&self) -> i128 {
        if self.signed {
            (1i128 << (self.bits() - 1)) - 1
        } else {
            (1i128 << self.bits()) - 1
        }
    }

    pub fn contains(&self, v: i128) -> bool {
        v >= self.min() && v <= self.max()
    }

    pub fn clamp(&self, v: i128) -> i128 {
        v.clamp(self.min(), self.max())
    }

    pub(crate) fn value_of(&self, v: i128) -> Value {
        if self.signed {
            Value::Signed(v as i64)
        } else {
            Value::Unsigned(v as u64)
        }
    }
}

/// Padding appended after string content.
///
/// `n` in the rules below is the number of bytes written so far for the element, length prefix
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Padding {
    None,
    /// A single NUL byte.
    Terminator,
    /// Pad so that the total length is odd.
    Odd,
    /// Pad so that the total length is even.
    Even,
    /// Like [`Padding::Odd`], but at least one byte is always written.
    OddPlusOne,
    /// Like [`Padding::Even`], but at least one byte is always written.
    EvenPlusOne,
    /// Pad with zeros up to a fixed total size.
    Fixed(usize),
}

impl Padding {
    pub fn pad_len(&self, content_len: usize, prefix_len: usize) -> usize {
        let n = prefix_len + content_len;
        match *self {
            Padding::None => 0,
            Padding::Terminator => 1,
            Padding::Odd => usize::from(n % 2 == 0),
            Padding::Even => n % 2,
            Padding::OddPlusOne => match Padding::Odd.pad_len(content_len, prefix_len) {
                0 => 1,
                pad => pad,
            },
            Padding::EvenPlusOne => match Padding::Even.pad_len(content_len, prefix_len) {
                0 => 1,
                pad => pad,
            },
            Padding::Fixed(size) => size.saturating_sub(n),
        }
    }
}

/// Where a repeating block gets its repetition count from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CountSource {
    /// A `width`-byte count read from data. Zero-based counters store `count - 1`.
    Data { width: usize, zero_based: bool },
    /// A fixed count taken from the template label.
    Static(usize),
}

impl CountSource {
    /// The largest count the counter can express on the wire.
    pub fn max_count(&self) -> usize {
        match *self {
            CountSource::Data { width, .. } => IntFormat::unsigned(width).max() as usize,
            CountSource::Static(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ListEnd {
    /// Repeat until the data runs out.
    EndOfData,
    /// Repeat until a zero byte, which is consumed.
    ZeroByte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeySource {
    /// The key is stored in data with this format.
    Data(IntFormat),
    /// The key is the id of the record being decoded; nothing is stored.
    RecordId,
}

/// A named key value attached to an integer or keyed element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CaseSymbol {
    pub name: String,
    pub value: i64,
}

/// How a cross-reference computes the record id it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReferenceId {
    Fixed(i64),
    /// The current record id plus an offset.
    Relative(i64),
}

impl ReferenceId {
    pub fn resolve(&self, record_id: i64) -> i64 {
        match *self {
            ReferenceId::Fixed(id) => id,
            ReferenceId::Relative(delta) => record_id.wrapping_add(delta),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReferenceTarget {
    pub record_type: crate::TypeCode,
    pub id: ReferenceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Marker {
    ListStart,
    ListEnd,
    SectionStart,
    SectionEnd,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KindFlags: u8 {
        /// Consumes all remaining data.
        const UNBOUNDED = 1;
        /// Never reads or writes any bytes by itself.
        const ZERO_WIDTH = 1 << 1;
        /// Owns nested elements (groups or keyed sections).
        const CONTAINER = 1 << 2;
        /// Only shapes the layout; not shown to users.
        const HIDDEN = 1 << 3;
        /// Only meaningful while structuring the template.
        const MARKER = 1 << 4;
    }
}

/// Every element kind a template can describe.
///
/// Registered factories build one of these from a type code and its label; all behavior of the
/// codec dispatches on this closed set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ElementKind {
    Integer(IntFormat),
    Float { width: usize },
    Date,
    Rect,
    Point,
    Filler { len: usize },
    Align { to: usize },
    /// A string ended by its padding (C strings).
    BoundedString { padding: Padding },
    PrefixedString {
        prefix: usize,
        padding: Padding,
        max: usize,
    },
    PrefixedBlob { prefix: usize, includes_prefix: bool },
    FixedBlob { len: usize },
    TrailingBlob,
    TrailingText,
    Divider,
    Counter(CountSource),
    List(ListEnd),
    Keyed(KeySource),
    Case(CaseSymbol),
    Reference(ReferenceTarget),
    Marker(Marker),
}

impl ElementKind {
    pub fn flags(&self) -> KindFlags {
        match self {
            ElementKind::TrailingBlob | ElementKind::TrailingText => KindFlags::UNBOUNDED,
            ElementKind::List(ListEnd::EndOfData) => KindFlags::UNBOUNDED | KindFlags::CONTAINER,
            ElementKind::Counter(CountSource::Static(_)) => {
                KindFlags::CONTAINER | KindFlags::ZERO_WIDTH
            }
            ElementKind::Keyed(KeySource::RecordId) => KindFlags::CONTAINER | KindFlags::ZERO_WIDTH,
            ElementKind::Counter(_) | ElementKind::List(_) | ElementKind::Keyed(_) => {
                KindFlags::CONTAINER
            }
            ElementKind::Filler { .. } | ElementKind::Align { .. } => KindFlags::HIDDEN,
            ElementKind::Divider | ElementKind::Reference(_) => KindFlags::ZERO_WIDTH,
            ElementKind::Case(_) | ElementKind::Marker(_) => {
                KindFlags::ZERO_WIDTH | KindFlags::MARKER
            }
            _ => KindFlags::empty(),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.flags().contains(KindFlags::UNBOUNDED)
    }

    /// Integer-valued scalars, the only elements a `CASE` may follow.
    pub fn integer_format(&self) -> Option<IntFormat> {
        match self {
            ElementKind::Integer(fmt) => Some(*fmt),
            ElementKind::Keyed(KeySource::Data(fmt)) => Some(*fmt),
            _ => None,
        }
    }

    /// Elements that start a new implicit counter block boundary.
    pub(crate) fn ends_implicit_block(&self) -> bool {
        matches!(
            self,
            ElementKind::Counter(_) | ElementKind::List(_) | ElementKind::Keyed(_)
        )
    }

    /// Whether an element of this kind by itself moves through the data.
    pub(crate) fn reads_data(&self) -> bool {
        match self {
            ElementKind::Filler { len } | ElementKind::FixedBlob { len } => *len > 0,
            ElementKind::Align { .. } => false,
            _ => !self.flags().contains(KindFlags::ZERO_WIDTH),
        }
    }

    /// Human-readable name of the value this kind holds.
    pub fn value_type(&self) -> &'static str {
        match self {
            ElementKind::Integer(IntFormat { signed: true, .. }) => "signed integer",
            ElementKind::Integer(_) => "unsigned integer",
            ElementKind::Float { .. } => "float",
            ElementKind::Date => "date",
            ElementKind::Rect => "rect",
            ElementKind::Point => "point",
            ElementKind::BoundedString { .. }
            | ElementKind::PrefixedString { .. }
            | ElementKind::TrailingText => "text",
            ElementKind::Filler { .. }
            | ElementKind::Align { .. }
            | ElementKind::PrefixedBlob { .. }
            | ElementKind::FixedBlob { .. }
            | ElementKind::TrailingBlob => "bytes",
            ElementKind::Keyed(KeySource::Data(_)) => "key",
            _ => "no",
        }
    }

    /// The value a freshly inserted element starts with.
    pub fn default_value(&self) -> Value {
        match self {
            ElementKind::Integer(fmt) | ElementKind::Keyed(KeySource::Data(fmt)) => {
                fmt.value_of(0)
            }
            ElementKind::Float { width: 4 } => Value::Float32(0.0),
            ElementKind::Float { .. } => Value::Float64(0.0),
            ElementKind::Date => Value::Date(MacDate::default()),
            ElementKind::Rect => Value::Rect(Rect::default()),
            ElementKind::Point => Value::Point(Point::default()),
            ElementKind::Filler { len } | ElementKind::FixedBlob { len } => {
                Value::Bytes(vec![0; *len])
            }
            ElementKind::Align { .. }
            | ElementKind::PrefixedBlob { .. }
            | ElementKind::TrailingBlob => Value::Bytes(Vec::new()),
            ElementKind::BoundedString { .. }
            | ElementKind::PrefixedString { .. }
            | ElementKind::TrailingText => Value::Text(String::new()),
            ElementKind::Counter(CountSource::Data { .. }) | ElementKind::List(_) => {
                Value::Unsigned(0)
            }
            _ => Value::None,
        }
    }
}
