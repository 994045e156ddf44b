use thiserror::Error;

use crate::codec::CodecState;
use crate::model::ElementPath;
use crate::type_code::TypeCode;

pub type TemplateResult<T> = std::result::Result<T, TemplateError>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type CodecResult<T> = std::result::Result<T, CodecError>;
pub type ValueResult<T> = std::result::Result<T, ValueError>;
pub type SerializationResult<T> = std::result::Result<T, SerializationError>;

/// Errors raised while loading a template.
///
/// These describe a broken schema, not bad data: a template that fails with any of these is
/// never usable for decoding.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template truncated while reading {what} at offset {offset} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("failed to decode template label at offset {offset} (used encoding scheme {encoding}): {message}")]
    LabelDecode {
        encoding: &'static str,
        offset: u64,
        message: String,
    },

    #[error("unknown element type `{code}` at template entry {index} (`{label}`)")]
    UnknownTypeCode {
        code: TypeCode,
        label: String,
        index: usize,
    },

    #[error("invalid label `{label}` for `{code}` at template entry {index}: {reason}")]
    InvalidLabel {
        code: TypeCode,
        label: String,
        index: usize,
        reason: String,
    },

    #[error("variable-length element `{code}` (`{label}`) at template entry {index} must be the last element of its list")]
    UnboundedElementMisplaced {
        code: TypeCode,
        label: String,
        index: usize,
    },

    #[error("unexpected `{code}` at template entry {index}")]
    UnexpectedMarker { code: TypeCode, index: usize },

    #[error("`{code}` block opened at template entry {index} is never closed")]
    UnterminatedBlock { code: TypeCode, index: usize },

    #[error("keyed element `{code}` at template entry {index} has no cases")]
    MissingCases { code: TypeCode, index: usize },

    #[error("`CASE` at template entry {index} does not follow an integer or keyed element")]
    OrphanCase { index: usize },

    #[error("repeating block of `{code}` at template entry {index} contains no data-bearing element")]
    EmptyRepeatingBlock { code: TypeCode, index: usize },
}

/// Low-level cursor misuse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("position {position} is outside of the buffer (len={len})")]
    OutOfBounds { position: usize, len: usize },

    #[error("pop_position called on an empty position stack")]
    EmptyPositionStack,
}

/// Errors raised while decoding one element from data.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("insufficient data for {what} at offset {offset} (need {need} bytes, have {have})")]
    InsufficientData {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("failed to decode string at offset {offset} (used encoding scheme {encoding}): {message}")]
    StringDecodeFailure {
        encoding: &'static str,
        offset: u64,
        message: String,
    },

    #[error("{what} at offset {offset}: length {length} is out of range (limit {max})")]
    LengthMismatch {
        what: &'static str,
        offset: u64,
        length: u64,
        max: u64,
    },

    #[error("key {key} matches no case and no default section exists")]
    UnresolvedCase { key: i64 },

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

impl DecodeError {
    /// Offset into the record where decoding stopped, when known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            DecodeError::InsufficientData { offset, .. }
            | DecodeError::StringDecodeFailure { offset, .. }
            | DecodeError::LengthMismatch { offset, .. } => Some(*offset),
            DecodeError::UnresolvedCase { .. } | DecodeError::Cursor(_) => None,
        }
    }
}

/// Top-level error of the codec engine.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("element `{code}` at {path} failed to decode: {source}")]
    Element {
        path: ElementPath,
        code: TypeCode,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error("`{operation}` is not valid while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: CodecState,
    },
}

impl CodecError {
    /// The data error underneath an element failure, if any.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            CodecError::Element { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors returned by editor operations on a decoded tree.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("element `{code}` takes {expected} values, not {found}")]
    TypeMismatch {
        code: TypeCode,
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} does not fit element `{code}`")]
    OutOfRange { code: TypeCode, value: String },

    #[error("element `{code}` holds exactly {expected} bytes, got {found}")]
    LengthMismatch {
        code: TypeCode,
        expected: usize,
        found: usize,
    },

    #[error("element `{code}` is not a repeating list")]
    NotAList { code: TypeCode },

    #[error("element `{code}` repeats a fixed number of times")]
    FixedCount { code: TypeCode },

    #[error("group index {index} is out of range (list has {len} groups)")]
    GroupIndex { index: usize, len: usize },

    #[error("element `{code}` is not a keyed selector")]
    NotKeyed { code: TypeCode },

    #[error("key {key} matches no case and no default section exists")]
    UnresolvedCase { key: i64 },

    #[error("element `{code}` is not a cross-reference")]
    NotAReference { code: TypeCode },

    #[error("element id {0} does not refer to a live element")]
    Stale(usize),
}

/// Errors raised while rendering a tree or template for output.
#[derive(Debug, Error)]
pub enum SerializationError {
    // `quick-xml` keeps the element stack for us, so structural problems surface here together
    // with IO errors.
    #[error("writing XML failed with: {message}")]
    XmlOutputError { message: String },

    #[error("`serde_json` failed with error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("rendered output contains invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl From<quick_xml::Error> for SerializationError {
    fn from(err: quick_xml::Error) -> Self {
        SerializationError::XmlOutputError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        SerializationError::XmlOutputError {
            message: err.to_string(),
        }
    }
}
