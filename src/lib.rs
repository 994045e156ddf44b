#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

//! Template-driven binary codec.
//!
//! A [`Template`] is an ordered list of typed element descriptors (four-byte type codes with
//! labels). Decoding a record with it yields an editable [`ElementTree`]; encoding the tree
//! reproduces the record byte for byte when nothing was changed.
//!
//! ```
//! use restmpl::{CodecSettings, RecordContext, Registry, Template, TemplateDefinition, TypeCode};
//!
//! let mut definition = TemplateDefinition::new();
//! definition
//!     .push(TypeCode::new(*b"UWRD"), "count")
//!     .push(TypeCode::new(*b"DLNG"), "value");
//! let template = Template::from_definition(definition, &Registry::standard()).unwrap();
//!
//! let data = [0, 2, 0, 0, 0, 5];
//! let settings = CodecSettings::default();
//! let tree = restmpl::decode(&template, &data, RecordContext::new(128), &settings).unwrap();
//! assert_eq!(restmpl::encode(&tree, &settings), data);
//! ```

pub use codec::{
    CodecState, ExternalRecord, RecordContext, ResourceLookup, Session, TemplateFilter, decode,
    encode,
};
pub use err::{
    CodecError, CodecResult, DecodeError, DecodeResult, SerializationError, SerializationResult,
    TemplateError, TemplateResult, ValueError, ValueResult,
};
pub use model::{Element, ElementId, ElementPath, ElementTree, MacDate, Point, Rect, Role, Value};
pub use output::OutputFormat;
pub use settings::CodecSettings;
pub use template::{ElementKind, Registry, Template, TemplateDefinition, TemplateEntry, TemplateItem};
pub use type_code::TypeCode;
pub use utils::Endian;

pub mod codec;
pub mod err;
pub mod model;
pub mod output;
pub mod template;

mod settings;
mod type_code;
mod utils;

pub use utils::{hexdump, hexdump_around};

// For tests, we only initialize logging once.
#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
