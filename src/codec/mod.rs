//! Decoding records into element trees and encoding them back.

mod decode;
mod encode;
mod leaf;

use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::err::{CodecError, CodecResult};
use crate::model::ElementTree;
use crate::settings::CodecSettings;
use crate::template::Template;
use crate::type_code::TypeCode;

/// Identity of the record being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct RecordContext {
    pub record_type: Option<TypeCode>,
    pub record_id: i64,
}

impl RecordContext {
    pub fn new(record_id: i64) -> Self {
        RecordContext {
            record_type: None,
            record_id,
        }
    }

    pub fn with_type(mut self, record_type: TypeCode) -> Self {
        self.record_type = Some(record_type);
        self
    }
}

/// A record returned by a [`ResourceLookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRecord {
    pub record_type: TypeCode,
    pub record_id: i64,
    pub name: Option<String>,
    pub data: Vec<u8>,
}

/// Finds records that cross-reference elements point at.
pub trait ResourceLookup {
    fn lookup(&self, record_type: TypeCode, record_id: i64) -> Option<ExternalRecord>;
}

/// A reversible transform around the codec: applied to raw bytes before decoding, and to the
/// encoded bytes after encoding.
pub trait TemplateFilter {
    fn before_decode(&self, raw: &[u8]) -> Vec<u8>;
    fn after_encode(&self, encoded: Vec<u8>) -> Vec<u8>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CodecState {
    Idle,
    Decoding,
    Decoded,
    Encoding,
    Encoded,
}

impl fmt::Display for CodecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CodecState::Idle => "idle",
            CodecState::Decoding => "decoding",
            CodecState::Decoded => "decoded",
            CodecState::Encoding => "encoding",
            CodecState::Encoded => "encoded",
        };
        f.write_str(s)
    }
}

/// Decode `data` with `template` into a new tree.
pub fn decode(
    template: &Template,
    data: &[u8],
    context: RecordContext,
    settings: &CodecSettings,
) -> CodecResult<ElementTree> {
    decode::decode_tree(template, data, context, settings)
}

/// Encode a tree back to bytes. Values that do not fit are clamped or truncated.
pub fn encode(tree: &ElementTree, settings: &CodecSettings) -> Vec<u8> {
    encode::encode_tree(tree, settings)
}

/// Decodes and encodes records of one template, owning the tree in between.
///
/// A session only exposes a tree after a successful decode; a failed decode leaves it idle
/// with no tree at all.
pub struct Session {
    template: Template,
    settings: CodecSettings,
    filter: Option<Box<dyn TemplateFilter + Send + Sync>>,
    state: CodecState,
    tree: Option<ElementTree>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("filter", &self.filter.is_some())
            .field("tree", &self.tree)
            .finish()
    }
}

impl Session {
    pub fn new(template: Template, settings: CodecSettings) -> Self {
        Session {
            template,
            settings,
            filter: None,
            state: CodecState::Idle,
            tree: None,
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn TemplateFilter + Send + Sync>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }

    pub fn tree(&self) -> Option<&ElementTree> {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> Option<&mut ElementTree> {
        self.tree.as_mut()
    }

    /// Decode a record, replacing any tree the session held.
    pub fn decode(&mut self, data: &[u8], context: RecordContext) -> CodecResult<&mut ElementTree> {
        self.state = CodecState::Decoding;
        self.tree = None;

        let filtered;
        let input = match &self.filter {
            Some(filter) => {
                filtered = filter.before_decode(data);
                filtered.as_slice()
            }
            None => data,
        };

        let tree = match decode::decode_tree(&self.template, input, context, &self.settings) {
            Ok(tree) => tree,
            Err(e) => {
                debug!("decode of record {} failed: {e}", context.record_id);
                self.state = CodecState::Idle;
                return Err(e);
            }
        };

        if self.settings.should_verify_round_trip() {
            let encoded = encode::encode_tree(&tree, &self.settings);
            if encoded != input {
                warn!(
                    "record {} does not round-trip ({} bytes in, {} bytes out)",
                    context.record_id,
                    input.len(),
                    encoded.len()
                );
            }
        }

        self.state = CodecState::Decoded;
        Ok(self.tree.insert(tree))
    }

    /// Encode the current tree.
    pub fn encode(&mut self) -> CodecResult<Vec<u8>> {
        let tree = match (self.state, self.tree.as_ref()) {
            (CodecState::Decoded | CodecState::Encoded, Some(tree)) => tree,
            (state, _) => {
                return Err(CodecError::InvalidState {
                    operation: "encode",
                    state,
                });
            }
        };

        self.state = CodecState::Encoding;
        let mut bytes = encode::encode_tree(tree, &self.settings);
        if let Some(filter) = &self.filter {
            bytes = filter.after_encode(bytes);
        }
        self.state = CodecState::Encoded;
        Ok(bytes)
    }

    /// Give up the current tree and return to idle.
    pub fn close(&mut self) -> Option<ElementTree> {
        self.state = CodecState::Idle;
        self.tree.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Registry, TemplateDefinition};

    fn session(entries: &[(&[u8; 4], &str)]) -> Session {
        let mut def = TemplateDefinition::new();
        for (code, label) in entries {
            def.push(TypeCode::new(**code), *label);
        }
        let template = Template::from_definition(def, &Registry::standard()).unwrap();
        Session::new(template, CodecSettings::default())
    }

    struct Xor(u8);

    impl TemplateFilter for Xor {
        fn before_decode(&self, raw: &[u8]) -> Vec<u8> {
            raw.iter().map(|b| b ^ self.0).collect()
        }

        fn after_encode(&self, encoded: Vec<u8>) -> Vec<u8> {
            encoded.into_iter().map(|b| b ^ self.0).collect()
        }
    }

    #[test]
    fn test_encode_requires_a_decoded_tree() {
        let mut session = session(&[(b"DWRD", "x")]);
        assert!(matches!(
            session.encode(),
            Err(CodecError::InvalidState {
                state: CodecState::Idle,
                ..
            })
        ));
    }

    #[test]
    fn test_failed_decode_publishes_nothing() {
        crate::ensure_env_logger_initialized();
        let mut session = session(&[(b"DWRD", "x"), (b"DLNG", "y")]);
        session.decode(&[0, 1, 0, 0, 0, 2], RecordContext::new(1)).unwrap();
        assert_eq!(session.state(), CodecState::Decoded);

        let err = session.decode(&[0, 1, 0], RecordContext::new(1)).unwrap_err();
        assert!(err.to_string().contains("/y"), "{err}");
        assert_eq!(session.state(), CodecState::Idle);
        assert!(session.tree().is_none());
        assert!(session.encode().is_err());
    }

    #[test]
    fn test_state_transitions() {
        let mut session = session(&[(b"UWRD", "x")]);
        session.decode(&[0, 7], RecordContext::default()).unwrap();
        assert_eq!(session.encode().unwrap(), [0, 7]);
        assert_eq!(session.state(), CodecState::Encoded);
        // Encoding again is fine, the tree stays.
        assert_eq!(session.encode().unwrap(), [0, 7]);

        assert!(session.close().is_some());
        assert_eq!(session.state(), CodecState::Idle);
        assert!(session.encode().is_err());
    }

    #[test]
    fn test_filter_wraps_the_codec() {
        let mut session = session(&[(b"UBYT", "x")]).with_filter(Box::new(Xor(0xFF)));
        let tree = session.decode(&[0xFE], RecordContext::default()).unwrap();
        let x = tree.roots()[0];
        assert_eq!(tree.value(x), Some(&crate::model::Value::Unsigned(1)));
        assert_eq!(session.encode().unwrap(), [0xFE]);
    }
}
