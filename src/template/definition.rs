use encoding::EncodingRef;
use serde::Serialize;

use crate::err::{DecodeError, TemplateError, TemplateResult};
use crate::type_code::TypeCode;
use crate::utils::{ByteCursor, ByteWriter, Endian};

/// One raw template entry: a four-byte type code followed by a Pascal-string label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateEntry {
    pub code: TypeCode,
    pub label: String,
}

impl TemplateEntry {
    pub fn new(code: TypeCode, label: impl Into<String>) -> Self {
        TemplateEntry {
            code,
            label: label.into(),
        }
    }
}

/// The flat entry list a template is stored as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateDefinition {
    entries: Vec<TemplateEntry>,
}

impl TemplateDefinition {
    pub fn new() -> Self {
        TemplateDefinition::default()
    }

    pub fn push(&mut self, code: TypeCode, label: impl Into<String>) -> &mut Self {
        self.entries.push(TemplateEntry::new(code, label));
        self
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the serialized form: entries back to back until the end of `data`, each being a
    /// type code and a label (length byte + `codec` text).
    pub fn parse(data: &[u8], codec: EncodingRef) -> TemplateResult<Self> {
        let mut cursor = ByteCursor::new(data, Endian::Big);
        let mut entries = Vec::new();

        while cursor.remaining() > 0 {
            let code = cursor
                .array::<4>("template type code")
                .map_err(template_error)?;
            let label = cursor
                .pascal_string(codec, "template label")
                .map_err(template_error)?;
            entries.push(TemplateEntry::new(TypeCode::new(code), label));
        }

        Ok(TemplateDefinition { entries })
    }

    pub fn to_bytes(&self, codec: EncodingRef) -> Vec<u8> {
        let mut writer = ByteWriter::new(Endian::Big);
        for entry in &self.entries {
            writer.write_bytes(entry.code.as_bytes());
            writer.write_pascal_string(&entry.label, codec);
        }
        writer.into_inner()
    }
}

impl FromIterator<(TypeCode, String)> for TemplateDefinition {
    fn from_iter<I: IntoIterator<Item = (TypeCode, String)>>(iter: I) -> Self {
        TemplateDefinition {
            entries: iter
                .into_iter()
                .map(|(code, label)| TemplateEntry::new(code, label))
                .collect(),
        }
    }
}

fn template_error(err: DecodeError) -> TemplateError {
    match err {
        DecodeError::InsufficientData {
            what,
            offset,
            need,
            have,
        } => TemplateError::Truncated {
            what,
            offset,
            need,
            have,
        },
        DecodeError::StringDecodeFailure {
            encoding,
            offset,
            message,
        } => TemplateError::LabelDecode {
            encoding,
            offset,
            message,
        },
        other => TemplateError::LabelDecode {
            encoding: "n/a",
            offset: 0,
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding::all::{ASCII, MAC_ROMAN};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_entries() {
        let mut def = TemplateDefinition::new();
        def.push(TypeCode::new(*b"OCNT"), "Count")
            .push(TypeCode::new(*b"PSTR"), "Name");

        let bytes = def.to_bytes(MAC_ROMAN);
        assert_eq!(bytes, b"OCNT\x05CountPSTR\x04Name".to_vec());
        assert_eq!(TemplateDefinition::parse(&bytes, MAC_ROMAN).unwrap(), def);
    }

    #[test]
    fn test_truncated_template() {
        let err = TemplateDefinition::parse(b"OCNT\x05CountPST", MAC_ROMAN).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Truncated {
                offset: 10,
                need: 4,
                have: 3,
                ..
            }
        ));

        let err = TemplateDefinition::parse(b"OCNT\x09Count", MAC_ROMAN).unwrap_err();
        assert!(matches!(err, TemplateError::Truncated { offset: 5, .. }));
    }

    #[test]
    fn test_label_encoding() {
        let data = b"DWRD\x04\x8Aber";
        let def = TemplateDefinition::parse(&data[..], MAC_ROMAN).unwrap();
        assert_eq!(def.entries()[0].label, "äber");

        assert!(matches!(
            TemplateDefinition::parse(&data[..], ASCII),
            Err(TemplateError::LabelDecode { .. })
        ));
    }

    #[test]
    fn test_empty_template() {
        let def = TemplateDefinition::parse(&[], MAC_ROMAN).unwrap();
        assert!(def.is_empty());
        assert!(def.to_bytes(MAC_ROMAN).is_empty());
    }
}
