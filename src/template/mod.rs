//! Template loading: the definition format, element factories and the structuring pass.

mod definition;
mod item;
pub mod kind;
pub mod params;
mod registry;
mod structure;

use std::sync::Arc;

use log::debug;

use crate::err::{TemplateError, TemplateResult};
use crate::settings::CodecSettings;

pub use self::definition::{TemplateDefinition, TemplateEntry};
pub use self::item::{Body, KeySection, TemplateItem};
pub use self::kind::{
    CaseSymbol, CountSource, ElementKind, IntFormat, KeySource, KindFlags, ListEnd, Marker,
    Padding, Radix, ReferenceId, ReferenceTarget,
};
pub use self::params::{KeySelector, SelectorItem};
pub use self::registry::{EntrySpec, Factory, Registry};

use self::structure::FlatEntry;

/// A loaded, structured and validated template.
///
/// Templates are immutable and cheap to clone; every tree decoded from one shares its items.
#[derive(Debug, Clone)]
pub struct Template {
    definition: TemplateDefinition,
    items: Arc<[Arc<TemplateItem>]>,
}

impl Template {
    /// Parse a serialized template and build it with `registry`.
    pub fn parse(
        data: &[u8],
        registry: &Registry,
        settings: &CodecSettings,
    ) -> TemplateResult<Self> {
        let definition = TemplateDefinition::parse(data, settings.get_text_codec())?;
        Template::from_definition(definition, registry)
    }

    pub fn from_definition(
        definition: TemplateDefinition,
        registry: &Registry,
    ) -> TemplateResult<Self> {
        let flat = definition
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Ok::<_, TemplateError>(FlatEntry {
                    code: entry.code,
                    label: entry.label.clone(),
                    index,
                    kind: registry.instantiate(entry, index)?,
                })
            })
            .collect::<TemplateResult<Vec<_>>>()?;

        let items = structure::structure(flat)?;
        debug!(
            "structured {} template entries into {} top-level items",
            definition.len(),
            items.len()
        );

        Ok(Template {
            definition,
            items: items.into(),
        })
    }

    pub fn definition(&self) -> &TemplateDefinition {
        &self.definition
    }

    pub fn items(&self) -> &[Arc<TemplateItem>] {
        &self.items
    }

    /// Whether the template consumes everything after its fixed part.
    pub fn is_unbounded(&self) -> bool {
        self.items.last().is_some_and(|i| i.is_unbounded())
    }

    /// Depth-first visit of every item, sections and groups included.
    pub fn walk(&self) -> Vec<(usize, &TemplateItem)> {
        fn visit<'a>(items: &'a [Arc<TemplateItem>], depth: usize, out: &mut Vec<(usize, &'a TemplateItem)>) {
            for item in items {
                out.push((depth, item));
                match &item.body {
                    Body::None => {}
                    Body::Group(group) => visit(group, depth + 1, out),
                    Body::Sections(sections) => {
                        for section in sections {
                            visit(&section.items, depth + 1, out);
                        }
                    }
                }
            }
        }

        let mut out = Vec::new();
        visit(&self.items, 0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_code::TypeCode;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_template_is_shareable() {
        assert_send_sync::<Template>();
    }

    #[test]
    fn test_parse_runs_every_stage() {
        let mut def = TemplateDefinition::new();
        def.push(TypeCode::new(*b"OCNT"), "Count")
            .push(TypeCode::new(*b"LSTC"), "")
            .push(TypeCode::new(*b"PSTR"), "Name")
            .push(TypeCode::new(*b"LSTE"), "")
            .push(TypeCode::new(*b"HEXD"), "Rest");

        let settings = CodecSettings::default();
        let bytes = def.to_bytes(settings.get_text_codec());
        let template = Template::parse(&bytes, &Registry::standard(), &settings).unwrap();

        assert_eq!(template.items().len(), 2);
        assert!(template.is_unbounded());
        assert_eq!(template.definition(), &def);
        let depths: Vec<usize> = template.walk().iter().map(|(d, _)| *d).collect();
        assert_eq!(depths, [0, 1, 0]);
    }

    #[test]
    fn test_unknown_code_fails_at_load_time() {
        let mut def = TemplateDefinition::new();
        def.push(TypeCode::new(*b"DWRD"), "ok")
            .push(TypeCode::new(*b"WHAT"), "nope");
        assert!(matches!(
            Template::from_definition(def, &Registry::standard()),
            Err(TemplateError::UnknownTypeCode { index: 1, .. })
        ));
    }
}
