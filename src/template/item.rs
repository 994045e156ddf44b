use std::sync::Arc;

use serde::Serialize;

use crate::template::kind::{CaseSymbol, ElementKind, IntFormat, KindFlags};
use crate::template::params::{KeySelector, SelectorItem};
use crate::type_code::TypeCode;

/// One element of a structured template.
///
/// Items are immutable once the template is built and shared through `Arc` by every tree
/// decoded from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateItem {
    pub code: TypeCode,
    /// The label exactly as stored in the template.
    pub label: String,
    /// The label with any parameters stripped, for display.
    pub name: String,
    /// Position of the entry in the flat template.
    pub index: usize,
    pub kind: ElementKind,
    #[serde(skip)]
    pub flags: KindFlags,
    /// Symbolic values declared for this element with `CASE`.
    pub cases: Vec<CaseSymbol>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Body {
    None,
    /// The sub-template repeated by a counter or list.
    Group(Vec<Arc<TemplateItem>>),
    /// The candidate sections of a keyed element.
    Sections(Vec<KeySection>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySection {
    pub selector: KeySelector,
    pub label: String,
    pub items: Vec<Arc<TemplateItem>>,
}

impl TemplateItem {
    pub fn is_unbounded(&self) -> bool {
        self.flags.contains(KindFlags::UNBOUNDED)
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(KindFlags::HIDDEN)
    }

    pub fn group(&self) -> Option<&[Arc<TemplateItem>]> {
        match &self.body {
            Body::Group(items) => Some(items),
            _ => None,
        }
    }

    pub fn sections(&self) -> &[KeySection] {
        match &self.body {
            Body::Sections(sections) => sections,
            _ => &[],
        }
    }

    /// Index of the section `key` selects: the first explicit match, else the default section.
    pub fn select_section(&self, key: i64) -> Option<usize> {
        let sections = self.sections();
        sections
            .iter()
            .position(|s| s.selector.matches(key))
            .or_else(|| sections.iter().position(|s| s.selector.is_default()))
    }

    /// A key `format` can hold that selects section `index`, if any does.
    ///
    /// Keys matched by no selector lie next to a selector bound or at an end of the format's
    /// range, so only those candidates are tried after the section's own first key.
    pub fn key_for_section(&self, index: usize, format: IntFormat) -> Option<i64> {
        let sections = self.sections();
        let section = sections.get(index)?;

        let bounds = sections
            .iter()
            .flat_map(|s| s.selector.items())
            .flat_map(|item| match *item {
                SelectorItem::Value(v) => [v.checked_sub(1), v.checked_add(1)],
                SelectorItem::Range(lo, hi) => [lo.checked_sub(1), hi.checked_add(1)],
                SelectorItem::Default => [None, None],
            })
            .flatten();
        let ends = [format.min(), format.max()]
            .into_iter()
            .filter_map(|v| i64::try_from(v).ok());

        section
            .selector
            .representative_key()
            .into_iter()
            .chain([0])
            .chain(bounds)
            .chain(ends)
            .find(|&key| format.contains(i128::from(key)) && self.select_section(key) == Some(index))
    }

    /// The symbolic name of `value`, if a `CASE` declared one.
    pub fn case_name(&self, value: i64) -> Option<&str> {
        self.cases
            .iter()
            .find(|c| c.value == value)
            .map(|c| c.name.as_str())
    }

    /// Whether decoding this item (and anything it contains) moves through the data.
    pub(crate) fn carries_data(&self) -> bool {
        if self.kind.reads_data() {
            return true;
        }
        match &self.body {
            Body::None => false,
            Body::Group(items) => items.iter().any(|i| i.carries_data()),
            Body::Sections(sections) => sections
                .iter()
                .all(|s| s.items.iter().any(|i| i.carries_data())),
        }
    }
}
