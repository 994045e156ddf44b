//! Turns the flat entry list into nested [`TemplateItem`]s.
//!
//! Counters and lists absorb the entries that follow them as their repeated group, keyed
//! elements absorb their `CASE` symbols and `KEYB`..`KEYE` sections. Markers only exist in the
//! flat list; they never survive into the structured template.

use std::sync::Arc;

use crate::err::{TemplateError, TemplateResult};
use crate::template::item::{Body, KeySection, TemplateItem};
use crate::template::kind::{CountSource, ElementKind, KindFlags, Marker};
use crate::template::params::{self, KeySelector};
use crate::type_code::TypeCode;

#[derive(Debug, Clone)]
pub(crate) struct FlatEntry {
    pub code: TypeCode,
    pub label: String,
    pub index: usize,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    /// Ends at a matching `LSTE`, which it consumes.
    Explicit,
    /// Ends before the next counter, list or keyed element, or before the end marker of an
    /// enclosing block.
    Implicit,
    /// Ends at `KEYE`, which must be present.
    Section { code: TypeCode, index: usize },
}

pub(crate) fn structure(entries: Vec<FlatEntry>) -> TemplateResult<Vec<Arc<TemplateItem>>> {
    let mut structurer = Structurer { entries, pos: 0 };
    let items = structurer.list(Scope::Root)?;
    check_unbounded_placement(&items)?;
    Ok(items)
}

struct Structurer {
    entries: Vec<FlatEntry>,
    pos: usize,
}

impl Structurer {
    fn list(&mut self, scope: Scope) -> TemplateResult<Vec<Arc<TemplateItem>>> {
        let mut items: Vec<TemplateItem> = Vec::new();

        loop {
            let Some(entry) = self.entries.get(self.pos).cloned() else {
                return match scope {
                    Scope::Section { code, index } => {
                        Err(TemplateError::UnterminatedBlock { code, index })
                    }
                    _ => Ok(seal(items)),
                };
            };

            match &entry.kind {
                ElementKind::Marker(Marker::ListEnd) => match scope {
                    Scope::Explicit => {
                        self.pos += 1;
                        return Ok(seal(items));
                    }
                    Scope::Implicit => return Ok(seal(items)),
                    Scope::Root | Scope::Section { .. } => return Err(unexpected(&entry)),
                },
                ElementKind::Marker(Marker::SectionEnd) => match scope {
                    Scope::Section { .. } => {
                        self.pos += 1;
                        return Ok(seal(items));
                    }
                    Scope::Explicit | Scope::Implicit => return Ok(seal(items)),
                    Scope::Root => return Err(unexpected(&entry)),
                },
                ElementKind::Marker(_) => return Err(unexpected(&entry)),
                kind if scope == Scope::Implicit && kind.ends_implicit_block() => {
                    return Ok(seal(items));
                }
                ElementKind::Case(symbol) => {
                    match items.last_mut() {
                        Some(prev) if matches!(prev.kind, ElementKind::Integer(_)) => {
                            prev.cases.push(symbol.clone());
                        }
                        _ => return Err(TemplateError::OrphanCase { index: entry.index }),
                    }
                    self.pos += 1;
                }
                ElementKind::Counter(_) | ElementKind::List(_) => {
                    self.pos += 1;
                    items.push(self.repeating(entry)?);
                }
                ElementKind::Keyed(_) => {
                    self.pos += 1;
                    items.push(self.keyed(entry)?);
                }
                _ => {
                    self.pos += 1;
                    items.push(item(entry, Body::None));
                }
            }
        }
    }

    fn peek_marker(&self, marker: Marker) -> bool {
        matches!(
            self.entries.get(self.pos).map(|e| &e.kind),
            Some(ElementKind::Marker(m)) if *m == marker
        )
    }

    fn repeating(&mut self, entry: FlatEntry) -> TemplateResult<TemplateItem> {
        let scope = match entry.kind {
            ElementKind::Counter(_) if self.peek_marker(Marker::ListStart) => {
                self.pos += 1;
                Scope::Explicit
            }
            ElementKind::Counter(_) => Scope::Implicit,
            _ => Scope::Explicit,
        };

        let group = self.list(scope)?;

        let needs_data = !matches!(entry.kind, ElementKind::Counter(CountSource::Static(_)));
        if group.is_empty() || (needs_data && !group.iter().any(|i| i.carries_data())) {
            return Err(TemplateError::EmptyRepeatingBlock {
                code: entry.code,
                index: entry.index,
            });
        }

        // Nothing inside a repeated group may swallow the rest of the data.
        if let Some(unbounded) = group.iter().find(|i| i.is_unbounded()) {
            return Err(misplaced(unbounded));
        }

        Ok(item(entry, Body::Group(group)))
    }

    fn keyed(&mut self, entry: FlatEntry) -> TemplateResult<TemplateItem> {
        let mut cases = Vec::new();
        while let Some(ElementKind::Case(symbol)) = self.entries.get(self.pos).map(|e| &e.kind) {
            cases.push(symbol.clone());
            self.pos += 1;
        }

        let mut sections = Vec::new();
        while self.peek_marker(Marker::SectionStart) {
            let opener = self.entries[self.pos].clone();
            self.pos += 1;

            let selector = KeySelector::parse(&opener.label, &cases).map_err(|reason| {
                TemplateError::InvalidLabel {
                    code: opener.code,
                    label: opener.label.clone(),
                    index: opener.index,
                    reason,
                }
            })?;
            let items = self.list(Scope::Section {
                code: opener.code,
                index: opener.index,
            })?;
            check_unbounded_placement(&items)?;

            sections.push(KeySection {
                selector,
                label: opener.label.trim().to_string(),
                items,
            });
        }

        if sections.is_empty() {
            if cases.is_empty() {
                return Err(TemplateError::MissingCases {
                    code: entry.code,
                    index: entry.index,
                });
            }
            sections = cases
                .iter()
                .map(|c| KeySection {
                    selector: KeySelector::value(c.value),
                    label: c.name.clone(),
                    items: Vec::new(),
                })
                .collect();
        }

        let unbounded = sections
            .iter()
            .any(|s| s.items.last().is_some_and(|i| i.is_unbounded()));

        let mut keyed = item(entry, Body::Sections(sections));
        keyed.cases = cases;
        if unbounded {
            keyed.flags |= KindFlags::UNBOUNDED;
        }
        Ok(keyed)
    }
}

fn item(entry: FlatEntry, body: Body) -> TemplateItem {
    let name = display_name(&entry);
    TemplateItem {
        code: entry.code,
        flags: entry.kind.flags(),
        name,
        label: entry.label,
        index: entry.index,
        kind: entry.kind,
        cases: Vec::new(),
        body,
    }
}

fn display_name(entry: &FlatEntry) -> String {
    let parsed = match entry.kind {
        ElementKind::Counter(CountSource::Static(_)) => {
            params::parse_static_count(&entry.label).map(|(name, _)| name)
        }
        ElementKind::Reference(_) => params::parse_reference(&entry.label).map(|(name, _)| name),
        _ => Ok(entry.label.trim().to_string()),
    };
    parsed.unwrap_or_else(|_| entry.label.clone())
}

fn seal(items: Vec<TemplateItem>) -> Vec<Arc<TemplateItem>> {
    items.into_iter().map(Arc::new).collect()
}

fn unexpected(entry: &FlatEntry) -> TemplateError {
    TemplateError::UnexpectedMarker {
        code: entry.code,
        index: entry.index,
    }
}

fn misplaced(item: &TemplateItem) -> TemplateError {
    TemplateError::UnboundedElementMisplaced {
        code: item.code,
        label: item.label.clone(),
        index: item.index,
    }
}

/// An unbounded element may only be the last item of its list.
fn check_unbounded_placement(items: &[Arc<TemplateItem>]) -> TemplateResult<()> {
    let last = items.len().saturating_sub(1);
    match items
        .iter()
        .enumerate()
        .find(|(i, item)| item.is_unbounded() && *i != last)
    {
        Some((_, item)) => Err(misplaced(item)),
        None => Ok(()),
    }
}
