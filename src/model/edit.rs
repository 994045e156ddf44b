//! Operations the presentation layer uses to change a decoded tree.
//!
//! Every edit is validated against the element's template item before it is applied, so a
//! tree only ever holds values its template can encode.

use std::sync::Arc;

use log::trace;

use crate::codec::{ExternalRecord, RecordContext, ResourceLookup};
use crate::err::{ValueError, ValueResult};
use crate::model::{ElementId, ElementTree, Value};
use crate::template::{CountSource, ElementKind, KeySource, Template, TemplateItem};
use crate::type_code::TypeCode;

/// Called with the id of every element an edit changed.
pub type ChangeHook = Box<dyn FnMut(ElementId) + Send>;

impl ElementTree {
    /// A tree for a new record: every item of `template` with its default contents.
    pub fn from_template(template: &Template, context: RecordContext) -> Self {
        let mut tree = ElementTree::new(context);
        for item in template.items() {
            tree.materialize(item, None);
        }
        tree
    }

    pub fn set_change_hook(&mut self, hook: ChangeHook) {
        self.hook = Some(hook);
    }

    pub fn clear_change_hook(&mut self) {
        self.hook = None;
    }

    fn notify(&mut self, id: ElementId) {
        if let Some(hook) = self.hook.as_mut() {
            hook(id);
        }
    }

    fn live(&self, id: ElementId) -> ValueResult<&Arc<TemplateItem>> {
        self.node(id)
            .map(|e| e.item())
            .ok_or(ValueError::Stale(id.index()))
    }

    /// Replace the value of a field.
    ///
    /// Integers are range checked against their width, fixed blobs must keep their exact
    /// length. Setting a data-keyed element switches its section like [`Self::select_key`].
    pub fn set_value(&mut self, id: ElementId, value: Value) -> ValueResult<()> {
        let item = Arc::clone(self.live(id)?);

        if let ElementKind::Keyed(KeySource::Data(_)) = item.kind {
            let key = value
                .as_i128()
                .and_then(|k| i64::try_from(k).ok())
                .ok_or_else(|| ValueError::TypeMismatch {
                    code: item.code,
                    expected: item.kind.value_type(),
                    found: value.type_name(),
                })?;
            return self.select_key(id, key);
        }

        let value = check_value(&item, value)?;
        if let Some(element) = self.node_mut(id) {
            element.value = value;
            element.padding.clear();
        }
        self.notify(id);
        Ok(())
    }

    /// Insert a default-initialized group into a data counter or list.
    pub fn insert_group(&mut self, list: ElementId, at: usize) -> ValueResult<ElementId> {
        let item = Arc::clone(self.live(list)?);
        check_resizable(&item)?;

        let len = self.children(list).len();
        if at > len {
            return Err(ValueError::GroupIndex { index: at, len });
        }

        let group = self.materialize_group(list, Some(at));
        self.sync_count(list);
        trace!("inserted group {at} into `{}`", item.name);
        self.notify(list);
        group.ok_or(ValueError::Stale(list.index()))
    }

    pub fn remove_group(&mut self, list: ElementId, at: usize) -> ValueResult<()> {
        let item = Arc::clone(self.live(list)?);
        check_resizable(&item)?;

        let len = self.children(list).len();
        if at >= len {
            return Err(ValueError::GroupIndex { index: at, len });
        }

        if let Some(element) = self.node_mut(list) {
            let group = element.children.remove(at);
            self.release(group);
        }
        self.sync_count(list);
        self.notify(list);
        Ok(())
    }

    /// Switch a keyed element to the section `key` selects, rebuilding it with defaults.
    ///
    /// Selecting the section that is already active only updates the stored key.
    pub fn select_key(&mut self, id: ElementId, key: i64) -> ValueResult<()> {
        let item = Arc::clone(self.live(id)?);
        let ElementKind::Keyed(source) = item.kind else {
            return Err(ValueError::NotKeyed { code: item.code });
        };

        let section = item
            .select_section(key)
            .ok_or(ValueError::UnresolvedCase { key })?;

        if let KeySource::Data(format) = source {
            if !format.contains(i128::from(key)) {
                return Err(ValueError::OutOfRange {
                    code: item.code,
                    value: key.to_string(),
                });
            }
            if let Some(element) = self.node_mut(id) {
                element.value = format.value_of(i128::from(key));
            }
        }

        let current = self.node(id).and_then(|e| e.section_index());
        if current != Some(section) {
            let old = self
                .node_mut(id)
                .map(|e| std::mem::take(&mut e.children))
                .unwrap_or_default();
            for child in old {
                self.release(child);
            }
            self.fill_section(id, &item, section);
        }

        self.notify(id);
        Ok(())
    }

    /// The record a cross-reference points at, as computed from its label and the tree's
    /// record id.
    pub fn reference_target(&self, id: ElementId) -> ValueResult<(TypeCode, i64)> {
        let item = self.live(id)?;
        match item.kind {
            ElementKind::Reference(target) => Ok((
                target.record_type,
                target.id.resolve(self.context().record_id),
            )),
            _ => Err(ValueError::NotAReference { code: item.code }),
        }
    }

    pub fn resolve_reference(
        &self,
        id: ElementId,
        lookup: &dyn ResourceLookup,
    ) -> ValueResult<Option<ExternalRecord>> {
        let (record_type, record_id) = self.reference_target(id)?;
        Ok(lookup.lookup(record_type, record_id))
    }

    /// Builds an element for `item` with default contents: static counters get their fixed
    /// number of groups, keyed elements their initial section.
    pub(crate) fn materialize(
        &mut self,
        item: &Arc<TemplateItem>,
        parent: Option<ElementId>,
    ) -> ElementId {
        let id = self.add_field(item, parent);

        match item.kind {
            ElementKind::Counter(CountSource::Static(count)) => {
                for _ in 0..count {
                    self.materialize_group(id, None);
                }
            }
            ElementKind::Keyed(KeySource::RecordId) => {
                if let Some(section) = item.select_section(self.context().record_id) {
                    self.fill_section(id, item, section);
                }
            }
            ElementKind::Keyed(KeySource::Data(format)) => {
                // The stored key has to select the same section again when decoded.
                let selected = (0..item.sections().len())
                    .find_map(|i| item.key_for_section(i, format).map(|key| (i, key)));
                if let Some((section, key)) = selected {
                    if let Some(element) = self.node_mut(id) {
                        element.value = format.value_of(i128::from(key));
                    }
                    self.fill_section(id, item, section);
                }
            }
            _ => {}
        }

        id
    }

    fn materialize_group(&mut self, list: ElementId, at: Option<usize>) -> Option<ElementId> {
        let item = Arc::clone(self.node(list)?.item());
        let group = self.add_group(list, at)?;
        for sub in item.group().unwrap_or_default() {
            self.materialize(sub, Some(group));
        }
        Some(group)
    }

    fn fill_section(&mut self, id: ElementId, item: &Arc<TemplateItem>, section: usize) {
        if let Some(element) = self.node_mut(id) {
            element.section = Some(section);
        }
        if let Some(section) = item.sections().get(section) {
            for sub in &section.items {
                self.materialize(sub, Some(id));
            }
        }
    }

    fn sync_count(&mut self, list: ElementId) {
        if let Some(element) = self.node_mut(list) {
            element.value = Value::Unsigned(element.children.len() as u64);
        }
    }
}

fn check_resizable(item: &TemplateItem) -> ValueResult<()> {
    match item.kind {
        ElementKind::Counter(CountSource::Static(_)) => {
            Err(ValueError::FixedCount { code: item.code })
        }
        ElementKind::Counter(_) | ElementKind::List(_) => Ok(()),
        _ => Err(ValueError::NotAList { code: item.code }),
    }
}

fn check_value(item: &TemplateItem, value: Value) -> ValueResult<Value> {
    let code = item.code;
    let mismatch = |found: &Value| ValueError::TypeMismatch {
        code,
        expected: item.kind.value_type(),
        found: found.type_name(),
    };

    match (&item.kind, value) {
        (ElementKind::Integer(format), value) => {
            let n = value.as_i128().ok_or_else(|| mismatch(&value))?;
            if format.contains(n) {
                Ok(format.value_of(n))
            } else {
                Err(ValueError::OutOfRange {
                    code,
                    value: n.to_string(),
                })
            }
        }
        (ElementKind::Float { width: 4 }, Value::Float32(v)) => Ok(Value::Float32(v)),
        (ElementKind::Float { width: 4 }, Value::Float64(v)) => Ok(Value::Float32(v as f32)),
        (ElementKind::Float { .. }, Value::Float32(v)) => Ok(Value::Float64(f64::from(v))),
        (ElementKind::Float { .. }, Value::Float64(v)) => Ok(Value::Float64(v)),
        (ElementKind::Date, value @ Value::Date(_))
        | (ElementKind::Rect, value @ Value::Rect(_))
        | (ElementKind::Point, value @ Value::Point(_)) => Ok(value),
        (
            ElementKind::BoundedString { .. }
            | ElementKind::PrefixedString { .. }
            | ElementKind::TrailingText,
            value @ Value::Text(_),
        ) => Ok(value),
        (ElementKind::Filler { len } | ElementKind::FixedBlob { len }, Value::Bytes(bytes)) => {
            if bytes.len() == *len {
                Ok(Value::Bytes(bytes))
            } else {
                Err(ValueError::LengthMismatch {
                    code,
                    expected: *len,
                    found: bytes.len(),
                })
            }
        }
        (
            ElementKind::PrefixedBlob { .. } | ElementKind::TrailingBlob | ElementKind::Align { .. },
            value @ Value::Bytes(_),
        ) => Ok(value),
        (_, value) => Err(mismatch(&value)),
    }
}
