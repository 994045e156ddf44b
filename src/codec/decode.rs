use std::sync::Arc;

use log::{debug, trace, warn};

use crate::codec::RecordContext;
use crate::codec::leaf::{decode_integer, decode_leaf};
use crate::err::{CodecError, CodecResult, DecodeError, DecodeResult};
use crate::model::{ElementId, ElementTree, Value};
use crate::settings::CodecSettings;
use crate::template::{CountSource, ElementKind, IntFormat, KeySource, ListEnd, Template, TemplateItem};
use crate::utils::ByteCursor;

/// Decode `data` into a fresh tree. Nothing of the tree escapes when an element fails.
pub(crate) fn decode_tree(
    template: &Template,
    data: &[u8],
    context: RecordContext,
    settings: &CodecSettings,
) -> CodecResult<ElementTree> {
    let mut tree = ElementTree::new(context);
    let mut decoder = Decoder {
        cursor: ByteCursor::new(data, settings.get_endian()),
        settings,
    };

    for item in template.items() {
        let id = tree.add_field(item, None);
        decoder.element(&mut tree, id)?;
    }

    if decoder.cursor.remaining() > 0 {
        warn!(
            "{} bytes after the last template element at offset {} are kept as trailing data",
            decoder.cursor.remaining(),
            decoder.cursor.pos()
        );
        tree.set_trailing(decoder.cursor.take_rest().to_vec());
    }

    debug!(
        "decoded {} bytes into {} elements (record {})",
        data.len(),
        tree.len(),
        tree.context().record_id
    );
    Ok(tree)
}

struct Decoder<'a, 's> {
    cursor: ByteCursor<'a>,
    settings: &'s CodecSettings,
}

impl Decoder<'_, '_> {
    fn element(&mut self, tree: &mut ElementTree, id: ElementId) -> CodecResult<()> {
        let Some(item) = tree.element(id).map(|e| Arc::clone(e.item())) else {
            return Ok(());
        };
        trace!("0x{:08x}: `{}` {}", self.cursor.pos(), item.code, item.name);

        match item.kind {
            ElementKind::Counter(source) => self.counter(tree, id, &item, source),
            ElementKind::List(end) => self.list(tree, id, &item, end),
            ElementKind::Keyed(source) => self.keyed(tree, id, &item, source),
            ref kind => {
                let leaf = decode_leaf(kind, &mut self.cursor, self.settings)
                    .map_err(|e| failed(tree, id, &item, e))?;
                if let Some(element) = tree.node_mut(id) {
                    element.value = leaf.value;
                    element.padding = leaf.padding;
                }
                Ok(())
            }
        }
    }

    fn group(
        &mut self,
        tree: &mut ElementTree,
        list: ElementId,
        item: &TemplateItem,
    ) -> CodecResult<()> {
        let Some(group) = tree.add_group(list, None) else {
            return Ok(());
        };
        for sub in item.group().unwrap_or_default() {
            let child = tree.add_field(sub, Some(group));
            self.element(tree, child)?;
        }
        Ok(())
    }

    fn check_repetitions(&self, count: u64, offset: usize) -> DecodeResult<()> {
        let max = self.settings.get_max_repetitions() as u64;
        if count > max {
            return Err(DecodeError::LengthMismatch {
                what: "repeat count",
                offset: offset as u64,
                length: count,
                max,
            });
        }
        Ok(())
    }

    fn counter(
        &mut self,
        tree: &mut ElementTree,
        id: ElementId,
        item: &TemplateItem,
        source: CountSource,
    ) -> CodecResult<()> {
        let start = self.cursor.pos();
        let count = match source {
            CountSource::Data { width, zero_based } => {
                let stored = self
                    .cursor
                    .uint(width, "counter")
                    .map_err(|e| failed(tree, id, item, e))?;
                if zero_based {
                    // A stored all-ones value means no entries.
                    stored.wrapping_add(1) & IntFormat::unsigned(width).max() as u64
                } else {
                    stored
                }
            }
            CountSource::Static(n) => n as u64,
        };
        self.check_repetitions(count, start)
            .map_err(|e| failed(tree, id, item, e))?;

        if let CountSource::Data { .. } = source {
            set_value(tree, id, Value::Unsigned(count));
        }
        for _ in 0..count {
            self.group(tree, id, item)?;
        }
        Ok(())
    }

    fn list(
        &mut self,
        tree: &mut ElementTree,
        id: ElementId,
        item: &TemplateItem,
        end: ListEnd,
    ) -> CodecResult<()> {
        let mut groups = 0u64;

        loop {
            let before = self.cursor.pos();
            match (end, self.cursor.peek_u8()) {
                (ListEnd::EndOfData, None) => break,
                (ListEnd::ZeroByte, Some(0)) => {
                    self.cursor.advance(1, "list terminator")
                        .map_err(|e| failed(tree, id, item, e))?;
                    break;
                }
                (ListEnd::ZeroByte, None) => {
                    let e = DecodeError::InsufficientData {
                        what: "list terminator",
                        offset: before as u64,
                        need: 1,
                        have: 0,
                    };
                    return Err(failed(tree, id, item, e));
                }
                _ => {}
            }

            groups += 1;
            self.check_repetitions(groups, before)
                .map_err(|e| failed(tree, id, item, e))?;
            self.group(tree, id, item)?;

            if self.cursor.pos() == before {
                let e = DecodeError::LengthMismatch {
                    what: "list entry that consumed no data",
                    offset: before as u64,
                    length: 0,
                    max: 0,
                };
                return Err(failed(tree, id, item, e));
            }
        }

        set_value(tree, id, Value::Unsigned(groups));
        Ok(())
    }

    fn keyed(
        &mut self,
        tree: &mut ElementTree,
        id: ElementId,
        item: &TemplateItem,
        source: KeySource,
    ) -> CodecResult<()> {
        let key = match source {
            KeySource::Data(format) => {
                let value = decode_integer(format, &mut self.cursor, "key")
                    .map_err(|e| failed(tree, id, item, e))?;
                let key = value.as_i128().unwrap_or(0) as i64;
                set_value(tree, id, value);
                key
            }
            KeySource::RecordId => tree.context().record_id,
        };

        let section = item
            .select_section(key)
            .ok_or_else(|| failed(tree, id, item, DecodeError::UnresolvedCase { key }))?;
        trace!("key {key} selects section `{}`", item.sections()[section].label);

        if let Some(element) = tree.node_mut(id) {
            element.section = Some(section);
        }
        for sub in &item.sections()[section].items {
            let child = tree.add_field(sub, Some(id));
            self.element(tree, child)?;
        }
        Ok(())
    }
}

fn set_value(tree: &mut ElementTree, id: ElementId, value: Value) {
    if let Some(element) = tree.node_mut(id) {
        element.value = value;
    }
}

fn failed(tree: &ElementTree, id: ElementId, item: &TemplateItem, source: DecodeError) -> CodecError {
    CodecError::Element {
        path: tree.path(id),
        code: item.code,
        source,
    }
}
