use log::{debug, warn};

use crate::codec::leaf::{encode_integer, encode_leaf};
use crate::model::{ElementId, ElementTree};
use crate::settings::CodecSettings;
use crate::template::{CountSource, ElementKind, KeySource, ListEnd};
use crate::utils::ByteWriter;

/// Serialize every materialized element in template order, followed by any trailing bytes the
/// decoder kept.
pub(crate) fn encode_tree(tree: &ElementTree, settings: &CodecSettings) -> Vec<u8> {
    let mut writer = ByteWriter::new(settings.get_endian());

    for &id in tree.roots() {
        encode_element(tree, id, &mut writer, settings);
    }
    writer.write_bytes(tree.trailing_bytes());

    debug!("encoded {} elements into {} bytes", tree.len(), writer.len());
    writer.into_inner()
}

fn encode_children(
    tree: &ElementTree,
    id: ElementId,
    writer: &mut ByteWriter,
    settings: &CodecSettings,
) {
    for &child in tree.children(id) {
        encode_element(tree, child, writer, settings);
    }
}

fn encode_element(
    tree: &ElementTree,
    id: ElementId,
    writer: &mut ByteWriter,
    settings: &CodecSettings,
) {
    let Some(element) = tree.element(id) else {
        return;
    };
    let item = element.item();

    match item.kind {
        ElementKind::Counter(source) => {
            let groups = element.children();
            let count = groups.len().min(source.max_count());
            if count < groups.len() {
                warn!(
                    "`{}` holds {} groups but can only count {count}, dropping the rest",
                    item.name,
                    groups.len()
                );
            }

            if let CountSource::Data { width, zero_based } = source {
                let stored = if zero_based {
                    (count as u64).wrapping_sub(1)
                } else {
                    count as u64
                };
                writer.write_uint(stored, width);
            }
            for &group in &groups[..count] {
                encode_children(tree, group, writer, settings);
            }
        }
        ElementKind::List(end) => {
            encode_children_of_groups(tree, element.children(), writer, settings);
            if end == ListEnd::ZeroByte {
                writer.write_u8(0);
            }
        }
        ElementKind::Keyed(source) => {
            if let KeySource::Data(format) = source {
                encode_integer(format, element.value(), writer);
            }
            encode_children(tree, id, writer, settings);
        }
        ref kind => encode_leaf(kind, element.value(), &element.padding, writer, settings),
    }
}

fn encode_children_of_groups(
    tree: &ElementTree,
    groups: &[ElementId],
    writer: &mut ByteWriter,
    settings: &CodecSettings,
) {
    for &group in groups {
        encode_children(tree, group, writer, settings);
    }
}
