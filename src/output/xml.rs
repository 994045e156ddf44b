use log::trace;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::err::SerializationResult;
use crate::model::{ElementId, ElementTree, Role, to_hex_string};
use crate::template::{ElementKind, TemplateItem};

/// Render the tree as an indented XML document.
///
/// Every element of the tree becomes a `Field` (or `Group`, for one repetition of a list)
/// carrying its type code and label as attributes; leaf values are the text content.
pub fn to_xml_string(tree: &ElementTree) -> SerializationResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut record = BytesStart::new("Record");
    let context = tree.context();
    if let Some(record_type) = context.record_type {
        record.push_attribute(("type", record_type.to_string().as_str()));
    }
    record.push_attribute(("id", context.record_id.to_string().as_str()));
    writer.write_event(Event::Start(record))?;

    for &id in tree.roots() {
        write_element(&mut writer, tree, id)?;
    }

    if !tree.trailing_bytes().is_empty() {
        writer.write_event(Event::Start(BytesStart::new("Trailing")))?;
        let hex = to_hex_string(tree.trailing_bytes());
        writer.write_event(Event::Text(BytesText::new(&hex)))?;
        writer.write_event(Event::End(BytesEnd::new("Trailing")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Record")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    tree: &ElementTree,
    id: ElementId,
) -> SerializationResult<()> {
    let Some(element) = tree.element(id) else {
        return Ok(());
    };
    let item = element.item();

    if element.role() == Role::Group {
        let index = tree
            .parent(id)
            .map(|list| tree.children(list).iter().position(|&g| g == id).unwrap_or(0))
            .unwrap_or(0);
        let mut start = BytesStart::new("Group");
        start.push_attribute(("index", index.to_string().as_str()));
        return write_container(writer, tree, start, element.children());
    }

    let mut start = field_start(item);
    trace!("xml: `{}` {}", item.code, item.name);

    match item.kind {
        ElementKind::Counter(_) | ElementKind::List(_) => {
            start.push_attribute(("count", element.children().len().to_string().as_str()));
            write_container(writer, tree, start, element.children())
        }
        ElementKind::Keyed(_) => {
            if !element.value().is_none() {
                start.push_attribute(("key", element.value().to_string().as_str()));
            }
            if let Some(section) = element.section() {
                start.push_attribute(("section", section.label.as_str()));
            }
            write_container(writer, tree, start, element.children())
        }
        ElementKind::Reference(_) => {
            if let Ok((record_type, record_id)) = tree.reference_target(id) {
                start.push_attribute(("target_type", record_type.to_string().as_str()));
                start.push_attribute(("target_id", record_id.to_string().as_str()));
            }
            writer.write_event(Event::Empty(start))?;
            Ok(())
        }
        _ if element.value().is_none() => {
            writer.write_event(Event::Empty(start))?;
            Ok(())
        }
        _ => {
            if let Some(case) = element
                .value()
                .as_i128()
                .and_then(|v| i64::try_from(v).ok())
                .and_then(|v| item.case_name(v))
            {
                start.push_attribute(("case", case));
            }
            let text = element.value().to_string();
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new("Field")))?;
            Ok(())
        }
    }
}

fn field_start(item: &TemplateItem) -> BytesStart<'static> {
    let mut start = BytesStart::new("Field");
    start.push_attribute(("code", item.code.to_string().as_str()));
    if !item.name.is_empty() {
        start.push_attribute(("name", item.name.as_str()));
    }
    start
}

fn write_container(
    writer: &mut Writer<Vec<u8>>,
    tree: &ElementTree,
    start: BytesStart<'_>,
    children: &[ElementId],
) -> SerializationResult<()> {
    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    for &child in children {
        write_element(writer, tree, child)?;
    }
    writer.write_event(Event::End(end))?;
    Ok(())
}
