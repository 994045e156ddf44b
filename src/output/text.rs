//! Plain-text renderings: an indented value dump of a tree and a description of a template.

use std::fmt::Write;

use crate::model::{ElementId, ElementTree, Role, Value};
use crate::template::{Body, ElementKind, KindFlags, Template, TemplateItem};
use crate::utils::hexdump;

const INDENT: &str = "  ";

/// One line per element: `name 'CODE' = value`, nested by depth.
pub fn dump_tree(tree: &ElementTree) -> String {
    let mut out = String::new();

    for (depth, id) in tree.walk() {
        let Some(element) = tree.element(id) else {
            continue;
        };
        let item = element.item();
        for _ in 0..depth {
            out.push_str(INDENT);
        }

        if element.role() == Role::Group {
            let index = group_index(tree, id);
            let _ = writeln!(out, "[{index}]");
            continue;
        }

        let _ = write!(out, "{} '{}'", display_name(item), item.code);
        match item.kind {
            ElementKind::Counter(_) | ElementKind::List(_) => {
                let _ = write!(out, " ({} entries)", element.children().len());
            }
            ElementKind::Keyed(_) => {
                if !element.value().is_none() {
                    let _ = write!(out, " = {}", describe_value(item, element.value()));
                }
                if let Some(section) = element.section() {
                    let _ = write!(out, " -> {}", section.label);
                }
            }
            ElementKind::Reference(_) => {
                if let Ok((record_type, record_id)) = tree.reference_target(id) {
                    let _ = write!(out, " -> '{record_type}' {record_id}");
                }
            }
            _ if element.value().is_none() => {}
            _ => {
                let _ = write!(out, " = {}", describe_value(item, element.value()));
            }
        }
        out.push('\n');
    }

    let trailing = tree.trailing_bytes();
    if !trailing.is_empty() {
        let _ = writeln!(out, "trailing data ({} bytes):", trailing.len());
        out.push_str(&hexdump(trailing, 0));
    }
    out
}

/// The structured template, one item per line with its value type and attributes.
pub fn describe_template(template: &Template) -> String {
    let mut out = String::new();

    for (depth, item) in template.walk() {
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        let _ = write!(
            out,
            "{:>4}: '{}' {} <{}>",
            item.index,
            item.code,
            display_name(item),
            item.kind.value_type()
        );
        let attributes = attributes(item);
        if !attributes.is_empty() {
            let _ = write!(out, " [{}]", attributes.join(", "));
        }
        out.push('\n');

        for case in &item.cases {
            for _ in 0..=depth {
                out.push_str(INDENT);
            }
            let _ = writeln!(out, "case {} = {}", case.name, case.value);
        }
        if let Body::Sections(sections) = &item.body {
            // Sections are listed by `walk` only through their items; name them here.
            let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
            for _ in 0..=depth {
                out.push_str(INDENT);
            }
            let _ = writeln!(out, "sections: {}", labels.join(" | "));
        }
    }
    out
}

fn display_name(item: &TemplateItem) -> &str {
    if item.name.is_empty() { "(unnamed)" } else { &item.name }
}

fn describe_value(item: &TemplateItem, value: &Value) -> String {
    let case = value
        .as_i128()
        .and_then(|v| i64::try_from(v).ok())
        .and_then(|v| item.case_name(v));
    match (value, case) {
        (_, Some(name)) => format!("{value} ({name})"),
        (Value::Text(s), None) => format!("{s:?}"),
        (Value::Bytes(b), None) => format!("<{} bytes> {value}", b.len()),
        _ => value.to_string(),
    }
}

fn attributes(item: &TemplateItem) -> Vec<&'static str> {
    let mut out = Vec::new();
    if item.flags.contains(KindFlags::UNBOUNDED) {
        out.push("unbounded");
    }
    if item.flags.contains(KindFlags::ZERO_WIDTH) {
        out.push("zero-width");
    }
    if item.flags.contains(KindFlags::HIDDEN) {
        out.push("hidden");
    }
    out
}

fn group_index(tree: &ElementTree, id: ElementId) -> usize {
    tree.parent(id)
        .and_then(|list| tree.children(list).iter().position(|&g| g == id))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RecordContext, decode};
    use crate::settings::CodecSettings;
    use crate::template::{Registry, TemplateDefinition};
    use crate::type_code::TypeCode;
    use pretty_assertions::assert_eq;

    fn template() -> Template {
        let mut def = TemplateDefinition::new();
        def.push(TypeCode::new(*b"KBYT"), "Kind")
            .push(TypeCode::new(*b"CASE"), "Word=1")
            .push(TypeCode::new(*b"CASE"), "Text=2")
            .push(TypeCode::new(*b"KEYB"), "Word")
            .push(TypeCode::new(*b"DWRD"), "Value")
            .push(TypeCode::new(*b"KEYE"), "")
            .push(TypeCode::new(*b"KEYB"), "Text")
            .push(TypeCode::new(*b"PSTR"), "Value")
            .push(TypeCode::new(*b"KEYE"), "");
        Template::from_definition(def, &Registry::standard()).unwrap()
    }

    #[test]
    fn test_dump_shows_selected_section() {
        let tree = decode(
            &template(),
            &[2, 2, b'h', b'i', 0xAA],
            RecordContext::default(),
            &CodecSettings::default(),
        )
        .unwrap();

        let dump = dump_tree(&tree);
        let expected = concat!(
            "Kind 'KBYT' = 2 (Text) -> Text\n",
            "  Value 'PSTR' = \"hi\"\n",
            "trailing data (1 bytes):\n",
            "00000000: aa                                               |.|\n",
        );
        assert_eq!(dump, expected);
    }

    #[test]
    fn test_describe_lists_sections() {
        let description = describe_template(&template());
        let expected = concat!(
            "   0: 'KBYT' Kind <key>\n",
            "  case Word = 1\n",
            "  case Text = 2\n",
            "  sections: Word | Text\n",
            "     4: 'DWRD' Value <signed integer>\n",
            "     7: 'PSTR' Value <text>\n",
        );
        assert_eq!(description, expected);
    }
}
