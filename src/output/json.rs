use hashbrown::HashMap as FastMap;
use log::trace;
use serde_json::{Map, Value as Json, json};

use crate::err::SerializationResult;
use crate::model::{ElementId, ElementTree, to_hex_string};
use crate::template::{ElementKind, TemplateItem};

type DupCounters = FastMap<String, usize, ahash::RandomState>;

/// Build a JSON document mirroring the tree.
///
/// Fields become keys named by their labels (repeated labels get a `_1`, `_2`... suffix),
/// counters and lists become arrays of group objects, and the fields of a keyed element's
/// selected section sit next to the key itself. Hidden and zero-width elements are left out.
pub fn tree_to_json(tree: &ElementTree) -> Json {
    let mut root = Map::new();
    let mut dups = DupCounters::with_hasher(ahash::RandomState::new());
    fill(tree, tree.roots(), &mut root, &mut dups);

    if !tree.trailing_bytes().is_empty() {
        root.insert(
            "$trailing".to_owned(),
            Json::String(to_hex_string(tree.trailing_bytes())),
        );
    }
    Json::Object(root)
}

pub fn to_json_string(tree: &ElementTree, pretty: bool) -> SerializationResult<String> {
    let doc = tree_to_json(tree);
    let s = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(s)
}

fn fill(tree: &ElementTree, ids: &[ElementId], out: &mut Map<String, Json>, dups: &mut DupCounters) {
    for &id in ids {
        let Some(element) = tree.element(id) else {
            continue;
        };
        let item = element.item();
        if item.is_hidden() {
            continue;
        }

        match item.kind {
            ElementKind::Divider | ElementKind::Case(_) | ElementKind::Marker(_) => {}
            ElementKind::Counter(_) | ElementKind::List(_) => {
                let groups = element
                    .children()
                    .iter()
                    .map(|&group| {
                        let mut map = Map::new();
                        let mut group_dups = DupCounters::with_hasher(ahash::RandomState::new());
                        fill(tree, tree.children(group), &mut map, &mut group_dups);
                        Json::Object(map)
                    })
                    .collect();
                insert(out, dups, key_for(item), Json::Array(groups));
            }
            ElementKind::Keyed(_) => {
                if !element.value().is_none() {
                    insert(out, dups, key_for(item), value_json(item, element.value()));
                }
                fill(tree, element.children(), out, dups);
            }
            ElementKind::Reference(_) => {
                if let Ok((record_type, record_id)) = tree.reference_target(id) {
                    let target = json!({ "type": record_type, "id": record_id });
                    insert(out, dups, key_for(item), target);
                }
            }
            _ => insert(out, dups, key_for(item), value_json(item, element.value())),
        }
    }
}

fn key_for(item: &TemplateItem) -> String {
    if item.name.is_empty() {
        item.code.to_string()
    } else {
        item.name.clone()
    }
}

fn value_json(item: &TemplateItem, value: &crate::model::Value) -> Json {
    let json = serde_json::to_value(value).unwrap_or(Json::Null);
    match value.as_i128().and_then(|v| i64::try_from(v).ok()) {
        Some(v) => match item.case_name(v) {
            Some(name) => json!({ "value": json, "case": name }),
            None => json,
        },
        None => json,
    }
}

fn insert(out: &mut Map<String, Json>, dups: &mut DupCounters, key: String, value: Json) {
    if !out.contains_key(&key) {
        out.insert(key, value);
        return;
    }

    let next = dups.entry(key.clone()).or_insert(0);
    loop {
        *next += 1;
        let candidate = format!("{}_{}", key, next);
        if !out.contains_key(&candidate) {
            trace!("duplicate key `{key}` stored as `{candidate}`");
            out.insert(candidate, value);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RecordContext, decode};
    use crate::settings::CodecSettings;
    use crate::template::{Registry, Template, TemplateDefinition};
    use crate::type_code::TypeCode;
    use pretty_assertions::assert_eq;

    fn template(entries: &[(&[u8; 4], &str)]) -> Template {
        let mut def = TemplateDefinition::new();
        for (code, label) in entries {
            def.push(TypeCode::new(**code), *label);
        }
        Template::from_definition(def, &Registry::standard()).unwrap()
    }

    #[test]
    fn test_lists_become_arrays() {
        let template = template(&[
            (b"OCNT", "Entries"),
            (b"LSTC", ""),
            (b"DBYT", "Value"),
            (b"PSTR", "Name"),
            (b"LSTE", ""),
        ]);
        let data = [0, 2, 1, 1, b'a', 2, 0];
        let tree = decode(&template, &data, RecordContext::default(), &CodecSettings::default())
            .unwrap();

        assert_eq!(
            tree_to_json(&tree),
            json!({
                "Entries": [
                    { "Value": 1, "Name": "a" },
                    { "Value": 2, "Name": "" },
                ]
            })
        );
    }

    #[test]
    fn test_repeated_labels_are_suffixed_and_cases_named() {
        let template = template(&[
            (b"UBYT", "Flag"),
            (b"CASE", "On=1"),
            (b"UBYT", "Flag"),
            (b"FBYT", ""),
        ]);
        let data = [1, 7, 0xFF];
        let tree = decode(&template, &data, RecordContext::default(), &CodecSettings::default())
            .unwrap();

        assert_eq!(
            tree_to_json(&tree),
            json!({
                "Flag": { "value": 1, "case": "On" },
                "Flag_1": 7,
            })
        );
    }

    #[test]
    fn test_trailing_bytes_are_kept() {
        let template = template(&[(b"UBYT", "a")]);
        let tree = decode(&template, &[1, 0xAB], RecordContext::default(), &CodecSettings::default())
            .unwrap();
        let s = to_json_string(&tree, false).unwrap();
        assert_eq!(s, r#"{"a":1,"$trailing":"AB"}"#);
    }
}
