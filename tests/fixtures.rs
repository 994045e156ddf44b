#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use std::sync::Once;

use restmpl::{
    CodecSettings, ElementId, ElementTree, RecordContext, Registry, Template, TemplateDefinition,
    TypeCode, Value,
};

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

/// A definition from `(code, label)` pairs; codes shorter than four characters are padded.
pub fn definition(entries: &[(&str, &str)]) -> TemplateDefinition {
    entries
        .iter()
        .map(|&(code, label)| (code.parse::<TypeCode>().unwrap(), label.to_string()))
        .collect()
}

pub fn template(entries: &[(&str, &str)]) -> Template {
    Template::from_definition(definition(entries), &Registry::standard()).unwrap()
}

pub fn decode_bytes(template: &Template, data: &[u8]) -> ElementTree {
    restmpl::decode(
        template,
        data,
        RecordContext::new(128),
        &CodecSettings::default(),
    )
    .unwrap()
}

pub fn encode_tree(tree: &ElementTree) -> Vec<u8> {
    restmpl::encode(tree, &CodecSettings::default())
}

/// `(name, value)` of every field holding a value, in traversal order.
pub fn values(tree: &ElementTree) -> Vec<(String, Value)> {
    tree.walk()
        .filter_map(|(_, id)| tree.element(id))
        .filter(|e| !e.is_group() && !e.value().is_none())
        .map(|e| (e.name().to_string(), e.value().clone()))
        .collect()
}

pub fn field(tree: &ElementTree, label: &str) -> ElementId {
    tree.find_by_label(label)
        .unwrap_or_else(|| panic!("no field labelled `{label}`"))
}

/// Writes the binary form of a template definition into `dir`.
pub fn write_template(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let bytes = definition(entries).to_bytes(CodecSettings::default().get_text_codec());
    fs::write(&path, bytes).unwrap();
    path
}

pub fn write_record(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

/// `[UWRD count/WCNT, DVDR, DLNG]`: a word counter over a divider and a long.
pub fn counted_longs() -> Template {
    template(&[("WCNT", "Count"), ("DVDR", "-----"), ("DLNG", "Value")])
}
