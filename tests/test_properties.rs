mod fixtures;

use fixtures::*;

use proptest::prelude::*;
use restmpl::template::Padding;
use restmpl::{ElementTree, RecordContext, Value};

fn record(id: i32, name: &str, note: &str, rest: &[u8]) -> Vec<u8> {
    let mut data = id.to_be_bytes().to_vec();
    data.push(name.len() as u8);
    data.extend_from_slice(name.as_bytes());
    data.extend_from_slice(note.as_bytes());
    data.push(0);
    data.extend_from_slice(rest);
    data
}

proptest! {
    #[test]
    fn prop_decodable_buffers_round_trip(
        id in any::<i32>(),
        name in "[a-zA-Z0-9 ]{0,40}",
        note in "[a-z.]{0,40}",
        rest in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let template = template(&[
            ("DLNG", "Id"),
            ("PSTR", "Name"),
            ("ECST", "Note"),
            ("HEXD", "Rest"),
        ]);
        let data = record(id, &name, &note, &rest);

        let tree = decode_bytes(&template, &data);
        prop_assert_eq!(tree.value(field(&tree, "Id")), Some(&Value::Signed(i64::from(id))));
        prop_assert_eq!(tree.value(field(&tree, "Name")), Some(&Value::from(name.as_str())));
        prop_assert_eq!(tree.value(field(&tree, "Note")), Some(&Value::from(note.as_str())));
        prop_assert_eq!(encode_tree(&tree), data);
    }

    #[test]
    fn prop_string_padding_bytes_round_trip(
        name in "[a-z]{0,20}",
        fixed in "[a-z]{0,7}",
        tag in "[a-z]{0,5}",
        fill in proptest::collection::vec(any::<u8>(), 16),
    ) {
        let template = template(&[("OSTR", "Name"), ("P008", "Fixed"), ("C006", "Tag")]);

        let mut data = vec![name.len() as u8];
        data.extend_from_slice(name.as_bytes());
        if (1 + name.len()) % 2 == 0 {
            data.push(fill[0]);
        }
        data.push(fixed.len() as u8);
        data.extend_from_slice(fixed.as_bytes());
        data.extend_from_slice(&fill[1..8 - fixed.len()]);
        data.extend_from_slice(tag.as_bytes());
        data.push(0);
        data.extend_from_slice(&fill[8..13 - tag.len()]);

        let tree = decode_bytes(&template, &data);
        prop_assert_eq!(tree.value(field(&tree, "Tag")), Some(&Value::from(tag.as_str())));
        prop_assert_eq!(encode_tree(&tree), data);
    }

    #[test]
    fn prop_edited_trees_survive_a_round_trip(
        entries in proptest::collection::vec((any::<i16>(), "[a-z]{0,12}"), 0..8),
        tag in proptest::array::uniform4(any::<u8>()),
    ) {
        let template = template(&[
            ("OCNT", "Entries"),
            ("LSTC", ""),
            ("DWRD", "Value"),
            ("OSTR", "Name"),
            ("LSTE", ""),
            ("H004", "Tag"),
        ]);
        let mut tree = ElementTree::from_template(&template, RecordContext::new(128));
        let list = tree.roots()[0];
        for (i, (value, name)) in entries.iter().enumerate() {
            let group = tree.insert_group(list, i).unwrap();
            let fields = tree.children(group).to_vec();
            tree.set_value(fields[0], Value::Signed(i64::from(*value))).unwrap();
            tree.set_value(fields[1], Value::from(name.as_str())).unwrap();
        }
        let tag_id = tree.roots()[1];
        tree.set_value(tag_id, Value::Bytes(tag.to_vec())).unwrap();

        let bytes = encode_tree(&tree);
        let decoded = decode_bytes(&template, &bytes);
        prop_assert_eq!(encode_tree(&decoded), bytes.clone());

        let mut expected = vec![("Entries".to_string(), Value::Unsigned(entries.len() as u64))];
        for (value, name) in &entries {
            expected.push(("Value".to_string(), Value::Signed(i64::from(*value))));
            expected.push(("Name".to_string(), Value::from(name.as_str())));
        }
        expected.push(("Tag".to_string(), Value::Bytes(tag.to_vec())));
        prop_assert_eq!(values(&decoded), expected);
    }

    #[test]
    fn prop_padding_rules(content in 0usize..300, prefix in 0usize..3) {
        let total = |padding: Padding| prefix + content + padding.pad_len(content, prefix);

        prop_assert_eq!(total(Padding::None), prefix + content);
        prop_assert_eq!(total(Padding::Terminator), prefix + content + 1);
        prop_assert_eq!(total(Padding::Even) % 2, 0);
        prop_assert_eq!(total(Padding::Odd) % 2, 1);
        prop_assert!(Padding::Even.pad_len(content, prefix) <= 1);
        prop_assert!(Padding::Odd.pad_len(content, prefix) <= 1);

        for padding in [Padding::EvenPlusOne, Padding::OddPlusOne] {
            prop_assert_eq!(padding.pad_len(content, prefix), 1);
        }

        let size = prefix + content + 1;
        prop_assert_eq!(total(Padding::Fixed(size)), size);
        prop_assert_eq!(total(Padding::Fixed(size + 7)), size + 7);
    }
}
