use proptest::prelude::*;
use std::collections::BTreeMap;
use yamrt_common::{CollectionStyle, ScalarType};
use yamrt_core::{Document, EmitterConfig, EmitterMode, YamlLoader};

#[derive(Clone, Debug)]
enum Leaf {
    Int(i64),
    Bool(bool),
    Word(String),
    Text(String),
}

fn leaf() -> impl Strategy<Value = Leaf> {
    prop_oneof![
        any::<i64>().prop_map(Leaf::Int),
        any::<bool>().prop_map(Leaf::Bool),
        "v[a-z]{0,6}".prop_map(Leaf::Word),
        "[ -~]{0,12}".prop_map(Leaf::Text),
    ]
}

fn mode() -> impl Strategy<Value = EmitterMode> {
    prop_oneof![
        Just(EmitterMode::Original),
        Just(EmitterMode::Block),
        Just(EmitterMode::Flow),
        Just(EmitterMode::FlowOneline),
        Just(EmitterMode::JsonTp),
        Just(EmitterMode::Pretty),
    ]
}

fn scalar(doc: &mut Document, leaf: &Leaf) -> yamrt_core::NodeId {
    match leaf {
        Leaf::Int(i) => doc.create_scalar(i.to_string(), ScalarType::Plain),
        Leaf::Bool(b) => doc.create_scalar(b.to_string(), ScalarType::Plain),
        Leaf::Word(w) => doc.create_scalar(w.clone(), ScalarType::Plain),
        Leaf::Text(t) => doc.create_scalar(t.clone(), ScalarType::DoubleQuote),
    }
}

fn build(map: &BTreeMap<String, Leaf>, list: &[Leaf]) -> Document {
    let mut doc = Document::new();
    let root = doc.create_mapping(CollectionStyle::Block);
    for (key, value) in map {
        let k = doc.create_scalar(key.clone(), ScalarType::Plain);
        let v = scalar(&mut doc, value);
        doc.mapping_insert(root, k, v).unwrap();
    }
    let seq = doc.create_sequence(CollectionStyle::Flow);
    for item in list {
        let v = scalar(&mut doc, item);
        doc.sequence_append(seq, v).unwrap();
    }
    let k = doc.create_scalar("list", ScalarType::Plain);
    doc.mapping_insert(root, k, seq).unwrap();
    doc.set_root(root).unwrap();
    doc
}

proptest! {
    #[test]
    fn emitted_documents_load_back(
        map in prop::collection::btree_map("k[a-z]{0,6}", leaf(), 0..6),
        list in prop::collection::vec(leaf(), 0..6),
        mode in mode(),
    ) {
        let doc = build(&map, &list);
        let expected = doc.root_value().unwrap();
        let out = doc.emit_to_string(&EmitterConfig::default().with_mode(mode)).unwrap();
        let loaded = YamlLoader::load_from_str(&out).unwrap();
        prop_assert_eq!(loaded.len(), 1, "{}", out);
        prop_assert_eq!(loaded[0].root_value().unwrap(), expected, "{}", out);
    }
}
