use yamrt_common::YamlDoc;
use yamrt_core::{Input, ParseConfig, Schema, YamlLoader};
use yamrt_test_bench::consts::SCALAR_KINDS_INPUT;

fn load_with(input: &str, config: ParseConfig) -> YamlDoc {
    let docs = YamlLoader::load_from_input(Input::from_str(input), config).unwrap();
    docs[0].root_value().unwrap()
}

fn kinds(schema: Schema) -> YamlDoc {
    load_with(SCALAR_KINDS_INPUT, ParseConfig::default().with_schema(schema))
}

fn str_of(text: &str) -> Option<YamlDoc> {
    Some(YamlDoc::String(text.to_string()))
}

#[test]
fn core_schema() {
    let doc = kinds(Schema::Core);
    let entries = doc.as_mapping().unwrap();
    assert_eq!(entries[0].key, YamlDoc::Null);
    assert_eq!(entries[0].value, YamlDoc::Null);
    assert_eq!(doc.get("bool"), Some(&YamlDoc::Bool(true)));
    assert_eq!(doc.get("yes11").cloned(), str_of("yes"));
    assert_eq!(doc.get("int"), Some(&YamlDoc::Integer(42)));
    assert_eq!(doc.get("octal"), Some(&YamlDoc::Integer(15)));
    assert_eq!(doc.get("old_octal"), Some(&YamlDoc::Integer(17)));
    assert_eq!(doc.get("hex"), Some(&YamlDoc::Integer(31)));
    assert_eq!(doc.get("float"), Some(&YamlDoc::FloatingPoint(3.5)));
    assert_eq!(doc.get("inf"), Some(&YamlDoc::FloatingPoint(f64::INFINITY)));
    assert_eq!(doc.get("text").cloned(), str_of("hello"));
    assert_eq!(doc.get("quoted").cloned(), str_of("42"));
}

#[test]
fn yaml11_schema() {
    let doc = kinds(Schema::Yaml11);
    assert_eq!(doc.get("yes11"), Some(&YamlDoc::Bool(true)));
    assert_eq!(doc.get("octal").cloned(), str_of("0o17"));
    assert_eq!(doc.get("old_octal"), Some(&YamlDoc::Integer(15)));
    assert_eq!(doc.get("hex"), Some(&YamlDoc::Integer(31)));
    assert_eq!(doc.get("quoted").cloned(), str_of("42"));
}

#[test]
fn json_schema() {
    let doc = kinds(Schema::Json);
    let entries = doc.as_mapping().unwrap();
    assert_eq!(entries[0].key, YamlDoc::Null);
    assert_eq!(entries[0].value, YamlDoc::String("~".into()));
    assert_eq!(doc.get("bool"), Some(&YamlDoc::Bool(true)));
    assert_eq!(doc.get("hex").cloned(), str_of("0x1F"));
    assert_eq!(doc.get("int"), Some(&YamlDoc::Integer(42)));
    assert_eq!(doc.get("inf").cloned(), str_of(".inf"));
}

#[test]
fn version_directive_picks_schema() {
    let doc = load_with("%YAML 1.1\n---\nflag: on\n", ParseConfig::default());
    assert_eq!(doc.get("flag"), Some(&YamlDoc::Bool(true)));
    let doc = load_with("%YAML 1.2\n---\nflag: on\n", ParseConfig::default());
    assert_eq!(doc.get("flag").cloned(), str_of("on"));
    let pinned = ParseConfig::default().with_schema(Schema::Core);
    let doc = load_with("%YAML 1.1\n---\nflag: on\n", pinned);
    assert_eq!(doc.get("flag").cloned(), str_of("on"));
}

#[test]
fn explicit_tags_override_resolution() {
    let doc = load_with("a: !!str 12\nb: !!float 12\nc: !custom 12\n", ParseConfig::default());
    assert_eq!(doc.get("a").cloned(), str_of("12"));
    assert_eq!(doc.get("b"), Some(&YamlDoc::FloatingPoint(12.0)));
    assert_eq!(doc.get("c").cloned(), str_of("12"));
    let docs = YamlLoader::load_from_str("a: !!int twelve\n").unwrap();
    assert!(docs[0].root_value().is_err());
}

#[test]
fn big_integers() {
    let input = "n: 123456789012345678901234567890\n";
    let doc = load_with(input, ParseConfig::default());
    assert_eq!(doc.get("n").cloned(), str_of("123456789012345678901234567890"));
    let doc = load_with(input, ParseConfig::default().with_big_int_placeholder(true));
    assert_eq!(
        doc.get("n"),
        Some(&YamlDoc::BigInteger("123456789012345678901234567890".into()))
    );
}
