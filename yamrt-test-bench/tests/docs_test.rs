use yamrt_common::Version;
use yamrt_core::{Input, ParseConfig};
use yamrt_test_bench::consts::*;
use yamrt_test_bench::{assert_eq_event, assert_event_err, event_string_with};

#[test]
fn documents() {
    assert_eq_event(MULTI_DOC_INPUT, MULTI_DOC_EVENTS);
    assert_eq_event(DIRECTIVE_DOC_INPUT, DIRECTIVE_DOC_EVENTS);
    assert_eq_event(EMPTY_DOCS_INPUT, EMPTY_DOCS_EVENTS);
    assert_eq_event(COMMENT_ONLY_INPUT, COMMENT_ONLY_EVENTS);
}

#[test]
fn directives() {
    assert_eq_event(TAG_DIRECTIVE_INPUT, TAG_DIRECTIVE_EVENTS);
    assert_event_err(DIRECTIVE_WITHOUT_END_INPUT);
}

#[test]
fn comments_do_not_change_events() {
    let commented = "# head\na: 1 # one\n# tail\n";
    let config = ParseConfig::default().with_keep_comments(false);
    assert_eq!(
        event_string_with(commented, ParseConfig::default()),
        event_string_with(commented, config)
    );
}

#[test]
fn encodings() {
    let utf16: Vec<u8> = [0xFF, 0xFE]
        .into_iter()
        .chain("a: 1".encode_utf16().flat_map(u16::to_le_bytes))
        .collect();
    let input = Input::from_bytes(&utf16).unwrap();
    assert_eq!(input.as_str(), "a: 1");
    assert!(input.had_bom());
    assert!(Input::from_bytes(&[0x61, 0xFF, 0x62]).is_err());
}

#[test]
fn default_version_applies_to_bare_documents() {
    let config = ParseConfig::default().with_default_version(Version::V1_1);
    let docs = yamrt_core::YamlLoader::load_from_input(Input::from_str("a: yes"), config).unwrap();
    let value = docs[0].root_value().unwrap();
    assert_eq!(value.get("a").and_then(|v| v.as_bool()), Some(true));
}
