use rstest::rstest;
use yamrt_common::YamlDoc;
use yamrt_core::{EmitterConfig, EmitterMode, YamlLoader};
use yamrt_test_bench::consts::{ROUNDTRIP_INPUT, SCALAR_KINDS_INPUT};
use yamrt_test_bench::{reemit, reemit_events};

fn values(input: &str) -> Vec<YamlDoc> {
    YamlLoader::load_from_str(input)
        .unwrap_or_else(|e| panic!("{input}: {e}"))
        .iter()
        .map(|doc| doc.root_value().unwrap())
        .collect()
}

#[rstest]
#[case(EmitterMode::Original)]
#[case(EmitterMode::Block)]
#[case(EmitterMode::Flow)]
#[case(EmitterMode::FlowOneline)]
#[case(EmitterMode::Json)]
#[case(EmitterMode::JsonTp)]
#[case(EmitterMode::JsonOneline)]
#[case(EmitterMode::DeJson)]
#[case(EmitterMode::Pretty)]
fn every_mode_keeps_values(#[case] mode: EmitterMode) {
    let config = EmitterConfig::default()
        .with_mode(mode)
        .with_output_comments(false);
    let expected = values(ROUNDTRIP_INPUT);
    assert_eq!(values(&reemit(ROUNDTRIP_INPUT, &config)), expected);
    if !mode.is_json() {
        assert_eq!(values(&reemit_events(ROUNDTRIP_INPUT, &config)), expected);
    }
}

#[rstest]
#[case(EmitterMode::Original)]
#[case(EmitterMode::Block)]
#[case(EmitterMode::FlowOneline)]
#[case(EmitterMode::Pretty)]
fn scalar_kinds_keep_their_type(#[case] mode: EmitterMode) {
    let config = EmitterConfig::default().with_mode(mode);
    let out = reemit(SCALAR_KINDS_INPUT, &config);
    assert_eq!(values(&out), values(SCALAR_KINDS_INPUT), "{out}");
}

#[test]
fn original_mode_keeps_presentation() {
    for out in [
        reemit(ROUNDTRIP_INPUT, &EmitterConfig::default()),
        reemit_events(ROUNDTRIP_INPUT, &EmitterConfig::default()),
    ] {
        for piece in ["# configuration", "# primary", "[80, 443]", "&tls", "*tls", "'server.pem'", "motd: |"] {
            assert!(out.contains(piece), "missing {piece} in\n{out}");
        }
        assert_eq!(values(&out), values(ROUNDTRIP_INPUT));
    }
}

#[test]
fn json_has_no_yaml_leftovers() {
    let config = EmitterConfig::default().with_mode(EmitterMode::JsonOneline);
    let out = reemit(ROUNDTRIP_INPUT, &config);
    assert!(!out.contains('&'), "{out}");
    assert!(!out.contains('*'), "{out}");
    assert!(!out.contains('#'), "{out}");
    assert!(out.starts_with("{\"server\": {\"host\": \"example.org\""), "{out}");
    assert!(out.contains("\"ports\": [80, 443]"), "{out}");
}

#[test]
fn sorted_keys() {
    let config = EmitterConfig::default().with_sort_keys(true);
    assert_eq!(reemit("b: 1\nc: 2\na: 3\n", &config), "a: 3\nb: 1\nc: 2\n");
}

#[test]
fn width_is_respected_for_plain_text() {
    let long = format!("text: {}\n", ["word"; 40].join(" "));
    let config = EmitterConfig::default().with_width(40);
    let out = reemit(&long, &config);
    assert!(out.lines().count() > 1, "{out}");
    assert_eq!(values(&out), values(&long));
}
