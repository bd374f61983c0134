use yamrt_common::{EventData, SemanticErrorKind, YamlDoc};
use yamrt_core::treebuild::PathComponent;
use yamrt_core::{
    compose_events, ComposeAction, Document, EmitterConfig, Input, ParseConfig, Parser, PathFollow,
    YamlLoader,
};
use yamrt_test_bench::consts::ROUNDTRIP_INPUT;

fn load(input: &str) -> Document {
    YamlLoader::load_from_str(input)
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
}

#[test]
fn paths_of_every_scalar() {
    let mut parser = Parser::new_from_str(ROUNDTRIP_INPUT);
    let mut paths = Vec::new();
    compose_events(&mut parser, &mut paths, |event, path, paths| {
        if matches!(event.data, EventData::Scalar(_)) && !path.is_key() {
            paths.push(path.to_string());
        }
        ComposeAction::Continue
    })
    .unwrap();
    assert_eq!(
        paths,
        [
            "/server/host",
            "/server/ports/[0]",
            "/server/ports/[1]",
            "/server/tls/cert",
            "/server/tls/key",
            "/motd",
        ]
    );
}

#[test]
fn callback_sees_depth() {
    let mut parser = Parser::new_from_str("a: {b: [c]}\n");
    let mut deepest = Vec::new();
    compose_events(&mut parser, &mut deepest, |event, path, deepest| {
        if let EventData::Scalar(s) = &event.data {
            if s.value == "c" {
                deepest.extend(path.components().iter().cloned());
            }
        }
        ComposeAction::Continue
    })
    .unwrap();
    assert_eq!(
        deepest,
        [
            PathComponent::Key("a".into()),
            PathComponent::Key("b".into()),
            PathComponent::Index(0),
        ]
    );
}

#[test]
fn stop_and_resume_by_document() {
    let mut parser = Parser::new_from_str("--- a\n--- b\n--- c\n");
    let mut seen = Vec::new();
    for _ in 0..2 {
        compose_events(&mut parser, &mut seen, |event, _, seen| match &event.data {
            EventData::Scalar(s) => {
                seen.push(s.value.clone());
                ComposeAction::Stop
            }
            _ => ComposeAction::Continue,
        })
        .unwrap();
    }
    assert_eq!(seen, ["a", "b"]);
}

#[test]
fn resolve_on_load_expands_merges() {
    let input = "\
base: &base
  retries: 3
  timeout: 10
job:
  <<: *base
  timeout: 60
";
    let config = ParseConfig::default().with_resolve_on_load(true);
    let docs = YamlLoader::load_from_input(Input::from_str(input), config).unwrap();
    let doc = &docs[0];
    assert!(doc.is_resolved());
    let value = doc.root_value().unwrap();
    let job = value.get("job").unwrap();
    assert_eq!(job.get("retries"), Some(&YamlDoc::Integer(3)));
    assert_eq!(job.get("timeout"), Some(&YamlDoc::Integer(60)));
    let out = doc.emit_to_string(&EmitterConfig::default()).unwrap();
    assert!(!out.contains("<<"), "{out}");
    assert_eq!(load(&out).root_value().unwrap(), value);
}

#[test]
fn merged_keys_are_reachable_by_path() {
    let mut doc = load("defaults: &d {timeout: 30}\nserver: {<<: *d, host: example}\n");
    doc.resolve().unwrap();
    let scalar_at = |path: &str| {
        doc.path_to_node(None, path, PathFollow::Follow)
            .and_then(|id| doc.node(id)?.scalar().map(str::to_string))
    };
    assert_eq!(scalar_at("/server/timeout").as_deref(), Some("30"));
    assert_eq!(scalar_at("/server/host").as_deref(), Some("example"));
    assert_eq!(scalar_at("/defaults/timeout").as_deref(), Some("30"));
    assert!(doc.path_to_node(None, "/server/<<", PathFollow::Follow).is_none());
}

#[test]
fn resolved_aliases_come_back_as_aliases() {
    let mut doc = load(ROUNDTRIP_INPUT);
    let before = doc.root_value().unwrap();
    doc.resolve().unwrap();
    let out = doc.emit_to_string(&EmitterConfig::default()).unwrap();
    assert!(out.contains("&tls"), "{out}");
    assert!(out.contains("*tls"), "{out}");
    assert_eq!(load(&out).root_value().unwrap(), before);
}

#[test]
fn undefined_alias() {
    let err = YamlLoader::load_from_str("a: *nope\n").unwrap_err();
    assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::UndefinedAlias));
}

#[test]
fn join_documents() {
    let mut base = load("server: {host: a, ports: [80]}\nname: x\n");
    let overlay = load("server: {ports: [443], tls: true}\nname: y\n");
    base.join(&overlay).unwrap();
    let value = base.root_value().unwrap();
    let server = value.get("server").unwrap();
    assert_eq!(server.get("host").and_then(YamlDoc::as_str), Some("a"));
    assert_eq!(
        server.get("ports"),
        Some(&YamlDoc::Sequence(vec![
            YamlDoc::Integer(80),
            YamlDoc::Integer(443)
        ]))
    );
    assert_eq!(server.get("tls"), Some(&YamlDoc::Bool(true)));
    assert_eq!(value.get("name").and_then(YamlDoc::as_str), Some("y"));
}

#[test]
fn path_lookup_round_trips() {
    let doc = load(ROUNDTRIP_INPUT);
    for path in ["/server/ports/[1]", "/server/tls/cert", "/motd"] {
        let id = doc.path_to_node(None, path, PathFollow::Follow).unwrap();
        assert_eq!(doc.node_path(id).as_deref(), Some(path));
    }
    let through = doc
        .path_to_node(None, "/backup/tls/key", PathFollow::Follow)
        .unwrap();
    assert_eq!(doc.node(through).and_then(|n| n.scalar()), Some("server.key"));
    assert_eq!(
        doc.path_to_node(None, "/backup/tls/key", PathFollow::DontFollow),
        None
    );
}
