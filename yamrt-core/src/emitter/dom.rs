use super::{Emitter, EmitterConfig, EmitterMode, State};
use crate::schema::NULL_TAG;
use crate::treebuild::{Document, NodeData, NodeId, Pair};
use hashbrown::HashSet;
use yamrt_common::{
    CollectionStart, Comments, DocumentStart, Event, EventData, ScalarEvent, SemanticErrorKind,
    YamlError, YamlResult,
};

/// Nodes already written, and the collections currently open when aliases are expanded.
#[derive(Default)]
struct Visited {
    written: HashSet<NodeId>,
    open: HashSet<NodeId>,
}

fn split_comments(comments: &Comments) -> (Comments, Comments) {
    let head = Comments {
        top: comments.top.clone(),
        right: comments.right.clone(),
        bottom: Vec::new(),
    };
    let tail = Comments {
        bottom: comments.bottom.clone(),
        ..Comments::default()
    };
    (head, tail)
}

impl Emitter<'_> {
    /// Writes one document, starting the stream if nothing was written yet.
    pub fn emit_document(&mut self, doc: &Document) -> YamlResult<()> {
        if self.state == State::StreamStart {
            self.emit(EventData::StreamStart.into())?;
        }
        self.next_schema = Some(doc.schema);
        let (head, tail) = split_comments(&doc.comments);
        let start = DocumentStart {
            implicit: !doc.explicit_start,
            version: doc.version,
            tag_directives: doc.tag_directives.clone(),
        };
        self.emit(Event::new(EventData::DocumentStart(start), doc.span).with_comments(head))?;
        match doc.root() {
            Some(root) => self.emit_node(doc, root, &mut Visited::default())?,
            None => self.emit(EventData::plain("").into())?,
        }
        let end = EventData::DocumentEnd {
            implicit: !doc.explicit_end,
        };
        self.emit(Event::from(end).with_comments(tail))
    }

    /// Ends the stream.
    pub fn finish(&mut self) -> YamlResult<()> {
        if self.state == State::StreamStart {
            self.emit(EventData::StreamStart.into())?;
        }
        self.emit(EventData::StreamEnd.into())
    }

    fn expand_aliases(&self) -> bool {
        self.config.json() || self.config.strip_labels
    }

    fn emit_node(&mut self, doc: &Document, id: NodeId, visited: &mut Visited) -> YamlResult<()> {
        let node = doc.get(id)?;
        if let NodeData::Alias { name, .. } = &node.data {
            if !self.expand_aliases() {
                let alias = Event::new(EventData::Alias(name.clone()), node.span);
                return self.emit(alias.with_comments(node.comments.clone()));
            }
            let Some(target) = doc.follow(id) else {
                self.report(YamlError::semantic(
                    SemanticErrorKind::UndefinedAlias,
                    node.span.start,
                    format!("alias `{name}` has no anchor"),
                ))?;
                return self.null_in_place_of(node.span);
            };
            return self.emit_node(doc, target, visited);
        }

        if let Some(anchor) = &node.anchor {
            if !self.expand_aliases() && visited.written.contains(&id) {
                return self.emit(Event::new(EventData::Alias(anchor.clone()), node.span));
            }
        }
        let collection = matches!(node.data, NodeData::Sequence { .. } | NodeData::Mapping { .. });
        if self.expand_aliases() && collection && !visited.open.insert(id) {
            self.report(YamlError::semantic(
                SemanticErrorKind::CycleInResolve,
                node.span.start,
                "recursive alias cannot be expanded",
            ))?;
            return self.null_in_place_of(node.span);
        }
        visited.written.insert(id);

        let (head, tail) = split_comments(&node.comments);
        match &node.data {
            NodeData::Scalar { value, style } => {
                let scalar = ScalarEvent {
                    value: value.clone(),
                    style: *style,
                    anchor: node.anchor.clone(),
                    tag: node.tag.clone(),
                    implicit_tag: node.implicit_tag,
                };
                self.emit(Event::new(EventData::Scalar(scalar), node.span).with_comments(node.comments.clone()))
            }
            NodeData::Sequence { items, style } => {
                let start = CollectionStart {
                    style: *style,
                    anchor: node.anchor.clone(),
                    tag: node.tag.clone(),
                };
                self.emit(Event::new(EventData::SequenceStart(start), node.span).with_comments(head))?;
                for &item in items {
                    self.emit_node(doc, item, visited)?;
                }
                visited.open.remove(&id);
                self.emit(Event::from(EventData::SequenceEnd).with_comments(tail))
            }
            NodeData::Mapping { pairs, style } => {
                let start = CollectionStart {
                    style: *style,
                    anchor: node.anchor.clone(),
                    tag: node.tag.clone(),
                };
                self.emit(Event::new(EventData::MappingStart(start), node.span).with_comments(head))?;
                for pair in self.ordered_pairs(doc, pairs) {
                    self.emit_node(doc, pair.key, visited)?;
                    self.emit_node(doc, pair.value, visited)?;
                }
                visited.open.remove(&id);
                self.emit(Event::from(EventData::MappingEnd).with_comments(tail))
            }
            NodeData::Alias { .. } => Ok(()),
        }
    }

    fn ordered_pairs(&self, doc: &Document, pairs: &[Pair]) -> Vec<Pair> {
        let mut pairs = pairs.to_vec();
        if self.config.strip_empty_kv {
            pairs.retain(|pair| {
                let value = doc.follow(pair.value).and_then(|v| doc.node(v));
                !value.is_some_and(|v| v.is_scalar() && v.effective_tag() == NULL_TAG)
            });
        }
        if self.config.sort_keys {
            pairs.sort_by_key(|pair| {
                let text = doc
                    .follow(pair.key)
                    .and_then(|k| doc.node(k))
                    .and_then(|k| k.scalar().map(str::to_string));
                (text.is_none(), text)
            });
        }
        pairs
    }
}

impl Document {
    /// Writes this document as a complete stream.
    pub fn emit_to_string(&self, config: &EmitterConfig) -> YamlResult<String> {
        emit_documents_to_string(std::slice::from_ref(self), config)
    }
}

pub fn emit_documents_to_string(docs: &[Document], config: &EmitterConfig) -> YamlResult<String> {
    let mut out = String::new();
    let mut emitter = Emitter::new(&mut out, config.clone());
    for doc in docs {
        emitter.emit_document(doc)?;
    }
    emitter.finish()?;
    if let Some(error) = emitter.fatal_error() {
        return Err(error.clone());
    }
    Ok(out)
}

/// One-line flow text of a node, used to name collection keys.
pub(crate) fn node_to_flow_string(doc: &Document, id: NodeId) -> YamlResult<String> {
    let config = EmitterConfig::default()
        .with_mode(EmitterMode::FlowOneline)
        .with_output_comments(false);
    let mut out = String::new();
    {
        let mut emitter = Emitter::new(&mut out, config);
        emitter.emit(EventData::StreamStart.into())?;
        emitter.next_schema = Some(doc.schema);
        emitter.emit(EventData::document_start(true).into())?;
        emitter.emit_node(doc, id, &mut Visited::default())?;
        emitter.emit(EventData::DocumentEnd { implicit: true }.into())?;
        emitter.emit(EventData::StreamEnd.into())?;
    }
    Ok(out.trim_end_matches('\n').to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::treebuild::YamlLoader;
    use crate::{emitter::Toggle, schema::Schema};
    use yamrt_common::{CollectionStyle, ScalarType};

    fn load(input: &str) -> Vec<Document> {
        YamlLoader::load_from_str(input).unwrap()
    }

    #[test]
    fn anchors_survive_resolution() {
        let mut docs = load("a: &x 1\nb: *x\n");
        let config = EmitterConfig::default();
        assert_eq!(emit_documents_to_string(&docs, &config).unwrap(), "a: &x 1\nb: *x\n");
        docs[0].resolve().unwrap();
        assert_eq!(emit_documents_to_string(&docs, &config).unwrap(), "a: &x 1\nb: *x\n");
        let json = EmitterConfig::default().with_mode(EmitterMode::JsonOneline);
        assert_eq!(docs[0].emit_to_string(&json).unwrap(), "{\"a\": 1, \"b\": 1}");
    }

    #[test]
    fn tabs_force_double_quotes() {
        let mut doc = Document::new();
        let map = doc.create_mapping(CollectionStyle::Block);
        for (key, text, style) in [
            ("k", "a\tb", ScalarType::Any),
            ("p", "c\td", ScalarType::Plain),
            ("q", "e\tf", ScalarType::SingleQuote),
        ] {
            let key = doc.create_scalar(key, ScalarType::Plain);
            let value = doc.create_scalar(text, style);
            doc.mapping_insert(map, key, value).unwrap();
        }
        doc.set_root(map).unwrap();
        let out = doc.emit_to_string(&EmitterConfig::default()).unwrap();
        assert_eq!(out, "k: \"a\\tb\"\np: \"c\\td\"\nq: \"e\\tf\"\n");
        assert_eq!(load(&out)[0].root_value().unwrap(), doc.root_value().unwrap());
    }

    #[test]
    fn unresolved_aliases_expand_for_json() {
        let docs = load("base: &b {x: 1}\nuse: *b\n");
        let json = EmitterConfig::default().with_mode(EmitterMode::JsonOneline);
        assert_eq!(
            docs[0].emit_to_string(&json).unwrap(),
            "{\"base\": {\"x\": 1}, \"use\": {\"x\": 1}}"
        );
    }

    #[test]
    fn collected_expansion_errors_write_null() {
        let docs = load("a: &r [1, *r]\nb: 2\n");
        let json = EmitterConfig::default()
            .with_mode(EmitterMode::JsonOneline)
            .with_collect_errors(true);
        let mut out = String::new();
        {
            let mut emitter = Emitter::new(&mut out, json);
            emitter.emit_document(&docs[0]).unwrap();
            emitter.finish().unwrap();
            let kinds: Vec<_> = emitter
                .diagnostics()
                .iter()
                .map(|d| (d.error.semantic_kind(), d.fatal))
                .collect();
            assert_eq!(kinds, [(Some(SemanticErrorKind::CycleInResolve), false)]);
        }
        assert_eq!(out, "{\"a\": [1, null], \"b\": 2}");
    }

    #[test]
    fn recursive_alias_is_not_expanded() {
        let docs = load("&a [*a]\n");
        let json = EmitterConfig::default().with_mode(EmitterMode::Json);
        let err = docs[0].emit_to_string(&json).unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::CycleInResolve));
        let yaml = docs[0].emit_to_string(&EmitterConfig::default()).unwrap();
        assert_eq!(yaml, "&a [*a]\n");
    }

    #[test]
    fn sorted_and_stripped() {
        let docs = load("b: 1\nc:\na: 2\n");
        let config = EmitterConfig::default()
            .with_sort_keys(true)
            .with_strip_empty_kv(true);
        assert_eq!(docs[0].emit_to_string(&config).unwrap(), "a: 2\nb: 1\n");
    }

    #[test]
    fn built_documents() {
        let mut doc = Document::with_schema(Schema::Core);
        let map = doc.create_mapping(CollectionStyle::Any);
        let key = doc.create_scalar("list", ScalarType::Plain);
        let seq = doc.create_sequence(CollectionStyle::Flow);
        let one = doc.create_scalar("1", ScalarType::Plain);
        let text = doc.create_scalar("1", ScalarType::SingleQuote);
        doc.sequence_append(seq, one).unwrap();
        doc.sequence_append(seq, text).unwrap();
        doc.mapping_insert(map, key, seq).unwrap();
        doc.set_root(map).unwrap();
        let out = doc.emit_to_string(&EmitterConfig::default()).unwrap();
        assert_eq!(out, "list: [1, '1']\n");
        let marked = EmitterConfig::default().with_doc_start_mark(Toggle::On);
        assert_eq!(doc.emit_to_string(&marked).unwrap(), "---\nlist: [1, '1']\n");
    }

    #[test]
    fn several_documents() {
        let docs = load("%YAML 1.1\n--- a\n...\n--- b\n");
        let out = emit_documents_to_string(&docs, &EmitterConfig::default()).unwrap();
        assert_eq!(out, "%YAML 1.1\n--- a\n...\n--- b\n");
        let single = emit_documents_to_string(&docs[1..], &EmitterConfig::default()).unwrap();
        assert_eq!(single, "--- b\n");
    }

    #[test]
    fn flow_text_of_keys() {
        let docs = load("? [x, {y: z}]\n: 1\n");
        let root = docs[0].root().unwrap();
        let key = docs[0].node(root).unwrap().pairs()[0].key;
        assert_eq!(node_to_flow_string(&docs[0], key).unwrap(), "[x, {y: z}]");
    }
}
