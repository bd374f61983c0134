//! Composer and document model.
//!
//! [`YamlLoader`] folds parser events into [`Document`]s one document at a time, and
//! [`compose_events`] walks the events with their paths for callers that build their own
//! structures.

mod compose;
mod document;
pub mod node;
mod path;
mod resolve;

pub use compose::{compose_events, ComposeAction, ComposePath, PathComponent};
pub use document::Document;
pub use node::{Node, NodeData, NodeId, NodeKind, Pair};
pub use path::PathFollow;
pub use resolve::MERGE_TAG;

use crate::config::ParseConfig;
use crate::input::Input;
use crate::tokenizer::Parser;
use compose::DocumentBuilder;
use yamrt_common::{Diagnostic, EventData, SyntaxErrorKind, YamlError, YamlResult};

/// Loads documents from a parser, one at a time.
pub struct YamlLoader {
    parser: Parser,
    done: bool,
}

impl YamlLoader {
    #[must_use]
    pub fn new(parser: Parser) -> Self {
        YamlLoader {
            parser,
            done: false,
        }
    }

    /// Every document of `input` under the default configuration.
    pub fn load_from_str(input: &str) -> YamlResult<Vec<Document>> {
        YamlLoader::new(Parser::new_from_str(input)).collect()
    }

    pub fn load_from_input(input: Input, config: ParseConfig) -> YamlResult<Vec<Document>> {
        YamlLoader::new(Parser::with_config(input, config)).collect()
    }

    /// Builds the next document, or `None` once the stream is exhausted.
    ///
    /// With `resolve_on_load` set the document comes back resolved.
    pub fn next_document(&mut self) -> YamlResult<Option<Document>> {
        let mut builder = loop {
            let Some((event, _)) = self.parser.next_event()? else {
                return Ok(None);
            };
            if let EventData::DocumentStart(start) = &event.data {
                break DocumentBuilder::new(
                    start,
                    &event,
                    self.parser.schema(),
                    self.parser.config(),
                );
            }
        };
        loop {
            let Some((event, span)) = self.parser.next_event()? else {
                if self.parser.config().collect_errors {
                    return Ok(None);
                }
                return Err(YamlError::syntax(
                    SyntaxErrorKind::UnexpectedEof,
                    self.parser.input().mark_at(self.parser.input().len()),
                    "stream ended inside a document",
                ));
            };
            let start = span.start;
            if let Some(mut doc) = builder.push(event)? {
                if self.parser.config().resolve_on_load {
                    doc.resolve()?;
                }
                log::debug!(
                    "composed document of {} nodes ending at {}",
                    doc.len(),
                    start
                );
                return Ok(Some(doc));
            }
        }
    }

    /// Findings recorded by the parser in collect-errors mode.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.parser.diagnostics()
    }

    #[must_use]
    pub fn parser(&self) -> &Parser {
        &self.parser
    }
}

impl Iterator for YamlLoader {
    type Item = YamlResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_document() {
            Ok(Some(doc)) => Some(Ok(doc)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use yamrt_common::YamlDoc;

    #[test]
    fn documents_one_at_a_time() {
        let mut loader = YamlLoader::new(Parser::new_from_str("a\n--- b\n...\n--- [c]\n"));
        let first = loader.next_document().unwrap().unwrap();
        assert_eq!(first.root_value().unwrap(), YamlDoc::String("a".into()));
        assert!(!first.explicit_start);
        let second = loader.next_document().unwrap().unwrap();
        assert!(second.explicit_start && second.explicit_end);
        let third = loader.next_document().unwrap().unwrap();
        assert_eq!(
            third.root_value().unwrap(),
            YamlDoc::Sequence(vec![YamlDoc::String("c".into())])
        );
        assert!(loader.next_document().unwrap().is_none());
    }

    #[test]
    fn empty_document_is_null() {
        let docs = YamlLoader::load_from_str("---\n").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].root_value().unwrap(), YamlDoc::Null);
        assert!(YamlLoader::load_from_str("").unwrap().is_empty());
    }

    #[test]
    fn scalar_resolution_follows_version() {
        let docs = YamlLoader::load_from_str("key: 0o17\n").unwrap();
        let value = docs[0].root_value().unwrap();
        assert_eq!(value.get("key"), Some(&YamlDoc::Integer(15)));

        let docs = YamlLoader::load_from_str("%YAML 1.1\n---\nkey: 0o17\n").unwrap();
        let value = docs[0].root_value().unwrap();
        assert_eq!(value.get("key").and_then(YamlDoc::as_str), Some("0o17"));
    }

    #[test]
    fn resolve_on_load() {
        let config = ParseConfig::default().with_resolve_on_load(true);
        let docs = YamlLoader::load_from_input(Input::from_str("a: &x 1\nb: *x\n"), config).unwrap();
        assert!(docs[0].is_resolved());
    }

    #[test]
    fn errors_end_iteration() {
        let mut loader = YamlLoader::new(Parser::new_from_str("a\n--- [b\n"));
        assert!(loader.next().unwrap().is_ok());
        let err = loader.next().unwrap().unwrap_err();
        assert!(err.syntax_kind().is_some());
        assert!(loader.next().is_none());
    }
}
