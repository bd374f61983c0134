//! Round-trip YAML 1.1 and 1.2 processing.
//!
//! Text goes in through [`Input`], is tokenized by the [`Scanner`] and turned into events by
//! the [`Parser`]. [`YamlLoader`] builds [`Document`]s from those events, which can be queried
//! with [`YPath`], resolved, edited and written back out by the [`Emitter`].
//!
//! ```
//! use yamrt_core::{EmitterConfig, EmitterMode, YamlLoader};
//!
//! let docs = YamlLoader::load_from_str("{a: 1, b: [2, 3]}").unwrap();
//! let json = docs[0]
//!     .emit_to_string(&EmitterConfig::default().with_mode(EmitterMode::JsonOneline))
//!     .unwrap();
//! assert_eq!(json, r#"{"a": 1, "b": [2, 3]}"#);
//! ```

pub mod config;
pub mod emitter;
pub mod escaper;
pub mod input;
pub mod schema;
pub mod tokenizer;
pub mod treebuild;
pub mod ypath;

pub use config::{AnchorPolicy, ParseConfig};
pub use emitter::{
    emit_documents_to_string, emit_events_to_string, Emitter, EmitterConfig, EmitterMode, Toggle,
};
pub use input::{Encoding, Input};
pub use schema::Schema;
pub use tokenizer::{Parser, Scanner};
pub use treebuild::{compose_events, ComposeAction, Document, NodeId, PathFollow, YamlLoader};
pub use ypath::{YPath, YPathError};
