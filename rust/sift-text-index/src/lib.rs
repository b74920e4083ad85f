//! In-memory full-text inverted index.
//!
//! This crate indexes short text field values of records identified by opaque
//! keys and answers exact-term, prefix, suffix and wildcard queries while
//! records are concurrently added, modified and removed.
//!
//! # Overview
//!
//! - [`lexer`]: splits field text into normalized terms (punctuation, escapes,
//!   case folding, stop words, stemming) with their positions.
//! - [`text_index::TextIndex`]: the term corpus shared by all text fields of a
//!   schema. Each term owns one posting list, reachable from a prefix trie and
//!   optionally from a suffix trie.
//! - [`field_index::TextFieldIndex`]: the record lifecycle of one field,
//!   backed by a reverse-by-key index so that removals and modifications do
//!   not need the previous text.
//! - [`query`]: lazy evaluation of [`TextPredicate`]s, with negation.
//! - [`persistence`]: save and load hooks producing a versioned snapshot.
//!
//! # Quick Start
//!
//! ```rust
//! use sift_text_index::{FieldTextConfig, Key, SchemaTextConfig, TextIndexSchema, TextPredicate};
//!
//! let schema = TextIndexSchema::new(SchemaTextConfig::default()).unwrap();
//! let title = schema.create_field(&FieldTextConfig::default()).unwrap();
//!
//! title.add_record(&Key::from("doc:1"), b"Dogs running in the park").unwrap();
//! title.add_record(&Key::from("doc:2"), b"A sleeping cat").unwrap();
//!
//! let predicate = TextPredicate::parse("run").unwrap();
//! let keys: Vec<Key> = title.search(&predicate, false).unwrap().collect();
//! assert_eq!(keys, vec![Key::from("doc:1")]);
//! ```

pub mod config;
pub mod field_index;
pub mod key;
pub mod lexer;
pub mod lock_table;
pub mod persistence;
pub mod postings;
pub mod query;
pub mod radix_tree;
pub mod reverse_index;
pub mod schema;
pub mod text_index;

pub use config::{
    FieldTextConfig, IndexLimits, Language, PositionGranularity, SchemaTextConfig,
    TextFieldConfig,
};
pub use field_index::{DeletionType, FieldIndexInfo, TextFieldIndex};
pub use key::{FieldId, Key, Position, Term};
pub use query::{SearchResults, TextPredicate};
pub use schema::{SchemaInfo, TextIndexSchema};
pub use text_index::TextIndex;
