//! Owner of the term corpus shared by all text fields of a schema.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde::Serialize;
use sift_common::{Result, error::Error};

use crate::{
    config::{FieldTextConfig, SchemaTextConfig, TextFieldConfig},
    field_index::TextFieldIndex,
    key::FieldId,
    text_index::TextIndex,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaInfo {
    pub num_text_fields: usize,
    pub num_terms: usize,
    pub with_suffix_trie: bool,
}

/// Text side of an index schema: one corpus, many fields.
///
/// Field numbers are handed out sequentially starting at zero and tag every
/// occurrence the field contributes to the shared posting lists.
#[derive(Debug)]
pub struct TextIndexSchema {
    config: SchemaTextConfig,
    corpus: Arc<TextIndex>,
    num_fields: AtomicUsize,
}

impl TextIndexSchema {
    /// Creates a schema with an empty corpus. The corpus maintains a suffix
    /// trie when the schema configuration asks for one.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-argument error when the schema-level
    /// configuration is invalid.
    pub fn new(config: SchemaTextConfig) -> Result<Arc<TextIndexSchema>> {
        TextFieldConfig::resolve(&config, &FieldTextConfig::default())?;
        let corpus = Arc::new(TextIndex::new(
            config.with_suffix_trie,
            config.limits.lock_shards,
        )?);
        Ok(Arc::new(TextIndexSchema {
            config,
            corpus,
            num_fields: AtomicUsize::new(0),
        }))
    }

    pub fn config(&self) -> &SchemaTextConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Arc<TextIndex> {
        &self.corpus
    }

    pub fn num_text_fields(&self) -> usize {
        self.num_fields.load(Ordering::Acquire)
    }

    /// Allocates the next field number.
    ///
    /// # Errors
    ///
    /// Returns a limit-exceeded error once `max_text_fields` numbers have been
    /// handed out.
    pub fn allocate_field_number(&self) -> Result<FieldId> {
        let limit = self.config.limits.max_text_fields.min(FieldId::MAX as usize);
        let allocated = self
            .num_fields
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|n| Error::limit_exceeded("text fields per schema", n + 1, limit))?;
        // `allocated < limit <= FieldId::MAX`.
        Ok(allocated as FieldId)
    }

    /// Resolves the field configuration against the schema defaults and
    /// creates a field index on the shared corpus.
    pub fn create_field(&self, field: &FieldTextConfig) -> Result<TextFieldIndex> {
        let config = TextFieldConfig::resolve(&self.config, field)?;
        if config.with_suffix_trie && !self.corpus.has_suffix_trie() {
            return Err(Error::invalid_arg(
                "with_suffix_trie",
                "suffix search requires the schema to enable the suffix trie",
            ));
        }
        let number = self.allocate_field_number()?;
        log::info!("allocated text field number {number}");
        TextFieldIndex::with_corpus(number, config, self.corpus.clone())
    }

    pub fn info(&self) -> SchemaInfo {
        SchemaInfo {
            num_text_fields: self.num_text_fields(),
            num_terms: self.corpus.term_count(),
            with_suffix_trie: self.corpus.has_suffix_trie(),
        }
    }
}
