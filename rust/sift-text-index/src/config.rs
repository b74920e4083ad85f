//! Text indexing configuration.
//!
//! Configuration is given at two levels: the schema supplies defaults for all of
//! its text fields ([`SchemaTextConfig`]) and each field may override a subset of
//! them ([`FieldTextConfig`]). The two are resolved exactly once, when the field
//! index is constructed, into an immutable [`TextFieldConfig`]. Field-level values
//! win whenever they are present. There is no runtime re-resolution.
//!
//! All configuration types are serde-serializable so the command layer can build
//! them from whatever representation it parses.

use serde::{Deserialize, Serialize};
use sift_common::{Result, error::Error, verify_arg};

use crate::key::FieldId;

/// Punctuation characters treated as word separators unless overridden.
///
/// Whitespace and ASCII control characters are always separators in addition to
/// this set. The backslash is reserved as the escape character.
pub const DEFAULT_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[]^_`{|}~";

/// Stop words removed from the term stream unless overridden.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "is", "the", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into",
    "it", "no", "not", "of", "on", "or", "such", "that", "their", "then", "there", "these", "they",
    "this", "to", "was", "will", "with",
];

/// Words shorter than this (in characters) are never stemmed by default.
pub const DEFAULT_MIN_STEM_SIZE: u32 = 4;

/// Default maximum length of a single term in bytes.
pub const DEFAULT_MAX_TERM_LENGTH: usize = 128;

/// Default maximum number of distinct terms a single record may contribute.
pub const DEFAULT_MAX_TERMS_PER_RECORD: usize = 64 * 1024;

/// Default number of mutexes in the term and key lock tables.
pub const DEFAULT_LOCK_SHARDS: usize = 256;

/// Language used to select the stemming algorithm.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// No language-specific processing; stemming is disabled.
    Unspecified,
    Arabic,
    Danish,
    Dutch,
    #[default]
    English,
    Finnish,
    French,
    German,
    Greek,
    Hungarian,
    Italian,
    Norwegian,
    Portuguese,
    Romanian,
    Russian,
    Spanish,
    Swedish,
    Tamil,
    Turkish,
}

impl Language {
    pub const fn name(&self) -> &'static str {
        match self {
            Language::Unspecified => "unspecified",
            Language::Arabic => "arabic",
            Language::Danish => "danish",
            Language::Dutch => "dutch",
            Language::English => "english",
            Language::Finnish => "finnish",
            Language::French => "french",
            Language::German => "german",
            Language::Greek => "greek",
            Language::Hungarian => "hungarian",
            Language::Italian => "italian",
            Language::Norwegian => "norwegian",
            Language::Portuguese => "portuguese",
            Language::Romanian => "romanian",
            Language::Russian => "russian",
            Language::Spanish => "spanish",
            Language::Swedish => "swedish",
            Language::Tamil => "tamil",
            Language::Turkish => "turkish",
        }
    }
}

impl TryFrom<&str> for Language {
    type Error = sift_common::error::Error;

    fn try_from(name: &str) -> Result<Self> {
        let language = match name.to_ascii_lowercase().as_str() {
            "unspecified" | "none" => Language::Unspecified,
            "arabic" => Language::Arabic,
            "danish" => Language::Danish,
            "dutch" => Language::Dutch,
            "english" => Language::English,
            "finnish" => Language::Finnish,
            "french" => Language::French,
            "german" => Language::German,
            "greek" => Language::Greek,
            "hungarian" => Language::Hungarian,
            "italian" => Language::Italian,
            "norwegian" => Language::Norwegian,
            "portuguese" => Language::Portuguese,
            "romanian" => Language::Romanian,
            "russian" => Language::Russian,
            "spanish" => Language::Spanish,
            "swedish" => Language::Swedish,
            "tamil" => Language::Tamil,
            "turkish" => Language::Turkish,
            _ => {
                return Err(Error::invalid_arg(
                    "language",
                    format!("Unrecognized language: {name}"),
                ));
            }
        };
        Ok(language)
    }
}

/// Unit in which term positions are recorded.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionGranularity {
    /// Byte offset of the first byte of the word.
    #[default]
    Byte,
    /// Character offset of the first character of the word.
    Char,
    /// Ordinal of the word within the field text, stop words included.
    Word,
}

/// Resource limits applied synchronously when records are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexLimits {
    /// Maximum length of a normalized term, in bytes.
    pub max_term_length: usize,
    /// Maximum number of distinct terms a single record may contribute.
    pub max_terms_per_record: usize,
    /// Maximum number of text fields sharing one schema corpus.
    pub max_text_fields: usize,
    /// Number of mutexes in the term and key lock tables.
    pub lock_shards: usize,
}

impl Default for IndexLimits {
    fn default() -> Self {
        IndexLimits {
            max_term_length: DEFAULT_MAX_TERM_LENGTH,
            max_terms_per_record: DEFAULT_MAX_TERMS_PER_RECORD,
            max_text_fields: FieldId::MAX as usize,
            lock_shards: DEFAULT_LOCK_SHARDS,
        }
    }
}

impl IndexLimits {
    pub fn validate(&self) -> Result<()> {
        verify_arg!(max_term_length, self.max_term_length > 0);
        verify_arg!(max_terms_per_record, self.max_terms_per_record > 0);
        verify_arg!(
            max_text_fields,
            self.max_text_fields > 0 && self.max_text_fields <= FieldId::MAX as usize
        );
        verify_arg!(lock_shards, self.lock_shards > 0);
        Ok(())
    }
}

/// Schema-level text settings shared by every text field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaTextConfig {
    pub punctuation: String,
    pub stop_words: Vec<String>,
    pub language: Language,
    pub no_stem: bool,
    pub min_stem_size: u32,
    pub case_folding: bool,
    pub with_offsets: bool,
    pub position_granularity: PositionGranularity,
    /// Whether the shared corpus maintains a suffix trie.
    pub with_suffix_trie: bool,
    pub limits: IndexLimits,
}

impl Default for SchemaTextConfig {
    fn default() -> Self {
        SchemaTextConfig {
            punctuation: DEFAULT_PUNCTUATION.to_string(),
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            language: Language::default(),
            no_stem: false,
            min_stem_size: DEFAULT_MIN_STEM_SIZE,
            case_folding: true,
            with_offsets: true,
            position_granularity: PositionGranularity::default(),
            with_suffix_trie: false,
            limits: IndexLimits::default(),
        }
    }
}

/// Field-level overrides. `None` inherits the schema-level value.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTextConfig {
    pub punctuation: Option<String>,
    pub stop_words: Option<Vec<String>>,
    pub language: Option<Language>,
    pub no_stem: Option<bool>,
    /// Zero is treated as "not set".
    pub min_stem_size: Option<u32>,
    pub case_folding: Option<bool>,
    pub with_offsets: Option<bool>,
    pub position_granularity: Option<PositionGranularity>,
    pub with_suffix_trie: Option<bool>,
}

/// Fully resolved, immutable configuration of one text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFieldConfig {
    pub punctuation: String,
    pub stop_words: Vec<String>,
    pub language: Language,
    pub stemming: bool,
    pub min_stem_size: u32,
    pub case_folding: bool,
    pub with_offsets: bool,
    pub position_granularity: PositionGranularity,
    pub with_suffix_trie: bool,
    pub limits: IndexLimits,
}

impl TextFieldConfig {
    /// Resolves field-level overrides on top of the schema-level defaults.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error when the resulting punctuation set
    /// contains non-ASCII characters, when the minimum stem size is zero, or when
    /// the limits are out of range.
    pub fn resolve(schema: &SchemaTextConfig, field: &FieldTextConfig) -> Result<TextFieldConfig> {
        let no_stem = field.no_stem.unwrap_or(schema.no_stem);
        let language = field.language.unwrap_or(schema.language);
        let min_stem_size = field
            .min_stem_size
            .filter(|&size| size > 0)
            .unwrap_or(schema.min_stem_size);

        let config = TextFieldConfig {
            punctuation: field
                .punctuation
                .clone()
                .unwrap_or_else(|| schema.punctuation.clone()),
            stop_words: field
                .stop_words
                .clone()
                .unwrap_or_else(|| schema.stop_words.clone()),
            language,
            stemming: !no_stem && language != Language::Unspecified,
            min_stem_size,
            case_folding: field.case_folding.unwrap_or(schema.case_folding),
            with_offsets: field.with_offsets.unwrap_or(schema.with_offsets),
            position_granularity: field
                .position_granularity
                .unwrap_or(schema.position_granularity),
            with_suffix_trie: field.with_suffix_trie.unwrap_or(schema.with_suffix_trie),
            limits: schema.limits.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(c) = self.punctuation.chars().find(|c| !c.is_ascii()) {
            return Err(Error::invalid_arg(
                "punctuation",
                format!("punctuation characters must be ASCII, found {c:?}"),
            ));
        }
        verify_arg!(min_stem_size, self.min_stem_size > 0);
        self.limits.validate()
    }
}

impl Default for TextFieldConfig {
    fn default() -> Self {
        // The default schema configuration always resolves.
        TextFieldConfig {
            punctuation: DEFAULT_PUNCTUATION.to_string(),
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            language: Language::English,
            stemming: true,
            min_stem_size: DEFAULT_MIN_STEM_SIZE,
            case_folding: true,
            with_offsets: true,
            position_granularity: PositionGranularity::Byte,
            with_suffix_trie: false,
            limits: IndexLimits::default(),
        }
    }
}
