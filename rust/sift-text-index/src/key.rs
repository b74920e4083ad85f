//! Document keys and the basic scalar types shared by the index structures.

use std::{borrow::Borrow, fmt, sync::Arc};

/// Normalized term bytes. Never empty once it reaches the corpus.
pub type Term = Vec<u8>;

/// Offset of a term occurrence within a field's text. The unit (byte, character
/// or word ordinal) is selected by [`PositionGranularity`](crate::config::PositionGranularity).
pub type Position = u32;

/// Per-schema text field tag, allocated sequentially by
/// [`TextIndexSchema`](crate::schema::TextIndexSchema).
pub type FieldId = u8;

/// Reference-counted, externally owned document key.
///
/// The index never owns the lifetime of the underlying bytes beyond the shared
/// reference it keeps for every tracked occurrence. Keys are expected to be
/// interned by the host, so equality, hashing and ordering by content coincide
/// with identity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Arc<[u8]>);

impl Key {
    pub fn new(bytes: impl AsRef<[u8]>) -> Key {
        Key(Arc::from(bytes.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(Arc::from(value.into_bytes().into_boxed_slice()))
    }
}

impl From<&[u8]> for Key {
    fn from(value: &[u8]) -> Self {
        Key::new(value)
    }
}

impl From<Arc<[u8]>> for Key {
    fn from(value: Arc<[u8]>) -> Self {
        Key(value)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Key {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Lossy rendering of a term for log and error messages.
pub(crate) fn display_term(term: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(term)
}
