//! Separator classification for the lexer.

use sift_common::{Result, error::Error};

/// Escape character. Never treated as a separator.
pub const ESCAPE: u8 = b'\\';

/// 256-bit membership table of separator bytes.
///
/// Every ASCII whitespace and control byte is always a separator. Configured
/// punctuation characters are added on top and must be ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunctuationBitmap([u64; 4]);

impl PunctuationBitmap {
    /// Builds the bitmap from the configured punctuation string.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `punctuation` contains a non-ASCII
    /// character.
    pub fn new(punctuation: &str) -> Result<PunctuationBitmap> {
        let mut bitmap = PunctuationBitmap([0; 4]);
        for b in 0u8..0x80 {
            if b.is_ascii_whitespace() || b.is_ascii_control() {
                bitmap.set(b);
            }
        }
        for c in punctuation.chars() {
            if !c.is_ascii() {
                return Err(Error::invalid_arg(
                    "punctuation",
                    format!("punctuation characters must be ASCII, found {c:?}"),
                ));
            }
            if c as u8 != ESCAPE {
                bitmap.set(c as u8);
            }
        }
        Ok(bitmap)
    }

    fn set(&mut self, b: u8) {
        self.0[(b >> 6) as usize] |= 1u64 << (b & 63);
    }

    /// Returns `true` if the byte is a separator.
    #[inline]
    pub fn contains(&self, b: u8) -> bool {
        self.0[(b >> 6) as usize] & (1u64 << (b & 63)) != 0
    }

    /// Character-level separator test used when the input is valid UTF-8.
    /// Unicode whitespace and control characters separate words as well.
    #[inline]
    pub fn is_separator(&self, c: char) -> bool {
        if c.is_ascii() {
            self.contains(c as u8)
        } else {
            c.is_whitespace() || c.is_control()
        }
    }
}
