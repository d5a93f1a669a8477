use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// The unit revealed or removed per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One Unicode scalar value.
    #[default]
    CodePoint,
    /// One extended grapheme cluster, so `e` + combining accent or a flag
    /// emoji appear as a single step.
    Grapheme,
}

/// Text split into units, addressable by prefix length.
#[derive(Debug, Clone)]
pub struct Glyphs {
    text: String,
    /// Byte offset just past each unit.
    ends: Vec<usize>,
}

impl Glyphs {
    pub fn new(text: &str, granularity: Granularity) -> Self {
        let ends = match granularity {
            Granularity::CodePoint => text.char_indices().map(|(i, c)| i + c.len_utf8()).collect(),
            Granularity::Grapheme => text
                .grapheme_indices(true)
                .map(|(i, g)| i + g.len())
                .collect(),
        };
        Self {
            text: text.to_string(),
            ends,
        }
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// The first `n` units. Clamped to the whole text.
    pub fn prefix(&self, n: usize) -> &str {
        match n.min(self.ends.len()) {
            0 => "",
            n => &self.text[..self.ends[n - 1]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_prefixes() {
        let glyphs = Glyphs::new("Hi!", Granularity::CodePoint);
        assert_eq!(glyphs.len(), 3);
        assert_eq!(glyphs.prefix(0), "");
        assert_eq!(glyphs.prefix(2), "Hi");
        assert_eq!(glyphs.prefix(3), "Hi!");
        assert_eq!(glyphs.prefix(10), "Hi!");
    }

    #[test]
    fn code_points_not_bytes() {
        let glyphs = Glyphs::new("héllo→", Granularity::CodePoint);
        assert_eq!(glyphs.len(), 6);
        assert_eq!(glyphs.prefix(2), "hé");
        assert_eq!(glyphs.prefix(6), "héllo→");
    }

    #[test]
    fn graphemes_keep_combining_marks_together() {
        // "e" + U+0301 COMBINING ACUTE ACCENT
        let text = "e\u{301}x";
        assert_eq!(Glyphs::new(text, Granularity::CodePoint).len(), 3);

        let glyphs = Glyphs::new(text, Granularity::Grapheme);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs.prefix(1), "e\u{301}");
    }

    #[test]
    fn empty_text_has_no_units() {
        let glyphs = Glyphs::new("", Granularity::Grapheme);
        assert!(glyphs.is_empty());
        assert_eq!(glyphs.prefix(1), "");
    }
}
