//! Text normalization ahead of trigram indexing.
//!
//! Normalization lowercases, collapses whitespace runs to a single space and
//! drops leading/trailing whitespace. With typographic folding enabled it
//! also maps every quote-like character to `'`, every dash variant to `-`,
//! and removes soft hyphens, which is where re-extracted PDF text most often
//! differs from the text an annotation was captured on.

/// Quote-like characters folded to `'`.
const QUOTES: &[char] = &[
    '"', '\'', '`', '\u{00B4}', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}', '\u{201C}',
    '\u{201D}', '\u{201E}', '\u{201F}',
];

const SOFT_HYPHEN: char = '\u{00AD}';

fn is_dash(c: char) -> bool {
    matches!(c, '\u{2010}'..='\u{2015}' | '\u{2212}')
}

/// Lowercasing, whitespace-collapsing normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNormalizer {
    fold_typography: bool,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            fold_typography: true,
        }
    }
}

impl TextNormalizer {
    pub fn new(fold_typography: bool) -> Self {
        Self { fold_typography }
    }

    /// Normalizer without typographic folding.
    pub fn basic() -> Self {
        Self::new(false)
    }

    pub fn folds_typography(&self) -> bool {
        self.fold_typography
    }

    /// Map one character through folding; `None` drops it.
    fn fold(&self, c: char) -> Option<char> {
        if !self.fold_typography {
            return Some(c);
        }
        if c == SOFT_HYPHEN {
            None
        } else if QUOTES.contains(&c) {
            Some('\'')
        } else if is_dash(c) {
            Some('-')
        } else {
            Some(c)
        }
    }

    /// Normalize a char slice.
    pub fn normalize_chars(&self, chars: &[char]) -> Vec<char> {
        let mut out = Vec::with_capacity(chars.len());
        let mut pending_space = false;

        for &c in chars {
            if c.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            let Some(c) = self.fold(c) else {
                continue;
            };
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.extend(c.to_lowercase());
        }

        out
    }

    /// Normalize a string.
    pub fn normalize(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        self.normalize_chars(&chars).into_iter().collect()
    }
}
