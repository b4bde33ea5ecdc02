//! Trigram indexing and set similarity.

use std::collections::{HashMap, HashSet};

use crate::normalize::TextNormalizer;

/// Three consecutive normalized characters.
pub type Trigram = [char; 3];

/// Padding used for normalized strings shorter than three characters.
const PAD: char = '\0';

/// The set of distinct trigrams of a normalized string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrigramSet {
    grams: HashSet<Trigram>,
}

impl TrigramSet {
    /// Build from an already normalized char sequence.
    ///
    /// Sequences of one or two characters yield a single zero-padded gram so
    /// very short spans still compare equal to themselves.
    pub fn from_normalized(chars: &[char]) -> Self {
        let grams = match chars.len() {
            0 => HashSet::new(),
            1 => HashSet::from([[chars[0], PAD, PAD]]),
            2 => HashSet::from([[chars[0], chars[1], PAD]]),
            _ => chars.windows(3).map(|w| [w[0], w[1], w[2]]).collect(),
        };
        Self { grams }
    }

    pub fn len(&self) -> usize {
        self.grams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grams.is_empty()
    }

    pub fn contains(&self, gram: &Trigram) -> bool {
        self.grams.contains(gram)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigram> {
        self.grams.iter()
    }

    /// Size of the intersection with `other`.
    pub fn intersection_len(&self, other: &TrigramSet) -> usize {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.grams.iter().filter(|g| large.grams.contains(*g)).count()
    }

    /// Jaccard similarity (intersection over union).
    ///
    /// Defined as 0 when either set is empty, so degenerate input never
    /// produces a confident match.
    pub fn similarity(&self, other: &TrigramSet) -> f32 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let intersection = self.intersection_len(other);
        let union = self.len() + other.len() - intersection;
        intersection as f32 / union as f32
    }
}

/// Trigram occurrence counts of a normalized string.
///
/// Used to break ties between windows whose distinct-trigram sets score the
/// same, which happens when a boundary character only contributes trigrams
/// that occur elsewhere in the window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrigramCounts {
    counts: HashMap<Trigram, usize>,
    total: usize,
}

impl TrigramCounts {
    pub fn from_normalized(chars: &[char]) -> Self {
        let mut counts = HashMap::new();
        match chars.len() {
            0 => {}
            1 => {
                counts.insert([chars[0], PAD, PAD], 1);
            }
            2 => {
                counts.insert([chars[0], chars[1], PAD], 1);
            }
            _ => {
                for w in chars.windows(3) {
                    *counts.entry([w[0], w[1], w[2]]).or_insert(0) += 1;
                }
            }
        }
        let total = counts.values().sum();
        Self { counts, total }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Multiset Jaccard similarity: summed minimum counts over summed
    /// maximum counts. 0 when either side is empty.
    pub fn similarity(&self, other: &TrigramCounts) -> f32 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let shared: usize = self
            .counts
            .iter()
            .map(|(gram, &n)| n.min(other.counts.get(gram).copied().unwrap_or(0)))
            .sum();
        let union = self.total + other.total - shared;
        shared as f32 / union as f32
    }
}

/// Produces trigram sets for raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrigramIndexer {
    normalizer: TextNormalizer,
}

impl TrigramIndexer {
    pub fn new(normalizer: TextNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn index(&self, text: &str) -> TrigramSet {
        let chars: Vec<char> = text.chars().collect();
        self.index_chars(&chars)
    }

    pub fn index_chars(&self, chars: &[char]) -> TrigramSet {
        TrigramSet::from_normalized(&self.normalizer.normalize_chars(chars))
    }

    pub fn count_chars(&self, chars: &[char]) -> TrigramCounts {
        TrigramCounts::from_normalized(&self.normalizer.normalize_chars(chars))
    }
}

/// Jaccard similarity of two trigram sets, in `[0, 1]`.
pub fn trigram_similarity(a: &TrigramSet, b: &TrigramSet) -> f32 {
    a.similarity(b)
}

/// Trigram similarity of two strings using the default normalizer.
pub fn text_similarity(a: &str, b: &str) -> f32 {
    let indexer = TrigramIndexer::default();
    indexer.index(a).similarity(&indexer.index(b))
}
