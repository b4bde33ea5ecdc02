//! Sliding window search shared by the fuzzy tiers.
//!
//! The scan runs in two passes. A coarse pass slides a needle-length window
//! across the range with a step proportional to the needle length. A
//! refinement pass then revisits every start within one step of the best
//! coarse window at single-character resolution, trying window lengths
//! within the configured tolerance of the needle length. The highest score
//! wins. Equal scores are settled by trigram occurrence counts, and after
//! that by the first window seen, which keeps results deterministic and
//! biased toward the left of the document.

use std::ops::Range;

use reanchor_core::ScanConfig;
use tracing::trace;

use crate::trigram::{TrigramCounts, TrigramIndexer, TrigramSet};

/// A scored character window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Trigram profile of the text being searched for.
#[derive(Debug, Clone)]
pub struct Needle {
    grams: TrigramSet,
    counts: TrigramCounts,
    len: usize,
}

impl Needle {
    /// Length of the raw needle text in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when normalization left nothing to compare.
    pub fn is_empty(&self) -> bool {
        self.grams.is_empty()
    }

    pub fn grams(&self) -> &TrigramSet {
        &self.grams
    }
}

/// Best window seen so far during one scan.
#[derive(Default)]
struct Leader {
    window: Option<Window>,
    // Occurrence-count score of `window`, computed only when a tie needs it
    counts: Option<f32>,
}

/// Finds the window of a char buffer most similar to a needle.
#[derive(Debug, Clone, Copy)]
pub struct WindowScanner {
    indexer: TrigramIndexer,
    config: ScanConfig,
}

impl WindowScanner {
    pub fn new(indexer: TrigramIndexer, config: ScanConfig) -> Self {
        Self { indexer, config }
    }

    pub fn indexer(&self) -> &TrigramIndexer {
        &self.indexer
    }

    fn offer(
        &self,
        leader: &mut Leader,
        haystack: &[char],
        needle: &Needle,
        start: usize,
        len: usize,
    ) {
        let chars = &haystack[start..start + len];
        let score = self.indexer.index_chars(chars).similarity(&needle.grams);
        let candidate = Window {
            start,
            end: start + len,
            score,
        };
        match leader.window {
            Some(best) if score < best.score => {}
            Some(best) if score == best.score => {
                let current = *leader.counts.get_or_insert_with(|| {
                    self.indexer
                        .count_chars(&haystack[best.start..best.end])
                        .similarity(&needle.counts)
                });
                let challenger = self.indexer.count_chars(chars).similarity(&needle.counts);
                if challenger > current {
                    leader.window = Some(candidate);
                    leader.counts = Some(challenger);
                }
            }
            _ => {
                leader.window = Some(candidate);
                leader.counts = None;
            }
        }
    }

    /// Profile raw needle text for scanning.
    pub fn needle(&self, chars: &[char]) -> Needle {
        Needle {
            grams: self.indexer.index_chars(chars),
            counts: self.indexer.count_chars(chars),
            len: chars.len(),
        }
    }

    /// Best window for `needle` within `range` of `haystack`.
    ///
    /// Returns `None` for an empty range or needle. Leading and trailing
    /// whitespace is trimmed from the winning window.
    pub fn best_window(
        &self,
        haystack: &[char],
        range: Range<usize>,
        needle: &Needle,
    ) -> Option<Window> {
        let range_end = range.end.min(haystack.len());
        let range_start = range.start;
        let needle_len = needle.len();
        if range_start >= range_end || needle.is_empty() || needle_len == 0 {
            return None;
        }

        let step = self.config.step_for(needle_len);
        let delta = self.config.length_delta(needle_len);
        let coarse_len = needle_len.min(range_end - range_start);

        let mut leader = Leader::default();
        let mut start = range_start;
        while start + coarse_len <= range_end {
            self.offer(&mut leader, haystack, needle, start, coarse_len);
            start += step;
        }

        let anchor = leader.window?.start;
        let lo = anchor.saturating_sub(step).max(range_start);
        let hi = (anchor + step).min(range_end - 1);
        let min_len = needle_len.saturating_sub(delta).max(1);
        let max_len = needle_len + delta;
        for start in lo..=hi {
            for len in min_len..=max_len {
                if start + len > range_end {
                    break;
                }
                self.offer(&mut leader, haystack, needle, start, len);
            }
        }

        let mut window = leader.window?;
        while window.start < window.end && haystack[window.start].is_whitespace() {
            window.start += 1;
        }
        while window.end > window.start && haystack[window.end - 1].is_whitespace() {
            window.end -= 1;
        }

        trace!(
            start = window.start,
            end = window.end,
            similarity = window.score,
            "Best scan window"
        );

        if window.is_empty() {
            None
        } else {
            Some(window)
        }
    }
}
