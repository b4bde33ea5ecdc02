//! Character-addressed view of a document text snapshot and its chunks.

use std::ops::Range;

use reanchor_core::{Chunk, TextContext};

/// A document text decoded once into chars, plus the current chunk list.
///
/// Every offset produced or consumed here is a character offset. The chunk
/// list must come from the same reprocessing generation as the text.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot<'a> {
    text: &'a str,
    chars: Vec<char>,
    chunks: &'a [Chunk],
}

impl<'a> DocumentSnapshot<'a> {
    pub fn new(text: &'a str, chunks: &'a [Chunk]) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            chunks,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn chunks(&self) -> &'a [Chunk] {
        self.chunks
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Text of `[start, end)`, clamped to the document.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Context around `[start, end)`.
    pub fn context_around(&self, start: usize, end: usize, window: usize) -> TextContext {
        TextContext::capture_chars(&self.chars, start, end, window)
    }

    /// Char start offsets of every non-overlapping occurrence of `needle`.
    pub fn find_all(&self, needle: &[char]) -> Vec<usize> {
        self.find_in_range(needle, 0..self.len())
    }

    /// Char start offsets of non-overlapping occurrences of `needle` that lie
    /// entirely within `range`.
    pub fn find_in_range(&self, needle: &[char], range: Range<usize>) -> Vec<usize> {
        let end = range.end.min(self.len());
        let mut hits = Vec::new();
        if needle.is_empty() || range.start >= end || end - range.start < needle.len() {
            return hits;
        }

        let mut pos = range.start;
        while pos + needle.len() <= end {
            if self.chars[pos..pos + needle.len()] == *needle {
                hits.push(pos);
                pos += needle.len();
            } else {
                pos += 1;
            }
        }
        hits
    }

    /// The current chunk carrying `chunk_index`, if any.
    pub fn chunk_by_index(&self, chunk_index: u32) -> Option<&'a Chunk> {
        self.chunks
            .iter()
            .find(|c| c.is_current && c.chunk_index == chunk_index)
    }

    /// Char range a chunk covers in this snapshot.
    ///
    /// `None` when the chunk's range is empty, inverted, or runs past the end
    /// of the text (a sign it belongs to another generation).
    pub fn chunk_range(&self, chunk: &Chunk) -> Option<Range<usize>> {
        if !chunk.has_valid_range() || chunk.end_offset > self.len() {
            return None;
        }
        Some(chunk.start_offset..chunk.end_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_find_all_non_overlapping() {
        let doc = DocumentSnapshot::new("abab aba", &[]);
        assert_eq!(doc.find_all(&chars("ab")), vec![0, 2, 5]);
        assert_eq!(doc.find_all(&chars("aba")), vec![0, 5]);
        assert!(doc.find_all(&chars("zz")).is_empty());
        assert!(doc.find_all(&[]).is_empty());
    }

    #[test]
    fn test_find_uses_char_offsets() {
        let doc = DocumentSnapshot::new("né né", &[]);
        assert_eq!(doc.find_all(&chars("né")), vec![0, 3]);
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn test_find_in_range() {
        let doc = DocumentSnapshot::new("cat cat cat", &[]);
        assert_eq!(doc.find_in_range(&chars("cat"), 2..11), vec![4, 8]);
        assert_eq!(doc.find_in_range(&chars("cat"), 4..6), Vec::<usize>::new());
    }

    #[test]
    fn test_slice_clamps() {
        let doc = DocumentSnapshot::new("hello", &[]);
        assert_eq!(doc.slice(1, 3), "el");
        assert_eq!(doc.slice(3, 99), "lo");
        assert_eq!(doc.slice(9, 99), "");
    }

    #[test]
    fn test_chunk_lookup_and_range() {
        let doc_id = Uuid::new_v4();
        let mut stale = Chunk::new(doc_id, 0, 0, 3, "abc");
        stale.is_current = false;
        let chunks = vec![
            stale,
            Chunk::new(doc_id, 0, 0, 5, "hello"),
            Chunk::new(doc_id, 1, 5, 40, "past the end"),
        ];
        let doc = DocumentSnapshot::new("hello world", &chunks);

        let first = doc.chunk_by_index(0).unwrap();
        assert!(first.is_current);
        assert_eq!(doc.chunk_range(first), Some(0..5));

        let second = doc.chunk_by_index(1).unwrap();
        assert_eq!(doc.chunk_range(second), None);

        assert!(doc.chunk_by_index(7).is_none());
    }
}
