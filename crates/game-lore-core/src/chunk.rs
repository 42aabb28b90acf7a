//! Recursive, structure-aware text splitter.
//!
//! Splits document text into overlapping chunks of at most `chunk_size`
//! characters, preferring paragraph breaks, then line breaks, then
//! sentence ends, then spaces, and finally hard character cuts.
//!
//! # Algorithm
//!
//! 1. Pick the first separator (in priority order) that occurs in the text.
//! 2. Split on it, keeping the separator attached to the preceding piece.
//! 3. Pieces shorter than `chunk_size` are merged greedily into chunks;
//!    when a chunk is flushed, its trailing pieces (up to `chunk_overlap`
//!    characters) are carried over into the next chunk.
//! 4. Pieces that are too long are split recursively with the remaining
//!    separators.
//!
//! Lengths are measured in Unicode scalar values, not bytes.
//!
//! # Example
//!
//! ```rust
//! use game_lore_core::chunk::RecursiveSplitter;
//!
//! let splitter = RecursiveSplitter::new(400, 50);
//! let chunks = splitter.split("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks, vec!["Hello world.\n\nSecond paragraph.".to_string()]);
//! ```

use std::collections::VecDeque;

/// Default maximum chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// Default overlap carried between adjacent chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Separators in priority order. The empty separator means "cut anywhere".
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Splits text on structural boundaries into bounded, overlapping chunks.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl RecursiveSplitter {
    /// Create a splitter. `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks. Whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split_inclusive(separator)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }
            if !short_pieces.is_empty() {
                chunks.extend(self.merge(&short_pieces));
                short_pieces.clear();
            }
            if remaining.is_empty() {
                // Unsplittable: keep it whole.
                if let Some(trimmed) = non_empty_trimmed(&piece) {
                    chunks.push(trimmed);
                }
            } else {
                chunks.extend(self.split_with(&piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge(&short_pieces));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying an overlap tail forward.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(front) => total = total.saturating_sub(char_len(front)),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_window(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    non_empty_trimmed(&joined)
}

fn non_empty_trimmed(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Longest suffix of `a` that is also a prefix of `b`, in characters.
    fn overlap_len(a: &str, b: &str) -> usize {
        let b_chars: Vec<char> = b.chars().collect();
        let a_chars: Vec<char> = a.chars().collect();
        let max = a_chars.len().min(b_chars.len());
        (0..=max)
            .rev()
            .find(|&k| a_chars[a_chars.len() - k..] == b_chars[..k])
            .unwrap_or(0)
    }

    fn numbered_words(n: usize) -> String {
        (0..n)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = RecursiveSplitter::default().split("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_empty_and_blank_text() {
        let splitter = RecursiveSplitter::default();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   \n\n  ").is_empty());
    }

    #[test]
    fn test_chunks_are_length_bounded() {
        let text = numbered_words(500);
        let chunks = RecursiveSplitter::default().split(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(char_len(c) <= DEFAULT_CHUNK_SIZE, "chunk too long: {}", char_len(c));
        }
    }

    #[test]
    fn test_adjacent_overlap_bounded() {
        let text = numbered_words(500);
        let chunks = RecursiveSplitter::default().split(&text);
        for pair in chunks.windows(2) {
            let overlap = overlap_len(&pair[0], &pair[1]);
            assert!(overlap <= DEFAULT_CHUNK_OVERLAP, "overlap {} too large", overlap);
        }
        // Word-separated text should actually carry some context forward.
        assert!(overlap_len(&chunks[0], &chunks[1]) > 0);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let para_a = "a".repeat(250);
        let para_b = "b".repeat(250);
        let text = format!("{}\n\n{}", para_a, para_b);
        let chunks = RecursiveSplitter::default().split(&text);
        assert_eq!(chunks, vec![para_a, para_b]);
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let text = "x".repeat(1000);
        let chunks = RecursiveSplitter::default().split(&text);
        assert!(chunks.len() >= 3);
        for c in &chunks {
            assert!(char_len(c) <= DEFAULT_CHUNK_SIZE);
        }
    }

    #[test]
    fn test_multibyte_text_measured_in_chars() {
        let text = "é".repeat(399);
        let chunks = RecursiveSplitter::default().split(&text);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_all_text_is_covered() {
        let text = numbered_words(300);
        let chunks = RecursiveSplitter::new(100, 20).split(&text);
        for i in 0..300 {
            let word = format!("word{}", i);
            assert!(
                chunks.iter().any(|c| c.split(' ').any(|w| w == word)),
                "{} missing",
                word
            );
        }
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let splitter = RecursiveSplitter::new(10, 50);
        assert_eq!(splitter.chunk_overlap(), 9);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha. Beta gamma.\n\nDelta epsilon zeta.\nEta theta.";
        let splitter = RecursiveSplitter::new(20, 5);
        assert_eq!(splitter.split(text), splitter.split(text));
    }
}
