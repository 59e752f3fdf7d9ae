//! Sliding-window text chunker.
//!
//! Splits document body text into [`Chunk`]s of at most `max_chars`
//! characters. Consecutive chunks overlap by `overlap_chars` characters so
//! that context spanning a chunk boundary is not lost.
//!
//! Each chunk receives a random UUID plus a SHA-256 hash of its text for
//! staleness detection.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Split text into overlapping chunks of at most `max_chars` characters.
/// Returns chunks with contiguous indices starting at 0; adjacent chunks
/// share exactly `overlap_chars` characters.
///
/// `overlap_chars` must be smaller than `max_chars` (enforced at config
/// load).
pub fn chunk_text(
    document_id: &str,
    text: &str,
    max_chars: usize,
    overlap_chars: usize,
) -> Vec<Chunk> {
    // Byte offsets of each char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    if total_chars <= max_chars {
        return vec![make_chunk(document_id, 0, text)];
    }

    let step = max_chars - overlap_chars;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_index: i64 = 0;

    loop {
        let end = (start + max_chars).min(total_chars);
        let piece = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(document_id, chunk_index, piece));
        chunk_index += 1;

        if end == total_chars {
            break;
        }
        start += step;
    }

    chunks
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("doc1", "Hello, world!", 2048, 64);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("doc1", "", 2048, 64);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_chunks_never_exceed_max_chars() {
        let text = "abcdefghij".repeat(100);
        let chunks = chunk_text("doc1", &text, 64, 8);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 64, "chunk too long: {}", c.text.len());
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        let text: String = ('a'..='z').cycle().take(500).collect();
        let overlap = 10;
        let chunks = chunk_text("doc1", &text, 100, overlap);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            let tail: String = prev[prev.len() - overlap..].iter().collect();
            let head: String = next[..overlap].iter().collect();
            assert_eq!(tail, head, "adjacent chunks must share {} chars", overlap);
        }
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = "x".repeat(5000);
        let chunks = chunk_text("doc1", &text, 128, 16);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64, "Index mismatch at position {}", i);
        }
    }

    #[test]
    fn test_multibyte_boundaries() {
        // Chars wider than one byte must not split mid-codepoint.
        let text = "héllö wörld ".repeat(50);
        let chunks = chunk_text("doc1", &text, 40, 5);
        let rebuilt: usize = chunks.iter().map(|c| c.text.chars().count()).sum();
        assert!(rebuilt >= text.chars().count());
        for c in &chunks {
            assert!(c.text.chars().count() <= 40);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha Beta Gamma Delta ".repeat(20);
        let c1 = chunk_text("doc1", &text, 50, 10);
        let c2 = chunk_text("doc1", &text, 50, 10);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
            assert_eq!(a.chunk_index, b.chunk_index);
        }
    }
}
