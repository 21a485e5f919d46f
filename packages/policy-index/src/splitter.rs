//! Recursive character text splitting.
//!
//! Text is cut on the coarsest separator it contains (paragraphs, then lines, then
//! sentences, then words), and the pieces are greedily packed back into chunks of at
//! most `chunk_size` characters with `chunk_overlap` characters carried between
//! neighbours. Separators stay attached to the start of the piece that follows them.

use tracing::warn;

use crate::types::{chunk_id, ChunkMetadata, PolicyChunk, PolicyPage};

/// Splits long documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            separators: ["\n\n", "\n", ".", " "].map(String::from).to_vec(),
        }
    }
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            ..Default::default()
        }
    }

    /// Split text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_with(text, &separators)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (pieces, finer): (Vec<&str>, &[&str]) =
            match separators.iter().position(|s| !s.is_empty() && text.contains(s)) {
                Some(i) => (split_keeping_separator(text, separators[i]), &separators[i + 1..]),
                None => (split_chars(text), &[]),
            };

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short));
                short.clear();
            }
            chunks.extend(self.split_with(piece, finer));
        }

        if !short.is_empty() {
            chunks.extend(self.merge(&short));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying an overlap tail forward.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        chunk_len = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }
                if !window.is_empty() {
                    push_trimmed(&mut chunks, &window);
                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                        let dropped = window.remove(0);
                        total -= char_len(dropped);
                    }
                }
            }

            window.push(piece);
            total += len;
        }

        push_trimmed(&mut chunks, &window);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, window: &[&str]) {
    let joined = window.concat();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split before every occurrence of `separator`. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn split_chars(text: &str) -> Vec<&str> {
    text.char_indices()
        .map(|(i, c)| &text[i..i + c.len_utf8()])
        .collect()
}

/// Split every page into chunks tagged with their source page and site.
///
/// Pages without content produce no chunks.
pub fn create_chunks(
    splitter: &RecursiveSplitter,
    site_url: &str,
    pages: &[PolicyPage],
) -> Vec<PolicyChunk> {
    pages
        .iter()
        .filter(|page| page.has_content())
        .flat_map(|page| {
            splitter
                .split_text(&page.content)
                .into_iter()
                .enumerate()
                .map(move |(ordinal, content)| PolicyChunk {
                    id: chunk_id(site_url, &page.url, ordinal, &content),
                    site_url: site_url.to_string(),
                    metadata: ChunkMetadata::new(page.url.clone(), site_url),
                    content,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = RecursiveSplitter::default();
        assert_eq!(splitter.split_text("  We never sell data.  "), vec!["We never sell data."]);
    }

    #[test]
    fn test_empty_text() {
        assert!(RecursiveSplitter::default().split_text("").is_empty());
        assert!(RecursiveSplitter::default().split_text(" \n\n ").is_empty());
    }

    #[test]
    fn test_paragraphs_are_packed() {
        let splitter = RecursiveSplitter::new(20, 0);
        let chunks = splitter.split_text("aaaa bbbb\n\ncccc dddd\n\neeee");
        assert_eq!(chunks, vec!["aaaa bbbb\n\ncccc dddd", "eeee"]);
    }

    #[test]
    fn test_overlap_carries_trailing_words() {
        let splitter = RecursiveSplitter::new(10, 5);
        let chunks = splitter.split_text("one two three four five");
        assert_eq!(chunks, vec!["one two", "two three", "four five"]);
    }

    #[test]
    fn test_long_piece_recurses_to_finer_separators() {
        let splitter = RecursiveSplitter::new(12, 0);
        let chunks = splitter.split_text("short line\nthis line is much longer.");
        assert_eq!(chunks, vec!["short line", "this line", "is much", "longer", "."]);
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let splitter = RecursiveSplitter::new(5, 0);
        assert_eq!(splitter.split_text("abcdefghij"), vec!["abcde", "fghij"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let splitter = RecursiveSplitter::default();
        let text = "We collect information you provide directly to us. ".repeat(60);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
    }

    #[test]
    fn test_multibyte_text() {
        let splitter = RecursiveSplitter::new(4, 0);
        assert_eq!(splitter.split_text("données"), vec!["donn", "ées"]);
    }

    #[test]
    fn test_create_chunks_tags_metadata() {
        let pages = vec![
            PolicyPage::new("https://a.com/privacy", "We collect email.\n\nWe share nothing."),
            PolicyPage::new("https://a.com/terms", ""),
        ];
        let chunks = create_chunks(&RecursiveSplitter::default(), "https://a.com/", &pages);

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.site_url, "https://a.com/");
        assert_eq!(chunk.metadata.source, "https://a.com/privacy");
        assert_eq!(chunk.metadata.domain, "https://a.com/");
        assert_eq!(
            chunk.id,
            chunk_id("https://a.com/", "https://a.com/privacy", 0, &chunk.content)
        );
    }
}
