//! Recursive character splitter.
//!
//! Splits text on an ordered separator preference (paragraph break first,
//! language-aware boundaries, then line and sentence breaks) into chunks of
//! a bounded character count, with adjacent chunks overlapping so no concept
//! is severed without shared context. Input no longer than the chunk size
//! comes back as a single chunk equal to the input text.

use std::collections::VecDeque;

/// Separator preference for source code.
pub const CODE_SEPARATORS: [&str; 6] = ["\n\n", "\nclass ", "\npublic ", "\n}", "\n", "."];

/// Separator preference for documentation text.
pub const DOC_SEPARATORS: [&str; 6] = ["\n\n", "\n", ".", "!", "?", " "];

pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: &[&str]) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Splitter tuned for source code; Java and XML files carry longer
    /// constructs and get a larger chunk size.
    #[must_use]
    pub fn for_code(language: &str) -> Self {
        let chunk_size = if language == "java" || language == "xml" {
            1500
        } else {
            1200
        };
        Self::new(chunk_size, 250, &CODE_SEPARATORS)
    }

    /// Splitter tuned for documentation prose.
    #[must_use]
    pub fn for_docs() -> Self {
        Self::new(800, 100, &DOC_SEPARATORS)
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let pieces = match separator {
            Some(sep) => split_keep_separator(text, sep),
            None => vec![text.to_string()],
        };

        let mut chunks = Vec::new();
        let mut mergeable: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                mergeable.push(piece);
                continue;
            }

            if !mergeable.is_empty() {
                chunks.extend(self.merge(&mergeable));
                mergeable.clear();
            }

            if remaining.is_empty() {
                chunks.extend(self.split_fixed(&piece));
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !mergeable.is_empty() {
            chunks.extend(self.merge(&mergeable));
        }

        chunks
    }

    /// Greedily pack pieces into chunks up to the size bound, carrying a
    /// trailing window of up to `chunk_overlap` characters into the next
    /// chunk. Separators are already attached to pieces, so joining is
    /// plain concatenation.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = char_len(piece);

            if total + piece_len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);

                while total > self.chunk_overlap
                    || (total + piece_len > self.chunk_size && total > 0)
                {
                    if let Some(front) = window.pop_front() {
                        total -= char_len(front);
                    } else {
                        break;
                    }
                }
            }

            window.push_back(piece);
            total += piece_len;
        }

        if !window.is_empty() {
            push_joined(&mut chunks, &window);
        }

        chunks
    }

    /// Last resort: fixed-size windows stepping by size minus overlap.
    fn split_fixed(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let piece: String = chars[start..end].iter().collect();
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&String>) {
    let joined: String = window.iter().map(|s| s.as_str()).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// First separator present in the text, plus the lower-priority rest.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (Option<&'a str>, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if text.contains(sep.as_str()) {
            return (Some(sep), &separators[i + 1..]);
        }
    }
    (None, &[])
}

/// Split on a separator, keeping the separator attached to the front of the
/// following piece so concatenation reconstructs the input.
fn split_keep_separator(text: &str, sep: &str) -> Vec<String> {
    let mut boundaries: Vec<usize> = text.match_indices(sep).map(|(i, _)| i).collect();
    boundaries.push(text.len());

    let mut pieces = Vec::new();
    let mut prev = 0;
    for boundary in boundaries {
        if boundary > prev {
            pieces.push(text[prev..boundary].to_string());
        }
        prev = boundary;
    }
    if prev < text.len() {
        pieces.push(text[prev..].to_string());
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_single_exact_chunk() {
        let splitter = TextSplitter::new(500, 100, &DOC_SEPARATORS);
        let text = "# Title\n\nA short paragraph.\n";
        let chunks = splitter.split(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text, "under-threshold input is returned verbatim");
    }

    #[test]
    fn test_empty_and_whitespace() {
        let splitter = TextSplitter::for_docs();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   \n\n  \n").is_empty());
    }

    #[test]
    fn test_chunks_bounded() {
        let para = "Sentence one here. ".repeat(20);
        let text = vec![para; 10].join("\n\n");
        let splitter = TextSplitter::new(500, 100, &DOC_SEPARATORS);

        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 500,
                "chunk exceeds bound: {}",
                chunk.chars().count()
            );
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_adjacent_chunks_overlap() {
        let paragraphs: Vec<String> = (0..40).map(|i| format!("paragraph number {i:02}")).collect();
        let text = paragraphs.join("\n\n");
        let splitter = TextSplitter::new(120, 60, &DOC_SEPARATORS);

        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(20).collect::<Vec<_>>().iter().rev().collect();
            assert!(
                pair[1].contains(tail.trim()),
                "next chunk should share trailing context: {:?} / {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_code_separator_preference() {
        let body = "x = compute(); ".repeat(60);
        let text = format!("public class A {{ {body} }}\npublic class B {{ {body} }}\n");
        let splitter = TextSplitter::for_code("java");
        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 2, "two large classes split apart");
    }

    #[test]
    fn test_no_separator_fixed_split() {
        let text = "x".repeat(2000);
        let splitter = TextSplitter::new(500, 100, &DOC_SEPARATORS);
        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }
    }

    #[test]
    fn test_japanese_text() {
        let text = "これは日本語のテストです。".repeat(200);
        let splitter = TextSplitter::for_docs();
        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 2);
        for chunk in chunks {
            assert!(!chunk.is_empty());
        }
    }
}
