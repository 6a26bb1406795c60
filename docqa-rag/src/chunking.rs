//! Recursive, separator-driven text chunking.
//!
//! [`RecursiveChunker`] splits text hierarchically. Separators are tried from
//! coarsest (paragraph break) to finest (the empty separator, which yields
//! single characters). A segment that fits in `chunk_size` is accepted as is;
//! a longer one is split again with the next finer separator. Accepted
//! segments are then merged greedily into chunks as close to `chunk_size` as
//! possible, and each chunk starts with up to `chunk_overlap` trailing
//! characters of its predecessor, cut at segment boundaries.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text is never
//! split inside a code point.

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::{DEFAULT_SEPARATORS, RagConfig, validate_chunking};
use crate::document::{CHUNK_INDEX_KEY, Chunk, Metadata, MetadataValue, START_INDEX_KEY};
use crate::error::{RagError, Result};

/// A strategy for splitting text into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no
/// embeddings. Embeddings are attached when the chunks are indexed.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks, each inheriting `metadata` plus
    /// `chunk_index` and `start_index`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if `text` has no content.
    fn chunk(&self, text: &str, metadata: &Metadata) -> Result<Vec<Chunk>>;
}

/// A chunk's text together with its character offset in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// Offset of the first character of `text`, counted in chars.
    pub start: usize,
    /// The chunk text.
    pub text: String,
}

/// Splits text hierarchically by a prioritized separator list.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(512, 100)?;
/// let chunks = chunker.split("First paragraph.\n\nSecond paragraph.")?;
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

impl RecursiveChunker {
    /// Create a chunker with the default separators
    /// (`"\n\n"`, `"\n"`, `". "`, `" "`, `""`).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_separators(chunk_size, chunk_overlap, DEFAULT_SEPARATORS)
    }

    /// Create a chunker with a custom separator priority list.
    ///
    /// The empty separator is appended when missing so that splitting always
    /// terminates at single characters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn with_separators<I, S>(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_chunking(chunk_size, chunk_overlap)?;
        let mut separators: Vec<String> = separators.into_iter().map(Into::into).collect();
        if separators.last().is_none_or(|s| !s.is_empty()) {
            separators.retain(|s| !s.is_empty());
            separators.push(String::new());
        }
        Ok(Self { chunk_size, chunk_overlap, separators })
    }

    /// Create a chunker from the chunking fields of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::with_separators(
            config.chunk_size,
            config.chunk_overlap,
            config.separators.iter().cloned(),
        )
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Separators in the order they are tried.
    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    /// Split `text` into chunk strings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if `text` is empty or whitespace only.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.split_spans(text)?.into_iter().map(|span| span.text).collect())
    }

    /// Split `text` into chunks, keeping each chunk's character offset.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if `text` is empty or whitespace only.
    pub fn split_spans(&self, text: &str) -> Result<Vec<TextSpan>> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyInput);
        }

        let mut ranges = Vec::new();
        self.split_range(text, 0..text.len(), 0, &mut ranges);

        // Ranges come out in non-decreasing start order, so char offsets can
        // be counted incrementally.
        let mut spans = Vec::with_capacity(ranges.len());
        let (mut byte_pos, mut char_pos) = (0, 0);
        for range in ranges {
            char_pos += text[byte_pos..range.start].chars().count();
            byte_pos = range.start;
            spans.push(TextSpan { start: char_pos, text: text[range].to_string() });
        }
        Ok(spans)
    }

    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        level: usize,
        out: &mut Vec<Range<usize>>,
    ) {
        let separator = self.separators.get(level).map(String::as_str).unwrap_or("");
        let pieces = split_keeping_separator(text, range, separator);

        let mut accepted: Vec<Piece> = Vec::new();
        for piece in pieces {
            if piece.chars <= self.chunk_size {
                accepted.push(piece);
            } else {
                self.merge(&accepted, out);
                accepted.clear();
                self.split_range(text, piece.start..piece.end, level + 1, out);
            }
        }
        self.merge(&accepted, out);
    }

    /// Greedily merge contiguous pieces into chunks of at most `chunk_size`
    /// characters, carrying at most `chunk_overlap` trailing characters into
    /// the next chunk.
    fn merge(&self, pieces: &[Piece], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            if total + piece.chars > self.chunk_size && !window.is_empty() {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    out.push(first.start..last.end);
                }
                while total > self.chunk_overlap
                    || (total + piece.chars > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(dropped) => total -= dropped.chars,
                        None => break,
                    }
                }
            }
            window.push_back(*piece);
            total += piece.chars;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            out.push(first.start..last.end);
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str, metadata: &Metadata) -> Result<Vec<Chunk>> {
        let spans = self.split_spans(text)?;
        Ok(spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let mut metadata = metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), MetadataValue::from(i));
                metadata.insert(START_INDEX_KEY.to_string(), MetadataValue::from(span.start));
                Chunk { text: span.text, chunk_index: i, metadata }
            })
            .collect())
    }
}

/// Split `text[range]` at `separator`, keeping the separator attached to the
/// preceding piece. The empty separator yields one piece per character.
fn split_keeping_separator(text: &str, range: Range<usize>, separator: &str) -> Vec<Piece> {
    let segment = &text[range.clone()];
    let base = range.start;

    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| Piece { start: base + i, end: base + i + c.len_utf8(), chars: 1 })
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(pos) = segment[start..].find(separator) {
        let end = start + pos + separator.len();
        let chars = segment[start..end].chars().count();
        pieces.push(Piece { start: base + start, end: base + end, chars });
        start = end;
    }
    if start < segment.len() {
        pieces.push(Piece {
            start: base + start,
            end: base + segment.len(),
            chars: segment[start..].chars().count(),
        });
    }
    pieces
}
