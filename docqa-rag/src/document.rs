//! Data types for chunks, indexed documents, search results and filters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata key holding the origin identifier of a chunk.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the [`SourceType`] of a chunk.
pub const SOURCE_TYPE_KEY: &str = "source_type";
/// Metadata key holding the 0-based position of a chunk within its ingestion call.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Metadata key holding the character offset of a chunk in its source text.
pub const START_INDEX_KEY: &str = "start_index";

/// A scalar metadata value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
}

impl MetadataValue {
    /// Return the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// False only for NaN or infinite floats.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(x) => x.is_finite(),
            _ => true,
        }
    }

    /// Equality that lets a string stand for the scalar it parses to, so
    /// `Str("2024")` matches `Int(2024)` and `Str("1.0")` matches `Float(1.0)`.
    /// Values of two different non-string types never match.
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(s), value) | (value, Self::Str(s)) => match value {
                Self::Str(t) => s == t,
                Self::Int(i) => s.trim().parse::<i64>().is_ok_and(|v| v == *i),
                Self::Float(x) => s.trim().parse::<f64>().is_ok_and(|v| v == *x),
                Self::Bool(b) => s.trim().parse::<bool>().is_ok_and(|v| v == *b),
            },
            _ => self == other,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Key-value metadata attached to chunks and documents.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// The kind of origin a piece of text was extracted from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Text extracted from a PDF file.
    Pdf,
    /// Text scraped from a web page.
    Web,
    /// Raw text supplied directly.
    Text,
}

impl SourceType {
    /// The tag stored in chunk metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Web => "web",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "web" => Ok(Self::Web),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown source type '{other}' (expected pdf, web or text)")),
        }
    }
}

/// A bounded span of source text with provenance metadata.
///
/// Produced by the chunker; not yet embedded or stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Dense 0-based position within the ingestion call that produced it.
    pub chunk_index: usize,
    /// Provenance metadata. Always carries `source` and `source_type`.
    pub metadata: Metadata,
}

impl Chunk {
    /// The `source` metadata value, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(MetadataValue::as_str)
    }
}

/// A stored [`Chunk`] with its system-assigned identifier and embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    /// Globally unique identifier, never reused.
    pub id: String,
    /// The text content.
    pub text: String,
    /// Metadata as supplied at insert time, plus `chunk_index`.
    pub metadata: Metadata,
    /// The vector embedding of `text`.
    pub embedding: Vec<f32>,
}

impl IndexedDocument {
    /// The `source` metadata value, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(MetadataValue::as_str)
    }
}

/// A search hit with its distance to the query vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    /// Identifier of the matching document.
    pub id: String,
    /// The text content of the matching document.
    pub text: String,
    /// Metadata of the matching document.
    pub metadata: Metadata,
    /// Cosine distance to the query (lower is closer).
    pub distance: f32,
    /// `1 - distance`. A similarity, not a probability; may be negative.
    pub relevance_score: f32,
}

impl ScoredResult {
    /// Build a result from a document and its distance to the query.
    pub fn new(document: &IndexedDocument, distance: f32) -> Self {
        Self {
            id: document.id.clone(),
            text: document.text.clone(),
            metadata: document.metadata.clone(),
            distance,
            relevance_score: 1.0 - distance,
        }
    }

    /// The `source` metadata value, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(MetadataValue::as_str)
    }
}

/// An exact-match equality filter over metadata fields.
///
/// A document matches when every field in the filter is present in its
/// metadata with an equal value, compared with [`MetadataValue::matches`].
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MetadataFilter {
    fields: Metadata,
}

impl MetadataFilter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on `source == value`.
    pub fn source(value: impl Into<String>) -> Self {
        Self::new().eq(SOURCE_KEY, value.into())
    }

    /// Require `key` to equal `value`.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Test a metadata map against the filter.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.fields
            .iter()
            .all(|(key, expected)| metadata.get(key).is_some_and(|actual| expected.matches(actual)))
    }
}

impl FromIterator<(String, MetadataValue)> for MetadataFilter {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}
