//! Deterministic test doubles for the embedding and generation ports.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa_rag::{
    EmbeddingProvider, GenerationProvider, InMemoryVectorStore, RagConfig, RagError, RagPipeline,
    Result, Turn,
};

pub const DIM: usize = 64;

/// Bag-of-words embedding: each lowercase word is hashed into one of `DIM`
/// buckets and the counts are L2-normalised. Texts sharing words are close.
pub struct BagOfWordsEmbedder;

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        v[(hash % DIM as u64) as usize] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    fn name(&self) -> &str {
        "bag-of-words"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(bag_of_words(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Embeds like [`BagOfWordsEmbedder`] but fails on any text containing `POISON`.
pub struct PoisonedEmbedder;

#[async_trait]
impl EmbeddingProvider for PoisonedEmbedder {
    fn name(&self) -> &str {
        "poisoned"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("POISON") {
            return Err(RagError::EmbeddingFailure {
                provider: "poisoned".into(),
                message: "inference failed".into(),
            });
        }
        Ok(bag_of_words(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Records every conversation it receives and replies with a fixed answer.
pub struct RecordingGenerator {
    reply: String,
    calls: AtomicUsize,
    last_turns: Mutex<Vec<Turn>>,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), calls: AtomicUsize::new(0), last_turns: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_turns(&self) -> Vec<Turn> {
        self.last_turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, turns: &[Turn]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_turns.lock().unwrap() = turns.to_vec();
        Ok(self.reply.clone())
    }
}

/// A model that is never loaded.
pub struct UnloadedGenerator;

#[async_trait]
impl GenerationProvider for UnloadedGenerator {
    fn name(&self) -> &str {
        "unloaded"
    }

    async fn generate(&self, _turns: &[Turn]) -> Result<String> {
        Err(RagError::ModelUnavailable {
            model: "unloaded".into(),
            message: "model not loaded".into(),
        })
    }
}

pub async fn pipeline_with(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generation_provider(generator)
        .build()
        .await
        .unwrap()
}
