use std::sync::Arc;

use async_trait::async_trait;
use docqa_cli::cli::parse_key_value;
use docqa_cli::{Cli, Commands, run};
use docqa_rag::{
    EmbeddingProvider, GenerationProvider, InMemoryVectorStore, RagConfig, RagPipeline, Result,
    Turn,
};

const DIM: usize = 16;

/// Letter-frequency embedder, enough to make related text land close.
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn name(&self) -> &str {
        "letters"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; DIM];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            v[(c.to_ascii_lowercase() as usize) % DIM] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

struct EchoGenerator;

#[async_trait]
impl GenerationProvider for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, turns: &[Turn]) -> Result<String> {
        Ok(format!("  answered from {} turns  ", turns.len()))
    }
}

async fn pipeline(dir: &std::path::Path) -> RagPipeline {
    let config = RagConfig::builder().chunk_size(40).chunk_overlap(8).build().unwrap();
    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::persistent(dir).unwrap()))
        .generation_provider(Arc::new(EchoGenerator))
        .build()
        .await
        .unwrap()
}

fn command(args: &[&str]) -> Commands {
    let mut argv = vec!["docqa"];
    argv.extend_from_slice(args);
    <Cli as clap::Parser>::try_parse_from(argv).unwrap().command
}

#[tokio::test]
async fn ingest_then_query_and_delete_source() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("sky.txt");
    std::fs::write(&file, "The sky is blue on a clear day.\n\nGrass is green in spring.").unwrap();

    let rag = pipeline(&dir.path().join("store")).await;
    run(&rag, command(&["ingest", file.to_str().unwrap(), "--meta", "lang=en"]), false)
        .await
        .unwrap();

    let stats = rag.statistics().await.unwrap();
    assert!(stats.total_documents >= 2);
    assert_eq!(stats.sources, vec!["sky.txt".to_string()]);
    let first = &rag.list_documents().await.unwrap()[0];
    assert_eq!(first.metadata.get("lang"), Some(&parse_key_value("lang=en").unwrap().1));
    assert_eq!(first.metadata.get("source_type").and_then(|v| v.as_str()), Some("text"));

    run(&rag, command(&["query", "What color is the sky?", "--filter", "source=sky.txt"]), true)
        .await
        .unwrap();

    run(&rag, command(&["delete-source", "sky.txt"]), false).await.unwrap();
    assert_eq!(rag.count().await.unwrap(), 0);
}

#[tokio::test]
async fn ingested_chunks_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.md");
    std::fs::write(&file, "Rust has ownership and borrowing.").unwrap();
    let store = dir.path().join("store");

    {
        let rag = pipeline(&store).await;
        run(&rag, command(&["ingest", file.to_str().unwrap(), "--source", "Notes"]), false)
            .await
            .unwrap();
    }

    let reopened = pipeline(&store).await;
    assert_eq!(reopened.statistics().await.unwrap().sources, vec!["Notes".to_string()]);

    run(&reopened, command(&["clear"]), false).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_unknown_id_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let rag = pipeline(dir.path()).await;
    assert!(run(&rag, command(&["delete", "missing"]), false).await.is_err());
}

#[tokio::test]
async fn missing_input_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let rag = pipeline(dir.path()).await;
    let missing = dir.path().join("absent.txt");
    assert!(run(&rag, command(&["ingest", missing.to_str().unwrap()]), false).await.is_err());
}
