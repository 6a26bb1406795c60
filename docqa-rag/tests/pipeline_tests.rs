//! End-to-end tests for ingestion, querying and statistics.

mod common;

use std::sync::Arc;

use common::{
    BagOfWordsEmbedder, PoisonedEmbedder, RecordingGenerator, UnloadedGenerator, pipeline_with,
};
use docqa_rag::document::{SOURCE_KEY, SOURCE_TYPE_KEY};
use docqa_rag::{
    Metadata, MetadataFilter, MetadataValue, NO_CONTEXT_ANSWER, QueryOptions, RagConfig, RagError,
    Role, SourceType,
};

fn threshold(value: f32) -> QueryOptions {
    QueryOptions { relevance_threshold: Some(value), ..QueryOptions::default() }
}

#[tokio::test]
async fn empty_index_short_circuits_without_generation() {
    let generator = Arc::new(RecordingGenerator::new("should not be used"));
    let pipeline =
        pipeline_with(RagConfig::default(), Arc::new(BagOfWordsEmbedder), generator.clone()).await;

    let outcome = pipeline.query("What color is the sky?", &QueryOptions::default()).await.unwrap();

    assert_eq!(outcome.answer, NO_CONTEXT_ANSWER);
    assert_eq!(outcome.num_sources, 0);
    assert_eq!(outcome.sources, Some(Vec::new()));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn single_chunk_is_retrieved_and_reported() {
    let generator = Arc::new(RecordingGenerator::new("  The sky is blue.\n"));
    let pipeline =
        pipeline_with(RagConfig::default(), Arc::new(BagOfWordsEmbedder), generator.clone()).await;

    let ids = pipeline.ingest("The sky is blue.", "a.txt", SourceType::Text, None).await.unwrap();
    assert_eq!(ids.len(), 1);

    let outcome = pipeline.query("What color is the sky?", &threshold(0.0)).await.unwrap();

    assert_eq!(outcome.answer, "The sky is blue.");
    assert_eq!(outcome.num_sources, 1);
    let sources = outcome.sources.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].text, "The sky is blue.");
    assert_eq!(sources[0].metadata.get(SOURCE_KEY), Some(&MetadataValue::from("a.txt")));

    assert_eq!(generator.calls(), 1);
    let turns = generator.last_turns();
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[1].role, Role::User);
    assert!(turns[1].content.contains("[Document 1 - Source: a.txt]\nThe sky is blue."));
    assert!(turns[1].content.contains("Question: What color is the sky?"));
}

#[tokio::test]
async fn nothing_above_threshold_falls_back_to_one_result() {
    let generator = Arc::new(RecordingGenerator::new("answer"));
    let pipeline =
        pipeline_with(RagConfig::default(), Arc::new(BagOfWordsEmbedder), generator.clone()).await;

    pipeline.ingest("Cats purr when content.", "cats.txt", SourceType::Text, None).await.unwrap();
    pipeline.ingest("Dogs bark at strangers.", "dogs.txt", SourceType::Text, None).await.unwrap();
    pipeline.ingest("Birds sing at dawn.", "birds.txt", SourceType::Text, None).await.unwrap();

    // Relevance never exceeds 1.0, so nothing can clear this threshold.
    let outcome = pipeline.query("Why do cats purr?", &threshold(1.5)).await.unwrap();

    assert_eq!(outcome.num_sources, 1);
    assert_eq!(generator.calls(), 1);
    let sources = outcome.sources.unwrap();
    assert_eq!(sources[0].metadata.get(SOURCE_KEY), Some(&MetadataValue::from("cats.txt")));
}

#[tokio::test]
async fn sources_are_best_first_and_can_be_omitted() {
    let generator = Arc::new(RecordingGenerator::new("answer"));
    let pipeline =
        pipeline_with(RagConfig::default(), Arc::new(BagOfWordsEmbedder), generator.clone()).await;

    for (text, source) in [
        ("Rust has no garbage collector.", "rust.txt"),
        ("Rust ownership rules prevent data races.", "own.txt"),
        ("Bread needs flour and water.", "bread.txt"),
    ] {
        pipeline.ingest(text, source, SourceType::Text, None).await.unwrap();
    }

    let outcome = pipeline.query("Rust ownership rules", &threshold(-1.0)).await.unwrap();
    let sources = outcome.sources.unwrap();
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[0].metadata.get(SOURCE_KEY), Some(&MetadataValue::from("own.txt")));
    for pair in sources.windows(2) {
        assert!(pair[0].relevance_score >= pair[1].relevance_score);
    }

    let options = QueryOptions { return_sources: false, ..threshold(-1.0) };
    let outcome = pipeline.query("Rust ownership rules", &options).await.unwrap();
    assert_eq!(outcome.num_sources, 3);
    assert!(outcome.sources.is_none());
}

#[tokio::test]
async fn query_filter_restricts_context_to_matching_source() {
    let generator = Arc::new(RecordingGenerator::new("answer"));
    let pipeline =
        pipeline_with(RagConfig::default(), Arc::new(BagOfWordsEmbedder), generator.clone()).await;

    pipeline.ingest("The sky is blue.", "a.txt", SourceType::Text, None).await.unwrap();
    pipeline.ingest("The sky is grey in winter.", "b.txt", SourceType::Web, None).await.unwrap();

    let options = QueryOptions { filter: Some(MetadataFilter::source("b.txt")), ..threshold(0.0) };
    let outcome = pipeline.query("What color is the sky?", &options).await.unwrap();
    let sources = outcome.sources.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].metadata.get(SOURCE_KEY), Some(&MetadataValue::from("b.txt")));

    let options =
        QueryOptions { filter: Some(MetadataFilter::source("missing")), ..threshold(0.0) };
    let outcome = pipeline.query("What color is the sky?", &options).await.unwrap();
    assert_eq!(outcome.answer, NO_CONTEXT_ANSWER);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn ingest_tags_metadata_and_keeps_provenance() {
    let pipeline = pipeline_with(
        RagConfig::builder().chunk_size(20).chunk_overlap(5).build().unwrap(),
        Arc::new(BagOfWordsEmbedder),
        Arc::new(RecordingGenerator::new("answer")),
    )
    .await;

    let mut extra = Metadata::new();
    extra.insert("author".to_string(), "ada".into());
    extra.insert(SOURCE_KEY.to_string(), "spoofed".into());

    let text = "First sentence here. Second sentence here. Third sentence here.";
    let ids = pipeline.ingest(text, "doc.pdf", SourceType::Pdf, Some(&extra)).await.unwrap();
    assert!(ids.len() > 1);

    let documents = pipeline.list_documents().await.unwrap();
    assert_eq!(documents.len(), ids.len());
    for (i, document) in documents.iter().enumerate() {
        assert_eq!(document.id, ids[i]);
        assert_eq!(document.source(), Some("doc.pdf"));
        assert_eq!(document.metadata.get(SOURCE_TYPE_KEY), Some(&MetadataValue::from("pdf")));
        assert_eq!(document.metadata.get("author"), Some(&MetadataValue::from("ada")));
        assert_eq!(document.metadata.get("chunk_index"), Some(&MetadataValue::Int(i as i64)));
    }
}

#[tokio::test]
async fn statistics_collapse_duplicate_sources() {
    let pipeline = pipeline_with(
        RagConfig::default(),
        Arc::new(BagOfWordsEmbedder),
        Arc::new(RecordingGenerator::new("answer")),
    )
    .await;

    pipeline.ingest("alpha", "a.txt", SourceType::Text, None).await.unwrap();
    pipeline.ingest("beta", "a.txt", SourceType::Text, None).await.unwrap();
    pipeline.ingest("gamma", "b.txt", SourceType::Text, None).await.unwrap();

    let stats = pipeline.statistics().await.unwrap();
    assert_eq!(stats.total_documents, 3);
    assert_eq!(stats.unique_sources, 2);
    assert_eq!(stats.sources, vec!["a.txt".to_string(), "b.txt".to_string()]);

    assert_eq!(pipeline.delete_source("a.txt").await.unwrap(), 2);
    let stats = pipeline.statistics().await.unwrap();
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.sources, vec!["b.txt".to_string()]);

    pipeline.clear().await.unwrap();
    assert_eq!(pipeline.statistics().await.unwrap().total_documents, 0);
}

#[tokio::test]
async fn empty_text_is_rejected_without_side_effects() {
    let pipeline = pipeline_with(
        RagConfig::default(),
        Arc::new(BagOfWordsEmbedder),
        Arc::new(RecordingGenerator::new("answer")),
    )
    .await;

    let result = pipeline.ingest("", "a.txt", SourceType::Text, None).await;
    assert!(matches!(result, Err(RagError::EmptyInput)));
    assert_eq!(pipeline.count().await.unwrap(), 0);
}

#[tokio::test]
async fn embedding_failure_leaves_index_unchanged() {
    let pipeline = pipeline_with(
        RagConfig::builder().chunk_size(20).chunk_overlap(0).build().unwrap(),
        Arc::new(PoisonedEmbedder),
        Arc::new(RecordingGenerator::new("answer")),
    )
    .await;

    pipeline.ingest("clean text", "ok.txt", SourceType::Text, None).await.unwrap();

    let text = "clean first chunk.\n\nthen a POISON chunk";
    let result = pipeline.ingest(text, "bad.txt", SourceType::Text, None).await;
    assert!(matches!(result, Err(RagError::EmbeddingFailure { .. })));

    let stats = pipeline.statistics().await.unwrap();
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.sources, vec!["ok.txt".to_string()]);
}

#[tokio::test]
async fn generation_errors_propagate_unchanged() {
    let pipeline = pipeline_with(
        RagConfig::default(),
        Arc::new(BagOfWordsEmbedder),
        Arc::new(UnloadedGenerator),
    )
    .await;
    pipeline.ingest("The sky is blue.", "a.txt", SourceType::Text, None).await.unwrap();

    let result = pipeline.query("What color is the sky?", &QueryOptions::default()).await;
    assert!(matches!(result, Err(RagError::ModelUnavailable { .. })));
}

#[tokio::test]
async fn health_reports_backend_names() {
    let pipeline = pipeline_with(
        RagConfig::default(),
        Arc::new(BagOfWordsEmbedder),
        Arc::new(RecordingGenerator::new("answer")),
    )
    .await;

    let health = pipeline.health().await;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.vector_store_status, "healthy");
    assert_eq!(health.embedding_model, "bag-of-words");
    assert_eq!(health.generation_model, "recording");
}

#[tokio::test]
async fn builder_rejects_missing_components_and_bad_config() {
    let result = docqa_rag::RagPipeline::builder().build().await;
    assert!(matches!(result, Err(RagError::InvalidConfiguration(_))));

    let bad = RagConfig { chunk_overlap: 600, ..RagConfig::default() };
    let result = docqa_rag::RagPipeline::builder()
        .config(bad)
        .embedding_provider(Arc::new(BagOfWordsEmbedder))
        .vector_store(Arc::new(docqa_rag::InMemoryVectorStore::new()))
        .generation_provider(Arc::new(UnloadedGenerator))
        .build()
        .await;
    assert!(matches!(result, Err(RagError::InvalidConfiguration(_))));
}
