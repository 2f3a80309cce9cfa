//! Upload-to-answer pipeline against offline providers.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{pdf, Fakes, BANANAS, DIMENSIONS, FRANCE};
use docqa_rag::config::{RagConfig, ReindexPolicy};
use docqa_rag::error::Error;
use docqa_rag::providers::EmbeddingProvider;
use docqa_rag::{ChatInterface, CollectionStore, DocumentProcessor, QueryEngine};

fn processor(config: RagConfig, fakes: &Fakes) -> (DocumentProcessor, CollectionStore) {
    let store = CollectionStore::in_memory().unwrap();
    let processor = DocumentProcessor::new(Arc::new(config), store.clone(), fakes.providers());
    (processor, store)
}

#[tokio::test]
async fn answers_from_the_uploaded_document() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);

    let processed = processor
        .process_document(&pdf("france.pdf", FRANCE), None)
        .await
        .unwrap();

    assert_eq!(processed.summary.collection, "collection_france");
    assert_eq!(processed.summary.chunks_indexed, 1);
    assert!(!processed.summary.already_indexed);
    assert_eq!(store.count("collection_france").unwrap(), 1);

    let response = processed
        .engine
        .query("What is the capital of France?")
        .await
        .unwrap();

    assert!(response.answer.contains("Paris"));
    assert_eq!(response.collection, "collection_france");
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].filename, "france.pdf");
    assert_eq!(response.sources[0].page_number, Some(1));
    assert_eq!(fakes.llm.calls(), 1);
}

#[tokio::test]
async fn collections_do_not_share_chunks() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);

    let france = processor
        .process_document(&pdf("france.pdf", FRANCE), None)
        .await
        .unwrap();
    let bananas = processor
        .process_document(&pdf("bananas.pdf", BANANAS), None)
        .await
        .unwrap();

    assert_eq!(store.list_collections().unwrap().len(), 2);

    let response = france.engine.query("What colour are bananas?").await.unwrap();
    assert!(response.sources.iter().all(|s| s.filename == "france.pdf"));
    assert!(!response.answer.contains("yellow"));

    let response = bananas.engine.query("What colour are bananas?").await.unwrap();
    assert!(response.answer.contains("yellow"));
}

#[tokio::test]
async fn retrieval_is_deterministic() {
    let mut config = common::test_config();
    config.chunking.chunk_size = 60;
    config.chunking.chunk_overlap = 10;

    let fakes = Fakes::default();
    let (processor, _) = processor(config, &fakes);
    let text = "Paris is the capital of France. Berlin is the capital of Germany. \
                Madrid is the capital of Spain. Rome is the capital of Italy. \
                Lisbon is the capital of Portugal.";

    let processed = processor
        .process_document(&pdf("capitals.pdf", text), None)
        .await
        .unwrap();
    assert!(processed.summary.chunks_indexed > 1);

    let first = processed.engine.retrieve("capital of Spain").await.unwrap();
    let second = processed.engine.retrieve("capital of Spain").await.unwrap();

    assert_eq!(first.len(), 3);
    let ids = |r: &[docqa_rag::types::ScoredChunk]| r.iter().map(|c| c.chunk.id).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(first.iter().any(|c| c.chunk.text.contains("Spain")));
}

#[tokio::test]
async fn blank_question_makes_no_calls() {
    let fakes = Fakes::default();
    let (processor, _) = processor(common::test_config(), &fakes);
    let processed = processor
        .process_document(&pdf("france.pdf", FRANCE), None)
        .await
        .unwrap();

    let result = processed.engine.query("   \n").await;

    assert!(matches!(result, Err(Error::EmptyQuestion)));
    assert_eq!(fakes.embedder.query_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fakes.llm.calls(), 0);
}

#[tokio::test]
async fn identical_reupload_is_deduplicated() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);
    let document = pdf("france.pdf", FRANCE);

    processor.process_document(&document, None).await.unwrap();
    let again = processor.process_document(&document, None).await.unwrap();

    assert!(again.summary.already_indexed);
    assert_eq!(again.summary.chunks_indexed, 0);
    assert_eq!(store.count("collection_france").unwrap(), 1);
    assert_eq!(fakes.embedder.document_calls.load(Ordering::SeqCst), 1);

    let response = again.engine.query("capital of France").await.unwrap();
    assert!(response.answer.contains("Paris"));
}

#[tokio::test]
async fn replace_policy_drops_previous_version() {
    let mut config = common::test_config();
    config.collections.reindex = ReindexPolicy::Replace;
    let fakes = Fakes::default();
    let (processor, store) = processor(config, &fakes);

    processor
        .process_document(&pdf("notes.pdf", FRANCE), None)
        .await
        .unwrap();
    let updated = processor
        .process_document(&pdf("notes.pdf", BANANAS), None)
        .await
        .unwrap();

    assert_eq!(store.count("collection_notes").unwrap(), 1);
    let response = updated.engine.query("capital of France").await.unwrap();
    assert!(response.sources.iter().all(|s| !s.text.contains("Paris")));
}

#[tokio::test]
async fn append_policy_keeps_every_upload() {
    let mut config = common::test_config();
    config.collections.reindex = ReindexPolicy::Append;
    let fakes = Fakes::default();
    let (processor, store) = processor(config, &fakes);
    let document = pdf("france.pdf", FRANCE);

    processor.process_document(&document, None).await.unwrap();
    processor.process_document(&document, None).await.unwrap();

    assert_eq!(store.count("collection_france").unwrap(), 2);
}

#[tokio::test]
async fn collection_override_is_sanitised() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);

    let processed = processor
        .process_document(&pdf("france.pdf", FRANCE), Some("My Docs!"))
        .await
        .unwrap();

    assert_eq!(processed.summary.collection, "My_Docs");
    assert_eq!(processed.engine.collection(), "My_Docs");
    assert_eq!(store.count("My_Docs").unwrap(), 1);
}

#[tokio::test]
async fn non_ascii_filenames_get_their_own_collections() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);

    let report = processor
        .process_document(&pdf("报告.pdf", FRANCE), None)
        .await
        .unwrap();
    let contract = processor
        .process_document(&pdf("契約.pdf", BANANAS), None)
        .await
        .unwrap();

    assert_ne!(report.summary.collection, contract.summary.collection);
    assert_eq!(store.list_collections().unwrap().len(), 2);

    let response = contract.engine.query("What colour are bananas?").await.unwrap();
    assert!(response.sources.iter().all(|s| s.filename == "契約.pdf"));
}

#[tokio::test]
async fn parse_failure_leaves_collection_untouched() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);

    processor
        .process_document(&pdf("france.pdf", FRANCE), None)
        .await
        .unwrap();
    let result = processor
        .process_document(&pdf("france.pdf", "CORRUPT"), None)
        .await;

    assert!(matches!(result, Err(Error::Parse { .. })));
    assert_eq!(store.count("collection_france").unwrap(), 1);
    assert_eq!(fakes.embedder.document_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn embedding_failure_during_indexing_changes_nothing() {
    let mut config = common::test_config();
    config.collections.reindex = ReindexPolicy::Replace;
    let fakes = Fakes::default();
    let (processor, store) = processor(config, &fakes);

    processor
        .process_document(&pdf("notes.pdf", FRANCE), None)
        .await
        .unwrap();
    fakes.embedder.fail.store(true, Ordering::SeqCst);

    let result = processor
        .process_document(&pdf("notes.pdf", BANANAS), None)
        .await;

    assert!(matches!(result, Err(Error::Embedding(_))));
    assert_eq!(store.count("collection_notes").unwrap(), 1);
}

#[tokio::test]
async fn malformed_embeddings_keep_the_previous_version() {
    let mut config = common::test_config();
    config.collections.reindex = ReindexPolicy::Replace;
    let fakes = Fakes::default();
    let (processor, store) = processor(config, &fakes);

    processor
        .process_document(&pdf("notes.pdf", FRANCE), None)
        .await
        .unwrap();
    fakes.embedder.short_vectors.store(true, Ordering::SeqCst);

    let result = processor
        .process_document(&pdf("notes.pdf", BANANAS), None)
        .await;

    assert!(matches!(result, Err(Error::EmbeddingMismatch(_))));
    assert_eq!(store.count("collection_notes").unwrap(), 1);
}

#[tokio::test]
async fn failed_first_upload_creates_no_collection() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);

    fakes.embedder.fail.store(true, Ordering::SeqCst);
    let result = processor.process_document(&pdf("fresh.pdf", FRANCE), None).await;
    assert!(matches!(result, Err(Error::Embedding(_))));

    fakes.embedder.fail.store(false, Ordering::SeqCst);
    fakes.embedder.short_vectors.store(true, Ordering::SeqCst);
    let result = processor.process_document(&pdf("fresh.pdf", FRANCE), None).await;
    assert!(matches!(result, Err(Error::EmbeddingMismatch(_))));

    assert!(store.list_collections().unwrap().is_empty());
}

#[tokio::test]
async fn engine_rejects_a_different_embedding_space() {
    let fakes = Fakes::default();
    let (processor, store) = processor(common::test_config(), &fakes);
    processor
        .process_document(&pdf("france.pdf", FRANCE), None)
        .await
        .unwrap();

    struct OtherEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for OtherEmbedder {
        async fn embed(&self, _text: &str) -> docqa_rag::Result<Vec<f32>> {
            Ok(vec![1.0; DIMENSIONS])
        }

        fn dimensions(&self) -> usize {
            DIMENSIONS
        }

        fn model(&self) -> &str {
            "some-other-model"
        }

        fn name(&self) -> &str {
            "other"
        }
    }

    let result = QueryEngine::open(
        store.clone(),
        "collection_france",
        Arc::new(OtherEmbedder),
        fakes.llm.clone(),
        &common::test_config().retrieval,
    );
    assert!(matches!(result, Err(Error::EmbeddingMismatch(_))));

    let result = QueryEngine::open(
        store,
        "missing",
        fakes.embedder.clone(),
        fakes.llm.clone(),
        &common::test_config().retrieval,
    );
    assert!(matches!(result, Err(Error::CollectionNotFound(_))));
}

async fn chat_engine(fakes: &Fakes) -> QueryEngine {
    let (processor, _) = processor(common::test_config(), fakes);
    processor
        .process_document(&pdf("france.pdf", FRANCE), None)
        .await
        .unwrap()
        .engine
}

#[tokio::test]
async fn chat_records_successful_exchanges() {
    let fakes = Fakes::default();
    let engine = chat_engine(&fakes).await;
    let mut chat = ChatInterface::new(0);

    let response = chat
        .process_user_input(&engine, "What is the capital of France?")
        .await
        .unwrap()
        .unwrap();

    assert!(response.answer.contains("Paris"));
    let transcript = chat.display();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].content, "What is the capital of France?");
    assert_eq!(transcript[1].content, response.answer);

    chat.clear_chat_history();
    assert!(chat.display().is_empty());
}

#[tokio::test]
async fn chat_failure_leaves_transcript_untouched() {
    let fakes = Fakes::default();
    let engine = chat_engine(&fakes).await;
    let mut chat = ChatInterface::new(0);

    chat.process_user_input(&engine, "capital of France?")
        .await
        .unwrap();
    fakes.llm.fail.store(true, Ordering::SeqCst);

    let result = chat.process_user_input(&engine, "And of Spain?").await;

    assert!(matches!(result, Err(Error::Llm(_))));
    assert_eq!(chat.len(), 2);
}

#[tokio::test]
async fn blank_chat_input_is_a_no_op() {
    let fakes = Fakes::default();
    let engine = chat_engine(&fakes).await;
    let mut chat = ChatInterface::new(0);

    let response = chat.process_user_input(&engine, "  ").await.unwrap();

    assert!(response.is_none());
    assert!(chat.is_empty());
    assert_eq!(fakes.embedder.query_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fakes.llm.calls(), 0);
}

#[tokio::test]
async fn chat_forwards_recent_turns_when_configured() {
    let fakes = Fakes::default();
    let engine = chat_engine(&fakes).await;
    let mut chat = ChatInterface::new(1);

    chat.process_user_input(&engine, "capital of France?")
        .await
        .unwrap();
    chat.process_user_input(&engine, "Is it big?").await.unwrap();
    chat.process_user_input(&engine, "Is it old?").await.unwrap();

    let prompts = fakes.llm.prompts.lock();
    assert!(!prompts[0].contains("Conversation so far"));
    assert!(prompts[1].contains("user: capital of France?"));
    assert!(prompts[1].contains("assistant: "));

    // One turn is the last question and its answer
    assert!(prompts[2].contains("user: Is it big?"));
    assert!(!prompts[2].contains("user: capital of France?"));
}
