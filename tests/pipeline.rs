use std::path::Path;
use std::sync::{Arc, Mutex};

use askpdf::{
    config::{Config, EmbeddingProvider, LlmProvider},
    document::Upload,
    embedding::{EmbeddingClient, EmbeddingClientError, HashEmbeddingClient},
    llm::{LlmClient, LlmClientError},
    processing::{PipelineError, QaApi, QaService},
    index::QueryError,
    router::{Capability, LlmSelector, RouterError, Selection, Selector},
};
use async_trait::async_trait;
use httpmock::{Method::POST, MockServer};
use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};
use serde_json::json;
use tempfile::TempDir;

/// Build a small PDF with one line of Courier text per page.
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

fn report_pdf() -> Vec<u8> {
    pdf_with_pages(&[
        "Quarterly report for the northern region.",
        "Revenue grew across every product line.",
        "The value on page three is 42.",
    ])
}

fn test_config(upload_dir: &Path) -> Arc<Config> {
    Arc::new(Config {
        upload_dir: Some(upload_dir.to_path_buf()),
        ..Config::default()
    })
}

fn leftover_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read upload dir").count()
}

/// Routes "summarize" questions to the summary engine and everything else to the vector engine.
struct KeywordSelector;

#[async_trait]
impl Selector for KeywordSelector {
    async fn select(
        &self,
        question: &str,
        choices: &[Capability],
    ) -> Result<Selection, RouterError> {
        assert_eq!(choices, Capability::ALL.as_slice());
        let capability = if question.to_lowercase().contains("summar") {
            Capability::Summary
        } else {
            Capability::Vector
        };
        Ok(Selection {
            capability,
            reason: "keyword".into(),
        })
    }
}

#[derive(Default)]
struct RecordingLlm {
    prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for RecordingLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        Ok(format!("  **Answer {}**\n", prompts.len()))
    }

    fn model(&self) -> &str {
        "recording"
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingClient for FailingEmbedder {
    async fn generate_embeddings(
        &self,
        _texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Err(EmbeddingClientError::Authentication(
            "API key not valid".into(),
        ))
    }
}

/// Rejects every prompt the way Gemini does for a bad key.
struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmClientError> {
        Err(LlmClientError::Authentication("status 403: API key not valid".into()))
    }

    fn model(&self) -> &str {
        "failing"
    }
}

fn stub_service(
    config: Arc<Config>,
    llm: Arc<RecordingLlm>,
    embedder: Arc<dyn EmbeddingClient>,
) -> QaService {
    QaService::with_components(config, llm, embedder, Arc::new(KeywordSelector))
        .expect("service")
}

#[tokio::test]
async fn summary_question_runs_only_the_summary_engine() {
    let uploads = TempDir::new().expect("tempdir");
    let llm = Arc::new(RecordingLlm::default());
    let service = stub_service(
        test_config(uploads.path()),
        llm.clone(),
        Arc::new(HashEmbeddingClient::new(64)),
    );

    let routed = service
        .ask(
            Upload::new("report.pdf", report_pdf()),
            "Summarize the document",
        )
        .await
        .expect("answer");

    assert_eq!(routed.selection.capability, Capability::Summary);
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1, "small document fits in one summary call");
    assert!(prompts[0].starts_with("Context information from multiple sources"));
    assert!(prompts[0].contains("page_label: 1"));
    assert!(prompts[0].contains("page_label: 3"));
    assert_eq!(routed.answer, "  **Answer 1**\n");
    assert_eq!(leftover_files(uploads.path()), 0);

    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.questions_answered, 1);
    assert_eq!(metrics.summary_routes, 1);
    assert_eq!(metrics.vector_routes, 0);
    assert!(metrics.chunks_indexed >= 3);
}

#[tokio::test]
async fn fact_question_uses_top_k_chunks_and_returns_answer_verbatim() {
    let uploads = TempDir::new().expect("tempdir");
    let llm = Arc::new(RecordingLlm::default());
    let service = stub_service(
        test_config(uploads.path()),
        llm.clone(),
        Arc::new(HashEmbeddingClient::new(64)),
    );

    let routed = service
        .ask(
            Upload::new("report.pdf", report_pdf()),
            "What is the value on page 3?",
        )
        .await
        .expect("answer");

    assert_eq!(routed.selection.capability, Capability::Vector);
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Context information is below."));
    assert_eq!(
        prompts[0].matches("page_label: ").count(),
        2,
        "default similarity_top_k is 2"
    );
    assert_eq!(routed.answer, "  **Answer 1**\n");
    assert_eq!(leftover_files(uploads.path()), 0);

    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.vector_routes, 1);
    assert_eq!(metrics.failures, 0);
}

#[tokio::test]
async fn embedding_failure_propagates_and_removes_temp_file() {
    let uploads = TempDir::new().expect("tempdir");
    let llm = Arc::new(RecordingLlm::default());
    let service = stub_service(
        test_config(uploads.path()),
        llm.clone(),
        Arc::new(FailingEmbedder),
    );

    let error = service
        .ask(Upload::new("report.pdf", report_pdf()), "Summarize it")
        .await
        .expect_err("embedding fails");

    assert!(matches!(
        error,
        PipelineError::Embedding(EmbeddingClientError::Authentication(_))
    ));
    assert!(error.to_string().contains("API key not valid"));
    assert!(llm.prompts().is_empty(), "no engine runs without indexes");
    assert_eq!(leftover_files(uploads.path()), 0);
    assert_eq!(service.metrics_snapshot().failures, 1);
}

#[tokio::test]
async fn engine_llm_failure_propagates_and_removes_temp_file() {
    let uploads = TempDir::new().expect("tempdir");
    let service = QaService::with_components(
        test_config(uploads.path()),
        Arc::new(FailingLlm),
        Arc::new(HashEmbeddingClient::new(64)),
        Arc::new(KeywordSelector),
    )
    .expect("service");

    let error = service
        .ask(
            Upload::new("report.pdf", report_pdf()),
            "What is the value on page 3?",
        )
        .await
        .expect_err("llm fails");

    assert!(matches!(
        &error,
        PipelineError::Routing(RouterError::Query {
            tool: "vector_tool",
            source: QueryError::Llm(LlmClientError::Authentication(_)),
        })
    ));
    assert!(error.to_string().contains("API key not valid"));
    assert_eq!(leftover_files(uploads.path()), 0);

    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.failures, 1);
    assert_eq!(metrics.questions_answered, 0);
}

#[tokio::test]
async fn selector_llm_failure_propagates_and_removes_temp_file() {
    let uploads = TempDir::new().expect("tempdir");
    let llm: Arc<dyn LlmClient> = Arc::new(FailingLlm);
    let service = QaService::with_components(
        test_config(uploads.path()),
        llm.clone(),
        Arc::new(HashEmbeddingClient::new(64)),
        Arc::new(LlmSelector::new(llm)),
    )
    .expect("service");

    let error = service
        .ask(Upload::new("report.pdf", report_pdf()), "Summarize the document")
        .await
        .expect_err("selection fails");

    assert!(matches!(
        error,
        PipelineError::Routing(RouterError::Selection(LlmClientError::Authentication(_)))
    ));
    assert_eq!(leftover_files(uploads.path()), 0);
    assert_eq!(service.metrics_snapshot().failures, 1);
}

#[tokio::test]
async fn non_pdf_upload_is_a_load_error() {
    let uploads = TempDir::new().expect("tempdir");
    let service = stub_service(
        test_config(uploads.path()),
        Arc::new(RecordingLlm::default()),
        Arc::new(HashEmbeddingClient::new(64)),
    );

    let error = service
        .ask(Upload::new("notes.pdf", b"plain text".to_vec()), "What is this?")
        .await
        .expect_err("not a pdf");

    assert!(matches!(error, PipelineError::Load(_)));
    assert!(error.to_string().contains("notes.pdf"));
    assert_eq!(leftover_files(uploads.path()), 0);
}

#[tokio::test]
async fn blank_question_is_rejected_before_reading_upload() {
    let uploads = TempDir::new().expect("tempdir");
    let llm = Arc::new(RecordingLlm::default());
    let service = stub_service(
        test_config(uploads.path()),
        llm.clone(),
        Arc::new(HashEmbeddingClient::new(64)),
    );

    let error = service
        .ask(Upload::new("report.pdf", report_pdf()), "   ")
        .await
        .expect_err("blank question");

    assert!(matches!(error, PipelineError::EmptyQuestion));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn gemini_backed_service_routes_through_selector_prompt() {
    let server = MockServer::start_async().await;
    let selector_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.0-flash:generateContent")
                .header("x-goog-api-key", "test-key")
                .body_contains("Some choices are given below");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "parts": [{
                        "text": "[{\"choice\": 2, \"reason\": \"asks for a specific value\"}]"
                    }] },
                    "finishReason": "STOP"
                }]
            }));
        })
        .await;
    let answer_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.0-flash:generateContent")
                .body_contains("Context information is below.");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "The value is 42." }] },
                    "finishReason": "STOP"
                }]
            }));
        })
        .await;

    let uploads = TempDir::new().expect("tempdir");
    let config = Arc::new(Config {
        google_api_key: Some("test-key".into()),
        llm_provider: LlmProvider::Gemini,
        llm_model: "gemini-2.0-flash".into(),
        embedding_provider: EmbeddingProvider::Hash,
        embedding_dimension: 32,
        gemini_base_url: server.base_url(),
        upload_dir: Some(uploads.path().to_path_buf()),
        ..Config::default()
    });
    let service = QaService::new(config).expect("service");

    let routed = service
        .ask(
            Upload::new("report.pdf", report_pdf()),
            "What is the value on page 3?",
        )
        .await
        .expect("answer");

    selector_mock.assert_async().await;
    answer_mock.assert_async().await;
    assert_eq!(routed.selection.capability, Capability::Vector);
    assert_eq!(routed.selection.reason, "asks for a specific value");
    assert_eq!(routed.answer, "The value is 42.");
    assert_eq!(leftover_files(uploads.path()), 0);
}
