//! # API Server Module
//!
//! ## Purpose
//! REST API server for the legal QA engine: question answering, Q&A record
//! management, category listing, and document analysis.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with questions, records, document text
//! - **Output**: JSON responses with answers, confidence, records, analyses
//! - **Endpoints**: /api/legal-qa, /api/qa-pairs, /api/categories,
//!   /api/analyze-document, /health, /
//!
//! ## Key Features
//! - CORS support for web frontends
//! - Structured error responses (validation errors map to 400)
//! - TTL answer cache keyed on the normalized question
//! - Confidence reported as the winning similarity score

use crate::errors::{QaError, Result};
use crate::utils::{TextUtils, Timer};
use crate::AppState;
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reply used when neither the corpus nor the fallback produced an answer
const NO_ANSWER_REPLY: &str = "I apologize, but I couldn't find a suitable answer to your \
     question. Please try rephrasing your question or ask something else.";

/// The API server
pub struct ApiServer {
    app_state: AppState,
}

/// Question request payload
#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    /// Similarity threshold override; defaults to the configured operating
    /// point. The configured high-confidence threshold is a common choice.
    pub min_confidence: Option<f64>,
}

/// Question response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    /// The winning similarity score; 0.0 for fallback or no-match replies
    pub confidence: f64,
    /// Stored question that produced the answer, if any
    pub matched_question: Option<String>,
    /// "corpus", "fallback", or "none"
    pub source: String,
    pub query_time_ms: u64,
}

/// Record listing query parameters
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

/// New record payload
#[derive(Debug, Deserialize)]
pub struct AddPairRequest {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
}

/// Document analysis payload
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

/// TTL cache of computed answers, keyed on the normalized question and
/// threshold so different operating points never share entries.
pub struct AnswerCache {
    entries: DashMap<String, CachedAnswer>,
    ttl_seconds: u64,
    max_size: usize,
}

#[derive(Clone)]
struct CachedAnswer {
    response: AnswerResponse,
    timestamp: DateTime<Utc>,
}

impl AnswerCache {
    pub fn new(ttl_seconds: u64, max_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_seconds,
            max_size,
        }
    }

    fn key(normalized_question: &str, threshold: f64) -> String {
        format!("{:.3}|{}", threshold, normalized_question)
    }

    fn get(&self, key: &str) -> Option<AnswerResponse> {
        let entry = self.entries.get(key)?;
        let age = Utc::now().timestamp() - entry.timestamp.timestamp();
        if age < self.ttl_seconds as i64 {
            Some(entry.response.clone())
        } else {
            drop(entry);
            self.entries.remove(key);
            None
        }
    }

    fn insert(&self, key: String, response: AnswerResponse) {
        if self.entries.len() >= self.max_size {
            // Simple eviction: drop one arbitrary entry
            if let Some(victim) = self.entries.iter().next().map(|e| e.key().clone()) {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(
            key,
            CachedAnswer {
                response,
                timestamp: Utc::now(),
            },
        );
    }
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server
    pub async fn run(self) -> Result<()> {
        let config = self.app_state.config.clone();
        let bind_addr = format!("{}:{}", config.server.host, config.server.port);
        let cache = web::Data::new(AnswerCache::new(
            config.server.answer_cache_ttl_seconds,
            config.server.answer_cache_size,
        ));
        let app_state = self.app_state;

        tracing::info!("Starting API server on {}", bind_addr);

        HttpServer::new(move || {
            let cors = if app_state.config.server.enable_cors {
                build_cors(&app_state.config.server.cors_origins)
            } else {
                Cors::default()
            };

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(app_state.clone()))
                .app_data(cache.clone())
                .configure(routes)
        })
        .workers(config.server.workers)
        .bind(&bind_addr)
        .map_err(|e| QaError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run()
        .await
        .map_err(|e| QaError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Route table, shared between the server and handler tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/legal-qa", web::post().to(answer_question_handler))
        .route("/api/qa-pairs", web::get().to(list_pairs_handler))
        .route("/api/qa-pairs", web::post().to(add_pair_handler))
        .route("/api/categories", web::get().to(categories_handler))
        .route("/api/analyze-document", web::post().to(analyze_handler))
        .route("/health", web::get().to(health_handler))
        .route("/", web::get().to(index_handler));
}

fn build_cors(origins: &[String]) -> Cors {
    if origins.iter().any(|o| o == "*") {
        Cors::permissive()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .max_age(3600)
    }
}

/// Map an engine error to an HTTP response with a JSON `detail` body
fn error_response(err: &QaError) -> HttpResponse {
    if err.is_client_error() {
        HttpResponse::BadRequest().json(serde_json::json!({ "detail": err.to_string() }))
    } else {
        tracing::error!(category = err.category(), error = %err, "Request failed");
        HttpResponse::InternalServerError()
            .json(serde_json::json!({ "detail": err.to_string() }))
    }
}

/// Question answering endpoint handler
async fn answer_question_handler(
    app_state: web::Data<AppState>,
    cache: web::Data<AnswerCache>,
    request: web::Json<QuestionRequest>,
) -> ActixResult<HttpResponse> {
    let timer = Timer::new("answer_question");
    let request_id = Uuid::new_v4();
    let matching = &app_state.config.matching;

    if request.question.trim().is_empty() {
        return Ok(error_response(&QaError::InvalidQuestion {
            reason: "Question cannot be empty".to_string(),
        }));
    }
    if request.question.len() > matching.max_question_length {
        return Ok(error_response(&QaError::InvalidQuestion {
            reason: format!(
                "Question exceeds {} characters",
                matching.max_question_length
            ),
        }));
    }

    let threshold = request.min_confidence.unwrap_or(matching.default_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Ok(error_response(&QaError::ValidationFailed {
            field: "min_confidence".to_string(),
            reason: "Must be within [0, 1]".to_string(),
        }));
    }

    tracing::debug!(
        %request_id,
        question = %TextUtils::truncate(&request.question, 80),
        threshold,
        "Answering question"
    );

    let normalized = app_state.ranker.normalizer().normalize(&request.question);
    let cache_key = AnswerCache::key(&normalized, threshold);
    if let Some(mut cached) = cache.get(&cache_key) {
        cached.query_time_ms = timer.stop();
        return Ok(HttpResponse::Ok().json(cached));
    }

    let corpus = app_state.store.all_pairs().await;
    let matches = match app_state.ranker.rank(&request.question, &corpus, threshold) {
        Ok(matches) => matches,
        Err(e) => return Ok(error_response(&e)),
    };

    let response = if let Some(best) = matches.first() {
        AnswerResponse {
            answer: best.pair.answer.clone(),
            confidence: best.similarity,
            matched_question: Some(best.pair.question.clone()),
            source: "corpus".to_string(),
            query_time_ms: 0,
        }
    } else if let Some(fallback) = &app_state.fallback {
        match fallback.answer(&request.question).await {
            Ok(answer) => AnswerResponse {
                answer,
                confidence: 0.0,
                matched_question: None,
                source: "fallback".to_string(),
                query_time_ms: 0,
            },
            Err(e) => {
                // A fallback failure degrades to the canned reply
                tracing::warn!(%request_id, error = %e, "Generative fallback failed");
                AnswerResponse {
                    answer: NO_ANSWER_REPLY.to_string(),
                    confidence: 0.0,
                    matched_question: None,
                    source: "none".to_string(),
                    query_time_ms: 0,
                }
            }
        }
    } else {
        AnswerResponse {
            answer: NO_ANSWER_REPLY.to_string(),
            confidence: 0.0,
            matched_question: None,
            source: "none".to_string(),
            query_time_ms: 0,
        }
    };

    if response.source != "none" {
        cache.insert(cache_key, response.clone());
    }

    let mut response = response;
    response.query_time_ms = timer.stop();
    Ok(HttpResponse::Ok().json(response))
}

/// Record listing endpoint handler
async fn list_pairs_handler(
    app_state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> ActixResult<HttpResponse> {
    let matching = &app_state.config.matching;
    let limit = params.limit.unwrap_or(matching.default_limit);

    if limit > matching.max_limit {
        return Ok(error_response(&QaError::ValidationFailed {
            field: "limit".to_string(),
            reason: format!("limit must be between 1 and {}", matching.max_limit),
        }));
    }

    match app_state
        .store
        .list_pairs(params.category.as_deref(), limit)
        .await
    {
        Ok(qa_pairs) => {
            Ok(HttpResponse::Ok().json(serde_json::json!({ "qa_pairs": qa_pairs })))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// Record creation endpoint handler
async fn add_pair_handler(
    app_state: web::Data<AppState>,
    request: web::Json<AddPairRequest>,
) -> ActixResult<HttpResponse> {
    let category = request.category.as_deref().unwrap_or("general");

    match app_state
        .store
        .add_pair(&request.question, &request.answer, category)
        .await
    {
        Ok(added) => {
            if !added.persisted {
                tracing::warn!(id = added.pair.id, "Record saved in memory only");
            }
            Ok(HttpResponse::Created().json(serde_json::json!({
                "qa_pair": added.pair,
                "persisted": added.persisted,
            })))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

/// Category listing endpoint handler
async fn categories_handler(app_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let categories = app_state.store.list_categories().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "categories": categories })))
}

/// Document analysis endpoint handler
async fn analyze_handler(
    app_state: web::Data<AppState>,
    request: web::Json<AnalyzeRequest>,
) -> ActixResult<HttpResponse> {
    match app_state.analyzer.analyze(&request.text) {
        Ok(analysis) => Ok(HttpResponse::Ok().json(analysis)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "records": app_state.store.len().await,
        "fallback_enabled": app_state.fallback.is_some(),
    })))
}

/// Index page handler
async fn index_handler() -> ActixResult<HttpResponse> {
    let html = r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Legal QA Engine</title>
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .header { color: #2c3e50; }
            .endpoint { margin: 20px 0; padding: 15px; background: #f8f9fa; border-radius: 5px; }
            .method { font-weight: bold; color: #27ae60; }
        </style>
    </head>
    <body>
        <h1 class="header">Legal QA Engine API</h1>
        <p>Answers legal questions from a curated Q&amp;A corpus with string-similarity ranking.</p>

        <h2>Available Endpoints</h2>

        <div class="endpoint">
            <span class="method">POST</span> /api/legal-qa
            <p>Answer a legal question.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /api/qa-pairs
            <p>List Q&amp;A records, optionally filtered by category.</p>
        </div>

        <div class="endpoint">
            <span class="method">POST</span> /api/qa-pairs
            <p>Add a new Q&amp;A record.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /api/categories
            <p>List available categories.</p>
        </div>

        <div class="endpoint">
            <span class="method">POST</span> /api/analyze-document
            <p>Summarize and categorize document text.</p>
        </div>

        <h2>Example Question Request</h2>
        <pre>{
  "question": "What is the Constitution of India?",
  "min_confidence": 0.7
}</pre>
    </body>
    </html>
    "#;

    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DocumentAnalyzer;
    use crate::config::Config;
    use crate::matching::SimilarityRanker;
    use crate::store::{MemoryBackend, QaStore};
    use actix_web::{test, App};
    use std::sync::Arc;

    async fn test_state() -> AppState {
        let config = Arc::new(Config::default());
        let store = Arc::new(
            QaStore::open(Box::new(MemoryBackend::with_seed()))
                .await
                .unwrap(),
        );
        AppState {
            analyzer: Arc::new(DocumentAnalyzer::new(config.analysis.clone()).unwrap()),
            ranker: Arc::new(SimilarityRanker::new().unwrap()),
            fallback: None,
            store,
            config,
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(web::Data::new(AnswerCache::new(60, 100)))
                    .configure(routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn exact_question_answers_with_full_confidence() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::post()
            .uri("/api/legal-qa")
            .set_json(serde_json::json!({"question": "What is law?"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["source"], "corpus");
        assert_eq!(body["confidence"], 1.0);
        assert_eq!(body["matched_question"], "What is law?");
    }

    #[actix_web::test]
    async fn empty_question_is_bad_request() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::post()
            .uri("/api/legal-qa")
            .set_json(serde_json::json!({"question": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unmatched_question_degrades_to_no_answer() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::post()
            .uri("/api/legal-qa")
            .set_json(serde_json::json!({
                "question": "completely unrelated cooking recipe topic",
                "min_confidence": 0.9
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["source"], "none");
        assert_eq!(body["confidence"], 0.0);
    }

    #[actix_web::test]
    async fn listing_respects_limit() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::get()
            .uri("/api/qa-pairs?limit=1")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["qa_pairs"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn out_of_range_limit_is_bad_request() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::get()
            .uri("/api/qa-pairs?limit=500")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn add_pair_returns_created_record() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::post()
            .uri("/api/qa-pairs")
            .set_json(serde_json::json!({
                "question": "What is a writ of habeas corpus?",
                "answer": "A writ requiring a person under arrest to be brought before a court."
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["qa_pair"]["category"], "general");
        assert_eq!(body["persisted"], true);
    }

    #[actix_web::test]
    async fn categories_are_listed_sorted() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::get().uri("/api/categories").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let categories: Vec<String> = body["categories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
        assert!(categories.contains(&"constitutional_law".to_string()));
    }

    #[actix_web::test]
    async fn analyze_document_returns_summary_and_category() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::post()
            .uri("/api/analyze-document")
            .set_json(serde_json::json!({
                "text": "This agreement is a contract between the parties. Breach of the \
                         contract entitles the injured party to damages. Consideration \
                         flows from both sides."
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["category"], "contract_law");
        assert!(!body["summary"].as_str().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn health_reports_record_count() {
        let app = test_app!(test_state().await);
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["records"], 5);
    }
}
