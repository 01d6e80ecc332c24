use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use document_triage::error::{ExtractionError, IntelligenceError};
use document_triage::models::{CategoryContext, ConsolidationRequest};
use document_triage::services::{DocumentIntelligence, TextExtractor};
use document_triage::{build_router, AppState, BatchOrchestrator, Category, Classification, Config};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

const BOUNDARY: &str = "triage-test-boundary";

/// Uploaded bytes are the document text
struct PlainText;

impl TextExtractor for PlainText {
    fn extract(&self, _path: &Path, bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(String::from_utf8_lossy(bytes).trim().to_string())
    }
}

/// Picks the category from a keyword in the text
struct Keywords;

#[async_trait]
impl DocumentIntelligence for Keywords {
    async fn classify(&self, text: &str) -> Result<Classification, IntelligenceError> {
        let category = if text.contains("invoice") {
            Category::Payments
        } else if text.contains("contract") {
            Category::Legal
        } else {
            Category::General
        };
        Ok(Classification {
            category,
            confidence: 0.9,
            reasoning: "keyword".to_string(),
            subcategory: "Test".to_string(),
        })
    }

    async fn analyze(
        &self,
        text: &str,
        context: Option<&CategoryContext>,
    ) -> Result<Value, IntelligenceError> {
        Ok(json!({
            "document_type": "Test",
            "summary": text,
            "category": context.map(|c| c.category.as_str()),
            "subcategory": context.and_then(|c| c.subcategory.clone()),
        }))
    }

    async fn analyze_consolidated(
        &self,
        request: &ConsolidationRequest,
    ) -> Result<Value, IntelligenceError> {
        Ok(json!({
            "comprehensive_summary": format!("{} documents", request.file_info.len()),
            "key_findings": ["found"],
        }))
    }
}

fn app(config: Config) -> Router {
    let orchestrator = BatchOrchestrator::new(&config, Arc::new(PlainText), Arc::new(Keywords));
    let state = AppState::new(Arc::new(config), Arc::new(orchestrator));
    build_router(Arc::new(state))
}

fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, content) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(uri: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(files)))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = assert_ok!(response.into_body().collect().await).to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_and_root_report_ok() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_f64().unwrap() > 0.0);

    let request = Request::get("/").body(Body::empty()).unwrap();
    let (_, body) = send(app(Config::default()), request).await;
    assert_eq!(body["message"], "Document Analysis API");
}

#[tokio::test]
async fn unknown_path_lists_endpoints() {
    let request = Request::get("/nowhere").body(Body::empty()).unwrap();
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
    assert!(body["detail"].as_str().unwrap().contains("nowhere"));
    assert!(body["available_endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("/analyze-consolidated")));
}

#[tokio::test]
async fn analyze_returns_first_file_report() {
    let request = upload(
        "/analyze",
        &[("invoice.txt", b"invoice 42"), ("ignored.txt", b"contract")],
    );
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "invoice.txt");
    assert_eq!(body["status"], "success");
    assert_eq!(body["analysis"]["summary"], "invoice 42");
    assert_eq!(body["extracted_text"], "invoice 42");
}

#[tokio::test]
async fn analyze_without_files_is_bad_request() {
    let (status, body) = send(app(Config::default()), upload("/analyze", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No files provided");
}

#[tokio::test]
async fn analyze_with_blank_file_is_unprocessable() {
    let (status, body) = send(
        app(Config::default()),
        upload("/analyze", &[("blank.txt", b"   ")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("blank.txt"));
}

#[tokio::test]
async fn unsupported_type_rejects_whole_batch() {
    let request = upload(
        "/analyze-multiple",
        &[("ok.txt", b"invoice"), ("malware.exe", b"MZ")],
    );
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("malware.exe"));
}

#[tokio::test]
async fn analyze_multiple_embeds_failures() {
    let request = upload(
        "/analyze-multiple",
        &[("a.txt", b"invoice"), ("blank.txt", b""), ("c.txt", b"contract")],
    );
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files"], 3);
    assert_eq!(body["successful"], 2);
    assert_eq!(body["failed"], 1);

    let results = body["results"].as_array().unwrap();
    let names: Vec<&str> = results
        .iter()
        .map(|r| r["filename"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.txt", "blank.txt", "c.txt"]);
    assert_eq!(results[1]["status"], "failed");
    assert_eq!(results[1]["error_kind"], "no_text_extracted");
}

#[tokio::test]
async fn classify_documents_builds_channel_summary() {
    let request = upload(
        "/classify-documents",
        &[("a.txt", b"invoice"), ("b.txt", b"contract"), ("c.txt", b"invoice")],
    );
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["successful_classifications"], 3);
    assert_eq!(body["channel_summary"]["PAYMENTS"]["count"], 2);
    assert_eq!(body["channel_summary"]["LEGAL"]["count"], 1);
    assert_eq!(body["available_channels"], json!(["PAYMENTS", "LEGAL"]));
}

#[tokio::test]
async fn consolidated_flags_mixed_categories() {
    let request = upload(
        "/analyze-consolidated",
        &[("a.txt", b"invoice"), ("b.txt", b"contract")],
    );
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["successful_files"], 2);
    assert_eq!(body["category"], "PAYMENTS");
    assert_eq!(body["category_conflict"], true);
    assert_eq!(
        body["consolidated_analysis"]["comprehensive_summary"],
        "2 documents"
    );
}

#[tokio::test]
async fn consolidated_with_nothing_usable_is_unprocessable() {
    let request = upload(
        "/analyze-consolidated",
        &[("a.txt", b""), ("b.txt", b"  ")],
    );
    let (status, _) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn oversized_body_is_rejected_with_limits() {
    let config = Config {
        max_file_size_mb: 1,
        max_total_size_mb: 1,
        ..Config::default()
    };
    let big = vec![b'a'; 3 * 1024 * 1024];
    let request = upload("/analyze-multiple", &[("big.txt", &big)]);
    let (status, body) = send(app(config), request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["max_file_size_mb"], 1);
    assert_eq!(body["max_total_size_mb"], 1);
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let request = Request::post("/analyze-multiple")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn extra_file_is_rejected_before_its_body_is_read() {
    let config = Config {
        max_files_per_request: 2,
        ..Config::default()
    };
    // The third part never terminates; only its headers are available
    let mut body = multipart_body(&[("a.txt", b"invoice"), ("b.txt", b"contract")]);
    body.truncate(body.len() - format!("--{}--\r\n", BOUNDARY).len());
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"c.txt\"\r\n\r\npartial",
            BOUNDARY
        )
        .as_bytes(),
    );
    let request = Request::post("/analyze-multiple")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(app(config), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Maximum 2 files allowed per request (received 3)"
    );
}

#[tokio::test]
async fn oversized_file_is_rejected_while_streaming() {
    let config = Config {
        max_file_size_mb: 1,
        max_total_size_mb: 100,
        ..Config::default()
    };
    let big = vec![b'a'; 2 * 1024 * 1024];
    let request = upload("/analyze", &[("big.txt", &big)]);
    let (status, body) = send(app(config), request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["detail"].as_str().unwrap().contains("big.txt"));
    assert_eq!(body["max_file_size_mb"], 1);
}

#[tokio::test]
async fn category_form_field_steers_analysis() {
    let mut body = Vec::new();
    for (name, value) in [("category", "vat"), ("subcategory", "VAT Return Form")] {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(&multipart_body(&[("q1.txt", b"Q1 return")]));
    let request = Request::post("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(app(Config::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "q1.txt");
    assert_eq!(body["analysis"]["category"], "VAT");
    assert_eq!(body["analysis"]["subcategory"], "VAT Return Form");
}
