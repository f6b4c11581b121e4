//! HTTP router.
//!
//! Routes are nested under `/api/`. Layers (outermost first):
//! trace → CORS → body limit → handler.

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Room for multipart framing and the text parts on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Transport limit for a given upload ceiling.
///
/// Deliberately above the ceiling so oversized files reach the upload
/// gate and get its size error instead of a bare 413 from the transport.
pub fn body_limit_for(max_upload_bytes: u64) -> usize {
    usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX / 4)
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// CORS for the configured browser origins. Unparseable origins are
/// skipped with a warning; an empty list allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if parsed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Build the API router.
pub fn api_router(ctx: ApiContext, cors_origins: &[String]) -> Router {
    let body_limit = body_limit_for(ctx.profiles.max_upload_bytes());

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/analyze-report", post(endpoints::reports::analyze_report))
        .route("/analyze-xray", post(endpoints::reports::analyze_xray))
        .route("/report-fields", post(endpoints::reports::report_fields))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::types::Profiles;
    use crate::pipeline::analysis::{MockAnalysisProvider, ReportAnalyzer, SamplingParams};
    use crate::pipeline::extraction::{MockOcrProvider, TextExtractor};
    use crate::pipeline::translation::{MockTranslationProvider, SectionTranslator};
    use crate::pipeline::upload::ArtifactStore;
    use crate::pipeline::ReportProcessor;

    const BOUNDARY: &str = "diagno-test-boundary";

    const FIVE_SECTIONS: &str = "1. Symptoms:\nChest tightness\n\n2. Diagnosis:\nStable angina\n\n\
        3. Severity Level:\nModerate\n\n4. Treatment Recommendations:\nAvoid exertion\n\n\
        5. Recommended Specialist:\nCardiologist";

    struct TestApp {
        router: Router,
        ocr: Arc<MockOcrProvider>,
        _dir: tempfile::TempDir,
    }

    fn test_app(ocr_text: &str, max_upload: u64) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let ocr = Arc::new(MockOcrProvider::new(ocr_text));
        let processor = ReportProcessor::new(
            ArtifactStore::new(dir.path().join("uploads")),
            TextExtractor::new(ocr.clone(), "eng", Duration::from_secs(5)),
            ReportAnalyzer::new(
                Arc::new(MockAnalysisProvider::new(FIVE_SECTIONS)),
                SamplingParams::default(),
                Duration::from_secs(5),
            ),
            SectionTranslator::new(
                Arc::new(MockTranslationProvider::new()),
                "en",
                Duration::from_secs(5),
            ),
        );
        let ctx = ApiContext::new(Arc::new(processor), Profiles::with_max_upload(max_upload));
        TestApp {
            router: api_router(ctx, &["http://localhost:3000".to_string()]),
            ocr,
            _dir: dir,
        }
    }

    enum Part<'a> {
        File {
            name: &'a str,
            content_type: &'a str,
            bytes: &'a [u8],
        },
        Text(&'a str, &'a str),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::File {
                    name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).map_or(true, |mut d| d.next().is_none())
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = test_app("", 1024);
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "Diagno");
    }

    #[tokio::test]
    async fn analyze_report_returns_formatted_output() {
        let app = test_app("Chest tightness on exertion for two weeks.", 1024 * 1024);
        let request = upload_request(
            "/api/analyze-report",
            &[Part::File {
                name: "report.png",
                content_type: "image/png",
                bytes: b"fake png bytes",
            }],
        );

        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["formattedOutput"], FIVE_SECTIONS);
        assert_eq!(
            json["extractedText"],
            "Chest tightness on exertion for two weeks."
        );
        assert_eq!(json["recommendedSpecialist"], "Cardiologist");
        assert!(dir_is_empty(&app._dir.path().join("uploads")));
    }

    #[tokio::test]
    async fn language_part_translates_bodies() {
        let app = test_app("Chest tightness on exertion for two weeks.", 1024 * 1024);
        let request = upload_request(
            "/api/analyze-report",
            &[
                Part::Text("language", "hindi"),
                Part::File {
                    name: "report.jpg",
                    content_type: "image/jpeg",
                    bytes: b"jpeg",
                },
            ],
        );

        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["language"], "hi");
        let out = json["formattedOutput"].as_str().unwrap();
        assert!(out.contains("2. Diagnosis:\n[hi] Stable angina"));
    }

    #[tokio::test]
    async fn mode_xray_switches_profile() {
        let app = test_app("unused", 1024 * 1024);
        let request = upload_request(
            "/api/analyze-report",
            &[
                Part::Text("mode", "xray"),
                Part::File {
                    name: "wrist.png",
                    content_type: "image/png",
                    bytes: b"png",
                },
            ],
        );

        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("extractedText").is_none());
        assert_eq!(app.ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_file_is_400() {
        let app = test_app("unused", 1024);
        let request = upload_request("/api/analyze-xray", &[Part::Text("language", "tamil")]);
        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "NO_FILE");
    }

    #[tokio::test]
    async fn oversized_upload_is_413_from_the_gate() {
        let app = test_app("unused", 1024);
        let big = vec![0u8; 2048];
        let request = upload_request(
            "/api/analyze-report",
            &[Part::File {
                name: "big.png",
                content_type: "image/png",
                bytes: &big,
            }],
        );

        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["code"], "FILE_TOO_LARGE");
        assert!(json["error"].as_str().unwrap().contains("too large"));
        assert_eq!(app.ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn pdf_is_rejected_by_image_profiles() {
        let app = test_app("unused", 1024 * 1024);
        let request = upload_request(
            "/api/analyze-report",
            &[Part::File {
                name: "labs.pdf",
                content_type: "application/pdf",
                bytes: b"%PDF-1.4",
            }],
        );
        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json["code"], "UNSUPPORTED_TYPE");
    }

    #[tokio::test]
    async fn report_fields_returns_raw_analysis() {
        let app = test_app("Blood pressure: 120/80. Glucose: 95", 1024 * 1024);
        let request = upload_request(
            "/api/report-fields",
            &[Part::File {
                name: "labs.jpg",
                content_type: "image/jpeg",
                bytes: b"jpeg",
            }],
        );

        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        let out = json["formattedOutput"].as_str().unwrap();
        assert!(out.contains("- Blood Pressure: 120/80"));
        assert_eq!(json["rawAnalysis"]["tests"][0]["value"], "120/80");
    }

    #[tokio::test]
    async fn insufficient_text_is_422() {
        let app = test_app("tiny", 1024 * 1024);
        let request = upload_request(
            "/api/analyze-report",
            &[Part::File {
                name: "blank.png",
                content_type: "image/png",
                bytes: b"png",
            }],
        );
        let (status, json) = send(app.router, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["code"], "INSUFFICIENT_TEXT");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = test_app("", 1024);
        let response = app
            .router
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn body_limit_exceeds_upload_ceiling() {
        let limit = body_limit_for(5 * 1024 * 1024);
        assert!(limit > 5 * 1024 * 1024);
        assert_eq!(body_limit_for(u64::MAX), usize::MAX);
    }
}
