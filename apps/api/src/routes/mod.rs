pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/analyze",
            post(handlers::handle_analyze).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::TextGenerator;
    use crate::matching::pipeline::{MatchPipeline, PipelineSettings};
    use crate::matching::retry::RetryPolicy;
    use crate::matching::testing::{KeywordEmbedder, LexicalGenerator, ScriptedGenerator};

    const BOUNDARY: &str = "jobmatchr-test-boundary";
    const JD: &str = "Must have Python (3+ years)\nAWS experience is a plus";

    fn app_with(generator: Arc<dyn TextGenerator>, max_upload_bytes: usize) -> Router {
        let state = AppState {
            pipeline: Arc::new(MatchPipeline::new(
                Arc::new(KeywordEmbedder::default()),
                generator,
                PipelineSettings::default(),
            )),
            retry: RetryPolicy::default(),
        };
        build_router(state, max_upload_bytes)
    }

    fn app() -> Router {
        app_with(Arc::new(LexicalGenerator::default()), 1024 * 1024)
    }

    /// `(name, filename, content)` triples encoded as multipart/form-data.
    fn multipart(fields: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, filename, content) in fields {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice("\r\n".as_bytes());
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jobmatchr-api");
    }

    #[tokio::test]
    async fn test_analyze_cv_text() {
        let req = multipart(&[
            ("cv_text", None, "5 years experience in Python, AWS, Docker.".as_bytes()),
            ("jd_text", None, JD.as_bytes()),
        ]);
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matching_score"]["percentage"], 100);
        assert_eq!(body["requirements_breakdown"]["must_have_ratio"], "1/1");
        assert_eq!(body["requirements_breakdown"]["nice_to_have_ratio"], "1/1");
        assert!(body["radar_chart"]["Hard Skills"].is_i64());
    }

    #[tokio::test]
    async fn test_missing_jd_is_bad_request() {
        let req = multipart(&[("cv_text", None, "Python".as_bytes())]);
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_cv_is_bad_request() {
        let req = multipart(&[("jd_text", None, JD.as_bytes())]);
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_unprocessable() {
        let req = multipart(&[
            ("file", Some("cv.pdf"), "definitely not a pdf".as_bytes()),
            ("jd_text", None, JD.as_bytes()),
        ]);
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "DOCUMENT_READ_ERROR");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let app = app_with(Arc::new(ScriptedGenerator::unconfigured()), 1024 * 1024);
        let req = multipart(&[("cv_text", None, "Python".as_bytes()), ("jd_text", None, JD.as_bytes())]);
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_model_output_is_retryable_bad_gateway() {
        let generator = ScriptedGenerator::replying(vec![Ok("no json here".to_string())]);
        let app = app_with(Arc::new(generator), 1024 * 1024);
        let req = multipart(&[("cv_text", None, "Python".as_bytes()), ("jd_text", None, JD.as_bytes())]);
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "MALFORMED_OUTPUT");
        assert_eq!(body["error"]["retryable"], true);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let app = app_with(Arc::new(LexicalGenerator::default()), 64);
        let big = vec![b'a'; 4096];
        let req = multipart(&[("file", Some("cv.pdf"), big.as_slice()), ("jd_text", None, JD.as_bytes())]);
        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
