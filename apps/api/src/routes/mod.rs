pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::recruiting::handlers as recruiting;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analysis", post(analysis::handle_analyze))
        .route("/api/v1/analysis/batch", post(analysis::handle_batch))
        .route(
            "/api/v1/analysis/batch/stream",
            post(analysis::handle_batch_stream),
        )
        .route("/api/v1/analysis/status", get(analysis::handle_status))
        .route(
            "/api/v1/analysis/environment",
            get(analysis::handle_environment),
        )
        // Jobs
        .route(
            "/api/v1/jobs",
            get(recruiting::handle_list_jobs).post(recruiting::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:id",
            get(recruiting::handle_get_job)
                .patch(recruiting::handle_update_job)
                .delete(recruiting::handle_delete_job),
        )
        // Candidates
        .route(
            "/api/v1/candidates",
            get(recruiting::handle_list_candidates).post(recruiting::handle_create_candidate),
        )
        .route(
            "/api/v1/candidates/:id",
            get(recruiting::handle_get_candidate)
                .patch(recruiting::handle_update_candidate)
                .delete(recruiting::handle_delete_candidate),
        )
        // Applications
        .route(
            "/api/v1/applications",
            get(recruiting::handle_list_applications)
                .post(recruiting::handle_create_application),
        )
        .route(
            "/api/v1/applications/:id",
            get(recruiting::handle_get_application)
                .patch(recruiting::handle_update_application)
                .delete(recruiting::handle_delete_application),
        )
        .route(
            "/api/v1/applications/:id/analyze",
            post(recruiting::handle_analyze_application),
        )
        // Interviews
        .route(
            "/api/v1/interviews",
            get(recruiting::handle_list_interviews).post(recruiting::handle_create_interview),
        )
        .route(
            "/api/v1/interviews/:id",
            get(recruiting::handle_get_interview)
                .patch(recruiting::handle_update_interview)
                .delete(recruiting::handle_delete_interview),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::analyzer::ResumeAnalyzer;
    use crate::analysis::batch::BatchCoordinator;
    use crate::analysis::testing::{model_reply, ScriptedModel};
    use crate::config::Config;

    /// State over a pool that never connects; only routes that stay off the
    /// database are exercised here.
    fn test_state(model: ScriptedModel, api_key: Option<&str>) -> AppState {
        let config = Config::for_tests(api_key);
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let analyzer = ResumeAnalyzer::new(Arc::new(model));
        AppState {
            db,
            config,
            batch: BatchCoordinator::new(analyzer.clone(), Duration::ZERO),
            analyzer,
        }
    }

    fn configured(model: ScriptedModel) -> Router {
        build_router(test_state(model, Some("AIzaSyExample123")))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = configured(ScriptedModel::new(Vec::new()))
            .oneshot(get("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "hirewise-api");
    }

    #[tokio::test]
    async fn test_analyze_returns_normalized_result() {
        let app = configured(ScriptedModel::new(vec![Ok(model_reply(81))]));
        let response = app
            .oneshot(post_json(
                "/api/v1/analysis",
                json!({"resumeText": "Jane Doe\nRust", "jobDescription": "Rust engineer"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["matchPercentage"], 81);
        assert!(body["weaknesses"].is_array());
        assert!(body["analysisTimestamp"].is_string());
        assert!(body.get("fallbackAnalysis").is_none());
    }

    #[tokio::test]
    async fn test_analyze_without_key_is_configuration_error() {
        let app = build_router(test_state(ScriptedModel::unconfigured(), None));
        let response = app
            .oneshot(post_json(
                "/api/v1/analysis",
                json!({"resumeText": "Rust", "jobDescription": "Rust"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_analyze_blank_resume_is_bad_request() {
        let response = configured(ScriptedModel::new(Vec::new()))
            .oneshot(post_json(
                "/api/v1/analysis",
                json!({"resumeText": "  ", "jobDescription": "Rust"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_batch_report() {
        let app = configured(ScriptedModel::always(model_reply(70)));
        let response = app
            .oneshot(post_json(
                "/api/v1/analysis/batch",
                json!({
                    "jobDescription": "React, Node, AWS",
                    "resumes": [
                        {"fileName": "a.pdf", "text": "React"},
                        {"fileName": "b.pdf", "text": ""},
                        {"fileName": "c.pdf", "text": "Node"}
                    ]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 3);
        assert_eq!(body["results"][1]["status"], "error");
        assert_eq!(body["results"][2]["fileName"], "c.pdf");
        assert_eq!(body["summary"]["successful"], 2);
        assert_eq!(body["summary"]["failed"], 1);
    }

    #[tokio::test]
    async fn test_batch_item_with_null_text_is_a_failed_item() {
        let app = configured(ScriptedModel::always(model_reply(70)));
        let response = app
            .oneshot(post_json(
                "/api/v1/analysis/batch",
                json!({
                    "jobDescription": "React, Node, AWS",
                    "resumes": [
                        {"fileName": "a.pdf", "text": "React"},
                        {"fileName": "b.pdf", "text": null},
                        {"fileName": "c.pdf", "text": "Node"}
                    ]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 3);
        assert_eq!(body["results"][1]["status"], "error");
        assert_eq!(body["summary"]["successful"], 2);
        assert_eq!(body["summary"]["failed"], 1);
    }

    #[tokio::test]
    async fn test_analyze_missing_field_is_validation_error() {
        let response = configured(ScriptedModel::new(Vec::new()))
            .oneshot(post_json(
                "/api/v1/analysis",
                json!({"jobDescription": "React"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Resume text is required");
    }

    #[tokio::test]
    async fn test_unreadable_bodies_are_validation_errors() {
        let app = configured(ScriptedModel::new(Vec::new()));
        let bodies = [
            ("/api/v1/analysis", Body::from("{\"resumeText\": ")),
            (
                "/api/v1/analysis",
                Body::from("{\"resumeText\": 42, \"jobDescription\": \"x\"}"),
            ),
            ("/api/v1/analysis/batch", Body::from("{\"resumes\": \"a.pdf\"}")),
            ("/api/v1/analysis/batch/stream", Body::from("\"a.pdf\"")),
            ("/api/v1/jobs", Body::from("not json")),
        ];

        for (uri, body) in bodies {
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_batch_without_resumes_is_bad_request() {
        let response = configured(ScriptedModel::new(Vec::new()))
            .oneshot(post_json(
                "/api/v1/analysis/batch",
                json!({"jobDescription": "Rust", "resumes": []}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch_stream_emits_progress_then_complete() {
        let app = configured(ScriptedModel::always(model_reply(65)));
        let response = app
            .oneshot(post_json(
                "/api/v1/analysis/batch/stream",
                json!({
                    "jobDescription": "React",
                    "resumes": [
                        {"fileName": "a.pdf", "text": "React"},
                        {"fileName": "b.pdf", "text": "Vue"}
                    ]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text.matches("event: progress").count(), 2);
        let complete_at = text.find("event: complete").unwrap();
        assert!(text.rfind("event: progress").unwrap() < complete_at);
        assert!(text.contains("\"successful\":2"));
    }

    #[tokio::test]
    async fn test_batch_stream_rejects_before_streaming() {
        let app = build_router(test_state(ScriptedModel::unconfigured(), None));
        let response = app
            .oneshot(post_json(
                "/api/v1/analysis/batch/stream",
                json!({"jobDescription": "React", "resumes": [{"fileName": "a.pdf", "text": "x"}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_status_and_environment_probes() {
        let app = build_router(test_state(ScriptedModel::unconfigured(), None));

        let status = app.clone().oneshot(get("/api/v1/analysis/status")).await.unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        let status = body_json(status).await;
        assert_eq!(status["configured"], false);
        assert!(status["lastChecked"].is_string());

        let env = app.oneshot(get("/api/v1/analysis/environment")).await.unwrap();
        let env = body_json(env).await;
        assert_eq!(env["isValid"], false);
        assert_eq!(env["errors"][0], "GEMINI_API_KEY is not set");
    }

    #[tokio::test]
    async fn test_create_job_validates_before_touching_database() {
        let response = configured(ScriptedModel::new(Vec::new()))
            .oneshot(post_json(
                "/api/v1/jobs",
                json!({"title": " ", "description": "Build things"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["message"], "title is required");
    }

    #[tokio::test]
    async fn test_create_interview_rejects_unknown_type() {
        let response = configured(ScriptedModel::new(Vec::new()))
            .oneshot(post_json(
                "/api/v1/interviews",
                json!({
                    "applicationId": "APP-000001",
                    "scheduledAt": "2026-03-02T14:00:00Z",
                    "interviewType": "telepathy"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
