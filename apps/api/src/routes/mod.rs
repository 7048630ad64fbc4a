pub mod extract;
pub mod health;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::etp::handlers as etp;
use crate::knowledge::handlers as knowledge;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // ETP sessions
        .route("/api/v1/questions", get(etp::handle_questions))
        .route("/api/v1/sessions", post(etp::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(etp::handle_get_session).delete(etp::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/answers",
            post(etp::handle_submit_answers),
        )
        .route("/api/v1/sessions/:id/upload", post(etp::handle_upload))
        .route(
            "/api/v1/sessions/:id/analyses",
            get(etp::handle_list_analyses),
        )
        .route(
            "/api/v1/sessions/:id/preview",
            post(etp::handle_generate_preview).get(etp::handle_get_preview),
        )
        .route(
            "/api/v1/sessions/:id/preview/adjust",
            post(etp::handle_adjust_preview),
        )
        .route("/api/v1/sessions/:id/approve", post(etp::handle_approve))
        .route("/api/v1/sessions/:id/finalize", post(etp::handle_finalize))
        .route("/api/v1/sessions/:id/download", get(etp::handle_download))
        // Chat
        .route("/api/v1/chat/start", post(chat::handle_start_chat))
        .route("/api/v1/chat/message", post(chat::handle_message))
        .route("/api/v1/chat/topics", get(chat::handle_topics))
        .route("/api/v1/chat/:id/history", get(chat::handle_history))
        .route("/api/v1/chat/:id/end", post(chat::handle_end_chat))
        .route("/api/v1/chat/:id/clear", post(chat::handle_clear_history))
        // Knowledge base
        .route(
            "/api/v1/knowledge",
            post(knowledge::handle_add_entry).get(knowledge::handle_list_entries),
        )
        .route("/api/v1/knowledge/:id", delete(knowledge::handle_deactivate))
        .layer(body_limit)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::analysis::analyzer::testing::FixedAnalyzer;
    use crate::chat::ChatService;
    use crate::config::Config;
    use crate::etp::service::testing::{valid_answers, Harness, HarnessBuilder};
    use crate::knowledge::KnowledgeService;

    fn app(builder: HarnessBuilder) -> Router {
        let h = builder.build();
        let state = AppState {
            chat: Arc::new(ChatService::new(h.store.clone(), h.llm.clone())),
            knowledge: Arc::new(KnowledgeService::new(h.store.clone())),
            etp: Arc::new(h.service),
            config: Arc::new(Config::for_tests()),
        };
        build_router(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn multipart_request(uri: &str, filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --BOUNDARY--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, Method::POST, "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Harness::builder());
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["default_strategy"], "optimized");
    }

    #[tokio::test]
    async fn test_end_to_end_document_flow() {
        let app = app(Harness::builder());
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/answers"),
            Some(json!({ "answers": valid_answers() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "validated");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/preview"),
            Some(json!({ "strategy": "fast" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let preview = body["preview"].as_str().unwrap();
        assert!(preview.contains("1. INTRODUÇÃO"));
        assert!(preview.contains("14."));
        assert_eq!(body["strategy"], "fast");

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/approve"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/finalize"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["download_url"], format!("/api/v1/sessions/{id}/download"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/sessions/{id}/download"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            crate::render::DOCX_CONTENT_TYPE
        );

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["final_document_available"], true);
    }

    #[tokio::test]
    async fn test_incomplete_answers_return_missing_questions() {
        let app = app(Harness::builder());
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/answers"),
            Some(json!({ "answers": { "1": "Notebooks", "2": true } })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["missing_questions"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_out_of_order_stages_are_rejected() {
        let app = app(Harness::builder());
        let id = new_session(&app).await;

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/approve"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "PRECONDITION_FAILED");

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/preview"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app(Harness::builder());
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/sessions/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "NOT_FOUND");
    }

    async fn send_raw(
        app: &Router,
        method: Method,
        uri: &str,
        content_type: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_unparseable_ids_are_not_found() {
        let app = app(Harness::builder());
        for (method, uri) in [
            (Method::GET, "/api/v1/sessions/not-a-session"),
            (Method::POST, "/api/v1/sessions/123/approve"),
            (Method::GET, "/api/v1/chat/abc/history"),
            (Method::DELETE, "/api/v1/knowledge/abc"),
        ] {
            let (status, body) = send(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"]["kind"], "NOT_FOUND", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_bodies_use_error_envelope() {
        let app = app(Harness::builder());
        let id = new_session(&app).await;
        let answers_uri = format!("/api/v1/sessions/{id}/answers");

        let (status, body) =
            send_raw(&app, Method::POST, &answers_uri, "application/json", "{\"answers\": ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().contains("line"));

        let (status, body) =
            send_raw(&app, Method::POST, &answers_uri, "text/plain", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");

        let (status, body) = send_raw(
            &app,
            Method::POST,
            "/api/v1/chat/message",
            "application/json",
            "[1, 2]",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");

        let (status, body) = send_raw(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/upload"),
            "application/json",
            "{}",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");

        let (status, body) =
            send(&app, Method::GET, "/api/v1/questions?session_id=nope", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_strategy_is_validation_error() {
        let app = app(Harness::builder());
        let id = new_session(&app).await;
        send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/answers"),
            Some(json!({ "answers": valid_answers() })),
        )
        .await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/preview"),
            Some(json!({ "strategy": "turbo" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_auto_fills_answers() {
        let app = app(Harness::builder().analyzer(FixedAnalyzer::answering(&[("1", "X")])));
        let id = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(multipart_request(
                &format!("/api/v1/sessions/{id}/upload"),
                "termo.txt",
                "Termo de referencia de notebooks",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["auto_filled"], true);
        assert_eq!(body["extracted_answers"]["1"], "X");

        let (_, session) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(session["status"], "validated");
        assert_eq!(session["analyses"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_extension() {
        let app = app(Harness::builder());
        let id = new_session(&app).await;
        let response = app
            .clone()
            .oneshot(multipart_request(
                &format!("/api/v1/sessions/{id}/upload"),
                "planilha.xlsx",
                "a;b;c",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_gate_over_http() {
        let app = app(Harness::builder());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/chat/message",
            Some(json!({ "message": "Quero saber sobre jardinagem" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["topic_allowed"], false);

        let chat_id = body["session_id"].as_str().unwrap();
        let (status, history) = send(
            &app,
            Method::GET,
            &format!("/api/v1/chat/{chat_id}/history"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["history"].as_array().unwrap().len(), 3);

        let (_, topics) = send(&app, Method::GET, "/api/v1/chat/topics", None).await;
        assert_eq!(topics["examples"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_knowledge_upload_is_deduplicated() {
        let app = app(Harness::builder());
        let uri = "/api/v1/knowledge";

        let first = app
            .clone()
            .oneshot(multipart_request(uri, "modelo.txt", "Modelo de ETP"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .clone()
            .oneshot(multipart_request(uri, "copia.txt", "Modelo de ETP"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        let (_, entries) = send(&app, Method::GET, uri, None).await;
        assert_eq!(entries.as_array().unwrap().len(), 1);
        assert!(entries[0].get("content").is_none());
    }
}
