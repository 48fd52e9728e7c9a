//! Transport contract: envelope unwrapping, failure classification, and the
//! one-notification-per-failure rule, against an in-process mock server.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use review_console::transport::{Envelope, Notifier, Transport, TransportError};

async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

fn transport(base_url: &str, notifier: Notifier) -> Transport {
    Transport::new(base_url, Duration::from_secs(2), notifier).unwrap()
}

#[tokio::test]
async fn test_success_returns_unwrapped_data() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route(
            "/repos/7",
            get(|| async { Json(Envelope::ok(json!({"id": 7, "full_name": "octo/demo"}))) }),
        ),
    );
    let base = spawn_server(app).await;

    let transport = transport(&base, Notifier::log_only());
    let data: Value = transport.get("/repos/7").await.unwrap();

    // Callers never see the envelope, only its data field.
    assert_eq!(data["full_name"], "octo/demo");
    assert!(data.get("code").is_none());
}

#[tokio::test]
async fn test_application_error_is_classified_and_notified_once() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route(
            "/repos",
            get(|| async { Json(Envelope::<Value>::failure(1001, "repository already exists")) }),
        ),
    );
    let base = spawn_server(app).await;

    let (notifier, mut rx) = Notifier::channel();
    let transport = transport(&base, notifier);
    let err = transport.get::<Value>("/repos").await.unwrap_err();

    match err {
        TransportError::Application { code, message } => {
            assert_eq!(code, 1001);
            assert_eq!(message, "repository already exists");
        }
        other => panic!("expected application error, got {other:?}"),
    }

    let n = rx.recv().await.unwrap();
    assert_eq!(n.message, "repository already exists");
    assert!(rx.try_recv().is_err(), "exactly one notification expected");
}

#[tokio::test]
async fn test_http_500_uses_status_table() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route(
            "/reviews",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, String::new()) }),
        ),
    );
    let base = spawn_server(app).await;

    let (notifier, mut rx) = Notifier::channel();
    let transport = transport(&base, notifier);
    let err = transport.get::<Value>("/reviews").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(rx.recv().await.unwrap().message, "server error");
}

#[tokio::test]
async fn test_unlisted_status_falls_back_to_generic_message() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route(
            "/repos",
            get(|| async { (StatusCode::IM_A_TEAPOT, String::new()) }),
        ),
    );
    let base = spawn_server(app).await;

    let (notifier, mut rx) = Notifier::channel();
    let transport = transport(&base, notifier);
    let err = transport.get::<Value>("/repos").await.unwrap_err();

    assert_eq!(err.status(), Some(418));
    assert_eq!(rx.recv().await.unwrap().message, "request failed (418)");
}

#[tokio::test]
async fn test_timeout_classifies_as_network_error() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route(
            "/feedbacks/stats",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json(Envelope::ok(json!({})))
            }),
        ),
    );
    let base = spawn_server(app).await;

    let (notifier, mut rx) = Notifier::channel();
    let transport = Transport::new(&base, Duration::from_millis(100), notifier).unwrap();
    let err = transport.get::<Value>("/feedbacks/stats").await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(
        rx.recv().await.unwrap().message,
        "network error, check your connection"
    );
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Grab a free port, then close it again.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = transport(&format!("http://{addr}/api/v1"), Notifier::log_only());
    let err = transport.get::<Value>("/repos").await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn test_query_params_reach_the_server() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route(
            "/repos",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(Envelope::ok(json!({
                    "search": params.get("search"),
                    "page": params.get("page"),
                })))
            }),
        ),
    );
    let base = spawn_server(app).await;

    #[derive(serde::Serialize)]
    struct Params {
        page: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        search: Option<String>,
    }

    let transport = transport(&base, Notifier::log_only());
    let data: Value = transport
        .get_query(
            "/repos",
            &Params {
                page: 2,
                search: Some("octo".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(data["search"], "octo");
    assert_eq!(data["page"], "2");
}

#[tokio::test]
async fn test_delete_tolerates_null_data() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route(
            "/repos/7",
            delete(|| async { Json(json!({"code": 0, "message": "ok", "data": null})) }),
        ),
    );
    let base = spawn_server(app).await;

    let transport = transport(&base, Notifier::log_only());
    transport.delete("/repos/7").await.unwrap();
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let app = Router::new().nest(
        "/api/v1",
        Router::new().route("/repos", get(|| async { "not json" })),
    );
    let base = spawn_server(app).await;

    let transport = transport(&base, Notifier::log_only());
    let err = transport.get::<Value>("/repos").await.unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
}
