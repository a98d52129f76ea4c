mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use support::StubHost;
use ticketing_plugin::ticket_router;
use tower::ServiceExt;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse body json")
}

#[tokio::test]
async fn host_connection_failures_map_to_internal_errors() {
    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(get_request("/projects/demo/tickets/7"))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let value = body_json(response.into_body()).await;
    assert_eq!(value["error"], "InternalError");
}

#[tokio::test]
async fn rejected_projects_map_to_validation_errors() {
    let router = ticket_router(Arc::new(StubHost::rejecting("unknown project 'demo'")));
    let response = router
        .oneshot(get_request("/projects/demo/tickets"))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = body_json(response.into_body()).await;
    assert_eq!(value["error"], "ValidationError");
    assert_eq!(value["message"], "validation error: unknown project 'demo'");
}

#[tokio::test]
async fn update_bodies_cannot_smuggle_status_changes() {
    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(json_request(
            Method::PUT,
            "/projects/demo/tickets/7",
            json!({"status": "done"}),
        ))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = body_json(response.into_body()).await;
    assert_eq!(value["error"], "ValidationError");
    assert!(value["message"].as_str().is_some_and(|m| m.contains("status")));
}

#[tokio::test]
async fn update_bodies_may_attribute_the_change() {
    // changed_by is peeled off before the strict field decode, so a body
    // carrying it passes validation and reaches the host boundary.
    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(json_request(
            Method::PUT,
            "/projects/demo/tickets/7",
            json!({"title": "renamed", "changed_by": "sam"}),
        ))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(json_request(
            Method::PUT,
            "/projects/demo/tickets/7",
            json!({"title": "renamed", "changed_by": 42}),
        ))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = body_json(response.into_body()).await;
    assert_eq!(value["error"], "ValidationError");
    assert!(value["message"]
        .as_str()
        .is_some_and(|m| m.contains("changed_by")));
}

#[tokio::test]
async fn malformed_create_bodies_are_validation_errors() {
    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(json_request(
            Method::POST,
            "/projects/demo/tickets",
            json!({"type": "task"}),
        ))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = body_json(response.into_body()).await;
    assert_eq!(value["error"], "ValidationError");
}

#[tokio::test]
async fn move_bodies_require_a_status() {
    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(json_request(
            Method::POST,
            "/projects/demo/tickets/7/move",
            json!({"changed_by": "sam"}),
        ))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_requires_a_query_parameter() {
    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(get_request("/projects/demo/tickets/search"))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn path_ids_must_be_integers() {
    let router = ticket_router(Arc::new(StubHost::accepting()));
    let response = router
        .oneshot(get_request("/projects/demo/tickets/not-a-number"))
        .await
        .expect("route request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn every_documented_route_is_mounted() {
    // A missing route would 404 before the stub's acquire failure can 500.
    let cases = [
        (Method::POST, "/projects/demo/tickets", Some(json!({"title": "X", "type": "task"}))),
        (Method::GET, "/projects/demo/tickets", None),
        (Method::GET, "/projects/demo/tickets/board", None),
        (Method::GET, "/projects/demo/tickets/search?query=x", None),
        (Method::GET, "/projects/demo/tickets/1", None),
        (Method::PUT, "/projects/demo/tickets/1", Some(json!({"title": "Y"}))),
        (Method::POST, "/projects/demo/tickets/1/move", Some(json!({"status": "done"}))),
        (Method::POST, "/projects/demo/tickets/1/links", Some(json!({"target_id": 2}))),
        (Method::GET, "/projects/demo/tickets/1/links", None),
        (Method::DELETE, "/projects/demo/tickets/1/links/3", None),
    ];

    for (method, uri, body) in cases {
        let router = ticket_router(Arc::new(StubHost::accepting()));
        let request = match body {
            Some(body) => json_request(method.clone(), uri, body),
            None => Request::builder()
                .method(method.clone())
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        };
        let response = router.oneshot(request).await.expect("route request");
        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "{method} {uri} did not reach the host boundary"
        );
    }
}
