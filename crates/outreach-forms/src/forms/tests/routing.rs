use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Request, StatusCode},
};
use tower::ServiceExt;

use super::common::*;
use crate::forms::handler::{FormKind, FORM_ERROR_MESSAGE};
use crate::forms::router::{client_context, form_router};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

fn post_form(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .header("x-forwarded-for", "203.0.113.50, 10.1.1.1")
        .body(Body::from(form_body(fields)))
        .expect("request")
}

#[tokio::test]
async fn donation_post_returns_created() {
    let (handler, sheets) = memory_handler();
    let app = form_router(Arc::new(handler));

    let response = app
        .oneshot(post_form(
            "/api/v1/forms/donation",
            &[
                ("name", "Jane Doe"),
                ("email", "jane@example.com"),
                ("sponsorshipTier", "silver"),
                ("monthlySponsorship", "on"),
            ],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], true);
    assert!(payload.get("errors").is_none());

    let rows = sheets.rows("Donations");
    assert_eq!(rows[1][3], "silver");
    assert_eq!(rows[1][5], "Yes");
    assert_eq!(rows[1][6], "203.0.113.50");
}

#[tokio::test]
async fn invalid_application_returns_unprocessable() {
    let (handler, sheets) = memory_handler();
    let app = form_router(Arc::new(handler));

    let response = app
        .oneshot(post_form(
            "/api/v1/forms/application",
            &[("fullName", "Maria Lopez"), ("email", "maria@example.org")],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], false);
    assert_eq!(payload["errors"]["phone"][0], "Phone number is required");
    assert_eq!(
        payload["errors"]["adults"][0],
        "Number of adults is required"
    );
    assert!(payload["errors"].get("fullName").is_none());
    assert!(sheets.titles().is_empty());
}

#[tokio::test]
async fn store_failure_returns_internal_error() {
    let app = form_router(Arc::new(failing_handler()));

    let response = app
        .oneshot(post_form(
            "/api/v1/forms/donation",
            &[
                ("name", "Jane Doe"),
                ("email", "jane@example.com"),
                ("sponsorshipTier", "gold"),
            ],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], false);
    assert!(payload["errors"]["form"].is_array());
    assert!(!payload.to_string().contains(TRANSPORT_DETAIL));
}

#[tokio::test]
async fn unreadable_body_still_answers_with_submission_result() {
    let (handler, sheets) = memory_handler();
    let app = form_router(Arc::new(handler));

    let response = app
        .oneshot(
            Request::post("/api/v1/forms/donation")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Jane Doe"}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], false);
    assert_eq!(payload["message"], FormKind::Donation.apology());
    assert_eq!(payload["errors"]["form"][0], FORM_ERROR_MESSAGE);
    assert!(sheets.titles().is_empty());
}

#[tokio::test]
async fn unknown_form_route_is_not_found() {
    let (handler, _sheets) = memory_handler();
    let app = form_router(Arc::new(handler));

    let response = app
        .oneshot(post_form("/api/v1/forms/volunteer", &[("name", "Jane")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn client_context_reads_proxy_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("192.0.2.10"));

    let context = client_context(&headers);

    assert_eq!(context.forwarded_for, None);
    assert_eq!(context.real_ip.as_deref(), Some("192.0.2.10"));
    assert_eq!(context.ip_address(), "192.0.2.10");
}
