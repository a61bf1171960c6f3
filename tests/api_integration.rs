//! API integration tests
//!
//! Drive the full router: link CRUD, tracking lookups and precise-location
//! submissions.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_test_app, get_request, json_request, PUBLIC_URL};
use pinpoint::storage::Storage;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tower::ServiceExt;

async fn create_link(app: &common::TestApp, redirect_url: &str) -> String {
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/create-link",
            json!({ "redirectUrl": redirect_url, "description": "test link" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["linkId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(Duration::ZERO);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_create_link_response_shape() {
    let app = create_test_app(Duration::ZERO);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/create-link",
            json!({ "redirectUrl": "https://example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let link_id = json["linkId"].as_str().unwrap();
    assert_eq!(link_id.len(), 10);
    assert!(link_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    assert_eq!(
        json["trackingLink"].as_str().unwrap(),
        format!("{PUBLIC_URL}/t/{link_id}")
    );
    assert_eq!(json["redirectUrl"], "https://example.com");

    let link = app.storage.get_link(link_id).await.unwrap().unwrap();
    assert_eq!(link.clicks, 0);
    assert_eq!(link.description, "");
}

#[tokio::test]
async fn test_create_link_requires_redirect_url() {
    let app = create_test_app(Duration::ZERO);

    for body in [json!({}), json!({ "redirectUrl": "" }), json!({ "redirectUrl": "   " })] {
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/create-link", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Redirect URL is required" })
        );
    }

    assert!(app.storage.list_links().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_created_ids_are_unique() {
    let app = create_test_app(Duration::ZERO);

    let mut ids = HashSet::new();
    for i in 0..50 {
        let id = create_link(&app, &format!("https://example.com/{i}")).await;
        assert!(ids.insert(id), "link id issued twice");
    }
}

#[tokio::test]
async fn test_list_links_includes_tracking_count() {
    let app = create_test_app(Duration::ZERO);

    let first = create_link(&app, "https://example.com/a").await;
    let second = create_link(&app, "https://example.com/b").await;

    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/t/{first}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/links"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let links = json.as_array().unwrap();
    assert_eq!(links.len(), 2);

    let by_id = |id: &str| {
        links
            .iter()
            .find(|l| l["id"] == id)
            .cloned()
            .expect("link listed")
    };
    assert_eq!(by_id(&first)["trackingCount"], 1);
    assert_eq!(by_id(&first)["clicks"], 1);
    assert_eq!(by_id(&second)["trackingCount"], 0);
    assert_eq!(by_id(&second)["description"], "test link");
}

#[tokio::test]
async fn test_tracking_unknown_link() {
    let app = create_test_app(Duration::ZERO);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/tracking/unknown-id"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "Link not found" }));
}

#[tokio::test]
async fn test_delete_removes_link_and_tracking() {
    let app = create_test_app(Duration::ZERO);
    let link_id = create_link(&app, "https://example.com").await;

    app.router
        .clone()
        .oneshot(get_request(&format!("/t/{link_id}")))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request("DELETE", &format!("/api/links/{link_id}"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true }));

    assert!(app.storage.get_visits(&link_id).await.unwrap().is_none());

    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/api/tracking/{link_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(json_request("DELETE", &format!("/api/links/{link_id}"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_cancels_pending_lookups() {
    let app = create_test_app(Duration::from_secs(30));
    let link_id = create_link(&app, "https://example.com").await;

    app.router
        .clone()
        .oneshot(get_request(&format!("/t/{link_id}")))
        .await
        .unwrap();
    assert_eq!(app.recorder.pending_lookups(), 1);

    let response = app
        .router
        .clone()
        .oneshot(json_request("DELETE", &format!("/api/links/{link_id}"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(app.recorder.drain(Duration::from_secs(2)).await);
    assert!(!app.storage.exists(&link_id).await.unwrap());
}

#[tokio::test]
async fn test_update_location_unknown_link() {
    let app = create_test_app(Duration::ZERO);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/update-location",
            json!({
                "linkId": "missing",
                "trackingId": "whatever",
                "latitude": 1.0,
                "longitude": 2.0,
                "accuracy": 10.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "Link not found" }));
}

#[tokio::test]
async fn test_update_location_without_visits_is_noop() {
    let app = create_test_app(Duration::ZERO);
    let link_id = create_link(&app, "https://example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/update-location",
            json!({
                "linkId": link_id,
                "trackingId": "whatever",
                "latitude": 1.0,
                "longitude": 2.0,
                "accuracy": 10.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true }));
    assert!(app.storage.get_visits(&link_id).await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_location_falls_back_to_latest_visit() {
    let app = create_test_app(Duration::ZERO);
    let link_id = create_link(&app, "https://example.com").await;

    for _ in 0..2 {
        app.router
            .clone()
            .oneshot(get_request(&format!("/t/{link_id}")))
            .await
            .unwrap();
    }

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/update-location",
            json!({
                "linkId": link_id,
                "trackingId": "not-a-visit",
                "latitude": 50.06,
                "longitude": 19.94,
                "accuracy": 25.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["matchedBy"], "latest");

    let visits = app.storage.get_visits(&link_id).await.unwrap().unwrap();
    assert_eq!(json["trackingId"], visits[1].id.as_str());
    assert!(visits[0].precise_location.is_none());
    assert_eq!(visits[1].precise_location.as_ref().unwrap().latitude, 50.06);
}

#[tokio::test]
async fn test_tracking_clicks_match_visits_under_concurrent_hits() {
    let app = create_test_app(Duration::ZERO);
    let link_id = create_link(&app, "https://example.com").await;

    let mut hits = Vec::new();
    for _ in 0..20 {
        let router = app.router.clone();
        let uri = format!("/t/{link_id}");
        hits.push(tokio::spawn(async move {
            router.oneshot(get_request(&uri)).await.unwrap()
        }));
    }

    for _ in 0..20 {
        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/api/tracking/{link_id}")))
            .await
            .unwrap();
        let json = body_json(response).await;
        let tracking = json["tracking"].as_array().unwrap();
        assert_eq!(json["link"]["clicks"], tracking.len());
    }

    for hit in hits {
        assert_eq!(hit.await.unwrap().status(), StatusCode::OK);
    }
}
