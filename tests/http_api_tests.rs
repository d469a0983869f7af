//! HTTP routes driven through `tower::ServiceExt::oneshot`

use ammonia::clean_text;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use seo_link_engine::cache::MemoryCache;
use seo_link_engine::engine::{build_state, Backends};
use seo_link_engine::http_server::router;
use seo_link_engine::links::{FamilyTarget, MemoryLinkCatalog};
use seo_link_engine::seo::{MemoryTemplateSource, SeoTemplates};
use seo_link_engine::tracking::MemoryEventStore;
use seo_link_engine::EngineConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: MemoryEventStore,
}

async fn app() -> TestApp {
    let templates = MemoryTemplateSource::new();
    templates
        .insert(
            4,
            SeoTemplates {
                h1: "#Gamme# #VMarque# #VModele#".into(),
                content: "#VousPropose# #Gamme#. #LinkGamme_2#".into(),
                ..Default::default()
            },
        )
        .await;
    let catalog = MemoryLinkCatalog::new();
    catalog.insert(FamilyTarget::new(2, "Démarreur")).await;
    let store = MemoryEventStore::new();

    let backends = Backends {
        cache: Arc::new(MemoryCache::new()),
        templates: Arc::new(templates),
        catalog: Arc::new(catalog),
        events: Arc::new(store.clone()),
    };
    let state = build_state(&EngineConfig::default(), backends);
    TestApp {
        router: router(state),
        store,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_track_click_and_impression() {
    let app = app().await;

    let (status, body) = send(
        &app.router,
        post_json(
            "/track-click",
            json!({
                "linkType": "LinkGamme",
                "sourceUrl": "/pieces/alternateur-4.html",
                "destinationUrl": "/pieces/demarreur-2.html",
                "sessionId": "abc",
                "deviceType": "mobile",
                "formula": "V1-N2"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, body) = send(
        &app.router,
        post_json("/track-click", json!({ "sourceUrl": "/a", "destinationUrl": "/b" })),
    )
    .await;
    assert_eq!(body, json!({ "success": false }));

    let (_, body) = send(
        &app.router,
        post_json(
            "/track-impression",
            json!({ "linkType": "LinkGamme", "pageUrl": "/pieces/alternateur-4.html", "linkCount": 4 }),
        ),
    )
    .await;
    assert_eq!(body, json!({ "success": true }));

    let (_, body) = send(
        &app.router,
        post_json(
            "/track-impression",
            json!({ "linkType": "LinkGamme", "pageUrl": "/pieces/alternateur-4.html", "linkCount": -4 }),
        ),
    )
    .await;
    assert_eq!(body, json!({ "success": false }));

    assert_eq!(app.store.click_count().await, 1);
    assert_eq!(app.store.impression_count().await, 1);

    let (status, body) = send(&app.router, get("/metrics/LinkGamme")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalClicks"], 1);
    assert_eq!(body["totalImpressions"], 4);
    assert_eq!(body["clickThroughRate"], 0.25);
    assert_eq!(body["placeholder"], false);
}

#[tokio::test]
async fn test_metrics_window_validation() {
    let app = app().await;

    let (status, _) = send(
        &app.router,
        get("/metrics/LinkGamme?startDate=2026-03-10&endDate=2026-03-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.router, get("/metrics/LinkGamme?startDate=tomorrow")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("invalid date"));
}

#[tokio::test]
async fn test_performance_report() {
    let app = app().await;
    let (status, body) = send(
        &app.router,
        get("/metrics/report?startDate=2026-01-01&endDate=2026-01-31"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["byLinkType"].as_array().unwrap().len(), 5);
    assert_eq!(body["totalClicks"], 0);
}

#[tokio::test]
async fn test_aggregate_then_cleanup() {
    let app = app().await;

    let (status, _) = send(&app.router, post_json("/cleanup?daysToKeep=90", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app.router, post_json("/aggregate", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app.router, post_json("/cleanup?daysToKeep=90", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clicksDeleted"], 0);

    let (status, _) = send(
        &app.router,
        post_json("/cleanup?daysToKeep=1000000000", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_render_and_invalidate() {
    let app = app().await;
    let request = json!({
        "context": {
            "type_id": 9045,
            "pg_id": 4,
            "marque_name": "BMW",
            "modele_name": "Série 3",
            "gamme_name": "Alternateur"
        },
        "source": { "role": "family", "url": "/pieces/alternateur-4.html" }
    });

    let (status, body) = send(&app.router, post_json("/seo/render", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seo"]["h1"], "Alternateur BMW Série 3");
    assert_eq!(body["seo"]["success"], true);
    assert_eq!(body["links"]["linksInjected"], 1);
    assert_eq!(body["links"]["formulas"][0]["url"], "/pieces/demarreur-2.html");
    assert!(body["seo"]["content"]
        .as_str()
        .unwrap()
        .contains(&format!("href=\"{}\"", clean_text("/pieces/demarreur-2.html"))));

    let delete = Request::builder()
        .method("DELETE")
        .uri("/seo/cache/4")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
