use std::{net::SocketAddr, time::Duration};

use axum::{Json, Router, http::StatusCode, routing::get};
use catalog::{Category, FeedError, HttpFeed, ProductFeed, normalize_feed};
use serde_json::json;
use tokio::net::TcpListener;

async fn serve_feeds() -> SocketAddr {
    let app = Router::new()
        .route(
            "/data/rings.json",
            get(|| async {
                Json(json!({
                    "rings": [
                        { "id": "1", "name": "Band", "price": "₹2,000" },
                        { "id": 2, "name": "Halo", "price": 3500, "reviews": 9 }
                    ]
                }))
            }),
        )
        .route("/data/bracelets.json", get(|| async { "not json" }))
        .route(
            "/data/earrings.json",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve feeds");
    });

    addr
}

fn feed(addr: SocketAddr) -> HttpFeed {
    HttpFeed::new(&format!("http://{addr}/data/"), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn fetches_and_normalizes_nested_feed() {
    let feed = feed(serve_feeds().await);

    assert!(feed.url_for(Category::Ring).ends_with("/data/rings.json"));

    let raw = feed.fetch(Category::Ring).await.expect("fetch rings");
    let normalized = normalize_feed(raw, Category::Ring).expect("normalize");

    assert_eq!(normalized.products.len(), 2);
    assert_eq!(normalized.products[0].price, 2000.0);
    assert_eq!(normalized.products[1].reviews.len(), 9);
    assert!(normalized.skipped.is_empty());
}

#[tokio::test]
async fn reports_bad_status_and_bad_json() {
    let feed = feed(serve_feeds().await);

    match feed.fetch(Category::Earring).await {
        Err(FeedError::Status { status, .. }) => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE)
        }
        other => panic!("expected status error, got {other:?}"),
    }

    assert!(matches!(
        feed.fetch(Category::Bracelet).await,
        Err(FeedError::Decode { .. })
    ));

    assert!(matches!(
        feed.fetch(Category::Necklace).await,
        Err(FeedError::Status { .. })
    ));
}
