//! HttpSource against a mock export API
//!
//! Covers page numbering, session header placement, not-found handling and
//! error classification.

mod common;

use common::*;
use gallery_mirror::{
    CatalogSource, Collection, HttpSource, ItemId, ItemSource, ItemType, SourceConfig, SourceError,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer) -> HttpSource {
    let config = SourceConfig {
        base_url: server.uri(),
        ..SourceConfig::default()
    };
    HttpSource::new(&config, &test_credentials()).unwrap_or_else(|e| panic!("{e}"))
}

#[tokio::test]
async fn first_page_is_requested_as_page_one_with_session_header() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "artist",
        "gallery",
        1,
        json!(["10", 11, {"id": "12", "title": "Twelve"}]),
    )
    .await;

    let stubs = source(&server)
        .list_page("artist", Collection::Gallery, 0)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    let ids: Vec<ItemId> = stubs.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![ItemId(10), ItemId(11), ItemId(12)]);
    assert_eq!(stubs[2].title.as_deref(), Some("Twelve"));
}

#[tokio::test]
async fn scraps_use_their_own_listing() {
    let server = MockServer::start().await;
    mount_listing(&server, "artist", "scraps", 3, json!([7])).await;

    let stubs = source(&server)
        .list_page("artist", Collection::Scraps, 2)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(stubs.len(), 1);
    assert_eq!(stubs[0].id, ItemId(7));
}

#[tokio::test]
async fn empty_array_ends_the_listing() {
    let server = MockServer::start().await;
    mount_listing(&server, "artist", "gallery", 1, json!([])).await;

    let stubs = source(&server)
        .list_page("artist", Collection::Gallery, 0)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert!(stubs.is_empty());
}

#[tokio::test]
async fn missing_listing_reads_as_empty_page() {
    let server = MockServer::start().await;

    let stubs = source(&server)
        .list_page("nobody", Collection::Gallery, 0)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert!(stubs.is_empty());
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/artist/gallery.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = source(&server)
        .list_page("artist", Collection::Gallery, 0)
        .await
        .unwrap_err();

    assert!(
        matches!(err, SourceError::Status { status: 500, .. }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn malformed_listing_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/artist/gallery.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = source(&server)
        .list_page("artist", Collection::Gallery, 0)
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Parse(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn item_record_and_payload_are_fetched() {
    let server = MockServer::start().await;
    mount_item(&server, "artist", 42, "sunset.png", b"\x89PNG payload").await;

    let remote = source(&server)
        .get_item(ItemId(42))
        .await
        .unwrap_or_else(|e| panic!("{e}"))
        .unwrap_or_else(|| panic!("item 42 should exist"));

    assert_eq!(remote.payload, b"\x89PNG payload");
    assert_eq!(remote.item.id, ItemId(42));
    assert_eq!(remote.item.author, "artist");
    assert_eq!(remote.item.title, "Item 42");
    assert_eq!(remote.item.item_type, ItemType::Image);
    assert_eq!(remote.item.stats.views, 1024);
    assert_eq!(remote.item.file_size, 12);
    assert!(remote.item.file_url.ends_with("/art/artist/42/42.sunset.png"));
}

#[tokio::test]
async fn explicit_type_label_wins_over_extension() {
    let server = MockServer::start().await;
    let route = mount_submission(&server, "writer", 5, "chapter.png", json!({"type": "story"})).await;
    mount_payload(&server, &route, b"once upon a time").await;

    let remote = source(&server)
        .get_item(ItemId(5))
        .await
        .unwrap_or_else(|e| panic!("{e}"))
        .unwrap_or_else(|| panic!("item 5 should exist"));

    assert_eq!(remote.item.item_type, ItemType::Text);
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let server = MockServer::start().await;

    let item = source(&server)
        .get_item(ItemId(404))
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert!(item.is_none());
}

#[tokio::test]
async fn record_without_download_is_not_found() {
    let server = MockServer::start().await;
    mount_submission(&server, "artist", 8, "gone.png", json!({"download": ""})).await;

    let item = source(&server)
        .get_item(ItemId(8))
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert!(item.is_none());
}

#[tokio::test]
async fn missing_payload_is_not_found() {
    let server = MockServer::start().await;
    // Record only; the payload route answers 404
    mount_submission(&server, "artist", 9, "lost.png", json!({})).await;

    let item = source(&server)
        .get_item(ItemId(9))
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert!(item.is_none());
}

#[tokio::test]
async fn failing_record_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/submission/3.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source(&server).get_item(ItemId(3)).await.unwrap_err();

    assert!(matches!(err, SourceError::Status { status: 503, .. }));
}
