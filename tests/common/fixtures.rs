//! Mock API fixtures and output tree inspection

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use super::SESSION_COOKIE;

/// Matches requests that carry no session header
pub struct NoSessionHeader;

impl Match for NoSessionHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("fa_cookie")
    }
}

/// Serve one 1-indexed listing page of `collection` for `author`
pub async fn mount_listing(
    server: &MockServer,
    author: &str,
    collection: &str,
    page: u32,
    body: Value,
) {
    Mock::given(method("GET"))
        .and(path(format!("/user/{author}/{collection}.json")))
        .and(query_param("page", page.to_string()))
        .and(header("fa_cookie", SESSION_COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve `ids` on page 1 and an empty page 2
pub async fn mount_collection(server: &MockServer, author: &str, collection: &str, ids: &[u64]) {
    mount_listing(server, author, collection, 1, json!(ids)).await;
    mount_listing(server, author, collection, 2, json!([])).await;
}

/// Payload path on the mock CDN for an item
pub fn payload_route(author: &str, id: u64, filename: &str) -> String {
    format!("/art/{author}/{id}/{id}.{filename}")
}

/// Serve a submission record whose download points back at the mock server
pub async fn mount_submission(
    server: &MockServer,
    author: &str,
    id: u64,
    filename: &str,
    extra: Value,
) -> String {
    let route = payload_route(author, id, filename);
    let mut record = json!({
        "title": format!("Item {id}"),
        "name": author,
        "profile_name": author,
        "download": format!("{}{}", server.uri(), route),
        "thumbnail": format!("{}/thumb/{id}.jpg", server.uri()),
        "posted_at": "2015-05-31T13:03:00Z",
        "rating": "General",
        "category": "Artwork (Digital)",
        "keywords": ["one", "two"],
        "views": "1,024",
        "favorites": 8,
        "comments": 1
    });
    if let (Some(record), Some(extra)) = (record.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            record.insert(key.clone(), value.clone());
        }
    }

    Mock::given(method("GET"))
        .and(path(format!("/submission/{id}.json")))
        .and(header("fa_cookie", SESSION_COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_json(record))
        .mount(server)
        .await;
    route
}

/// Serve payload bytes, refusing requests that leak the session header
pub async fn mount_payload(server: &MockServer, route: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .and(NoSessionHeader)
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
        .mount(server)
        .await;
}

/// Serve a complete item: record plus payload
pub async fn mount_item(server: &MockServer, author: &str, id: u64, filename: &str, bytes: &[u8]) {
    let route = mount_submission(server, author, id, filename, json!({})).await;
    mount_payload(server, &route, bytes).await;
}

/// Every regular file under `root`, relative to it and sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

/// Parse a sidecar file
pub fn read_sidecar(path: &Path) -> Value {
    let raw = std::fs::read(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    serde_json::from_slice(&raw).unwrap_or_else(|e| panic!("parse {}: {e}", path.display()))
}
