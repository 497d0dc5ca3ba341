//! HTTP source backed by a JSON export API.
//!
//! Endpoints used:
//! - `GET {base}/user/{author}/{gallery|scraps}.json?page={n}&full=1` (1-indexed pages)
//! - `GET {base}/submission/{id}.json`
//! - `GET {download}` for the payload
//!
//! The session cookie header is attached to API requests only; payload
//! downloads go to the CDN without it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Deserializer};

use super::{CatalogSource, Credentials, ItemSource, RemoteItem};
use crate::config::SourceConfig;
use crate::error::{Error, Result, SourceError};
use crate::types::{AuthoredItem, Collection, ItemId, ItemStats, ItemStub, ItemType};

/// Header the export API reads the session cookies from
const SESSION_HEADER: &str = "fa_cookie";

/// Catalog and item source talking to the JSON export API
///
/// Holds one `reqwest::Client`; cloning is cheap and shares the connection pool.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: url::Url,
    session: HeaderValue,
}

impl HttpSource {
    /// Build the client from source settings and session credentials
    pub fn new(config: &SourceConfig, credentials: &Credentials) -> Result<Self> {
        let mut base_url = url::Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid URL '{}': {}", config.base_url, e),
            key: Some("source.base_url".to_string()),
        })?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut session = HeaderValue::from_str(&credentials.cookie_header())
            .map_err(|_| Error::Other("credentials contain invalid header characters".into()))?;
        session.set_sensitive(true);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    fn endpoint(&self, path: &str) -> std::result::Result<url::Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|e| SourceError::Parse(format!("bad endpoint '{path}': {e}")))
    }

    /// GET an API endpoint; `Ok(None)` on 404
    async fn get_api(
        &self,
        url: url::Url,
    ) -> std::result::Result<Option<reqwest::Response>, SourceError> {
        let response = self
            .client
            .get(url.clone())
            .header(HeaderName::from_static(SESSION_HEADER), self.session.clone())
            .send()
            .await?;
        check_status(response, &url)
    }

    async fn get_payload(&self, url: url::Url) -> std::result::Result<Option<Vec<u8>>, SourceError> {
        let response = self.client.get(url.clone()).send().await?;
        match check_status(response, &url)? {
            Some(response) => Ok(Some(response.bytes().await?.to_vec())),
            None => Ok(None),
        }
    }
}

fn check_status(
    response: reqwest::Response,
    url: &url::Url,
) -> std::result::Result<Option<reqwest::Response>, SourceError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(Some(response))
}

#[async_trait::async_trait]
impl CatalogSource for HttpSource {
    async fn list_page(
        &self,
        author: &str,
        collection: Collection,
        page: u32,
    ) -> std::result::Result<Vec<ItemStub>, SourceError> {
        let mut url = self.endpoint(&format!(
            "user/{}/{}.json",
            urlencoding::encode(author),
            collection.as_str()
        ))?;
        url.query_pairs_mut()
            .append_pair("page", &(page + 1).to_string())
            .append_pair("full", "1");

        // A missing listing reads as an empty page
        let Some(response) = self.get_api(url).await? else {
            return Ok(Vec::new());
        };
        let body = response.bytes().await?;
        let entries: Vec<StubWire> = serde_json::from_slice(&body)?;
        entries.into_iter().map(StubWire::into_stub).collect()
    }
}

#[async_trait::async_trait]
impl ItemSource for HttpSource {
    async fn get_item(&self, id: ItemId) -> std::result::Result<Option<RemoteItem>, SourceError> {
        let url = self.endpoint(&format!("submission/{id}.json"))?;
        let Some(response) = self.get_api(url).await? else {
            return Ok(None);
        };
        let body = response.bytes().await?;
        let record: SubmissionWire = serde_json::from_slice(&body)?;

        let Some(download) = record.download.clone().filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        let payload_url = self.base_url.join(&absolutize(&download)).map_err(|e| {
            SourceError::Parse(format!("bad download locator '{download}': {e}"))
        })?;

        let Some(payload) = self.get_payload(payload_url.clone()).await? else {
            return Ok(None);
        };

        let item = record.into_item(id, payload_url.to_string(), payload.len() as u64);
        Ok(Some(RemoteItem { item, payload }))
    }
}

/// Give protocol-relative locators (`//host/path`) an explicit scheme
fn absolutize(locator: &str) -> String {
    match locator.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => locator.to_string(),
    }
}

/// Author identifier embedded in a payload locator (`.../art/{author}/{id}/{file}`)
fn author_from_locator(file_url: &str) -> Option<String> {
    let parsed = url::Url::parse(file_url).ok()?;
    let mut segments = parsed.path_segments()?;
    segments.find(|s| *s == "art")?;
    segments
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Listing entry: either a bare id or an object carrying one
#[derive(Deserialize)]
#[serde(untagged)]
enum StubWire {
    Bare(NumberOrString),
    Full {
        id: NumberOrString,
        #[serde(default)]
        title: Option<String>,
    },
}

impl StubWire {
    fn into_stub(self) -> std::result::Result<ItemStub, SourceError> {
        let (raw, title) = match self {
            StubWire::Bare(raw) => (raw, None),
            StubWire::Full { id, title } => (id, title),
        };
        let id = raw
            .as_u64()
            .ok_or_else(|| SourceError::Parse(format!("invalid item id {raw:?}")))?;
        Ok(ItemStub {
            id: ItemId(id),
            title,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

impl NumberOrString {
    fn as_u64(&self) -> Option<u64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::String(s) => s.trim().replace(',', "").parse().ok(),
        }
    }
}

fn counter<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.as_u64()).unwrap_or(0))
}

/// Submission record as served by the export API
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubmissionWire {
    title: String,
    description: String,
    profile_name: Option<String>,
    download: Option<String>,
    thumbnail: Option<String>,
    posted_at: Option<DateTime<Utc>>,
    category: String,
    species: String,
    gender: String,
    rating: String,
    keywords: Vec<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    folder: Option<String>,
    #[serde(deserialize_with = "counter")]
    views: u64,
    #[serde(deserialize_with = "counter")]
    favorites: u64,
    #[serde(deserialize_with = "counter")]
    comments: u64,
}

impl SubmissionWire {
    fn into_item(self, id: ItemId, file_url: String, file_size: u64) -> AuthoredItem {
        let item_type = match self.kind.as_deref() {
            Some(label) => ItemType::from_label(label),
            None => std::path::Path::new(&file_url)
                .extension()
                .and_then(|e| e.to_str())
                .map(ItemType::from_extension)
                .unwrap_or_default(),
        };
        let folder = match self.folder.as_deref() {
            Some("scraps") => Collection::Scraps,
            _ => Collection::Gallery,
        };
        // The display name is not an identifier; an empty author is rejected by storage
        let author = self
            .profile_name
            .filter(|p| !p.trim().is_empty())
            .or_else(|| author_from_locator(&file_url))
            .unwrap_or_default();

        AuthoredItem {
            id,
            title: self.title,
            author,
            item_type,
            tags: self.keywords.into_iter().collect::<BTreeSet<_>>(),
            folder,
            rating: self.rating,
            category: self.category,
            species: self.species,
            gender: self.gender,
            description: self.description,
            date: self.posted_at,
            file_url,
            thumbnail_url: self.thumbnail.filter(|t| !t.is_empty()),
            stats: ItemStats {
                views: self.views,
                favorites: self.favorites,
                comments: self.comments,
            },
            file_size,
        }
    }
}
