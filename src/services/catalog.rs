use crate::core::state::Book;
use crate::services::ClientBounds;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            api_key: None,
            max_results: default_max_results(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://www.googleapis.com/books/v1".to_string()
}
fn default_max_results() -> u32 {
    10
}

/// Metadata lookup against a book catalog.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CatalogClient: ClientBounds {
    async fn fetch_volume(&self, id: &str) -> Result<Volume>;
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Book>>;
}

// --- Wire types (only the consumed fields) ---

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub volume_info: VolumeInfo,
    pub search_info: Option<SearchInfo>,
    pub access_info: Option<AccessInfo>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub image_links: Option<ImageLinks>,
    pub preview_link: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchInfo {
    pub text_snippet: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccessInfo {
    pub text_to_speech_permission: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

impl Volume {
    pub fn into_book(self) -> Book {
        let info = self.volume_info;
        Book {
            id: self.id,
            title: info.title.unwrap_or_else(|| "Untitled".to_string()),
            authors: info.authors,
            description: info.description.unwrap_or_default(),
            image_url: info
                .image_links
                .and_then(|l| l.thumbnail)
                .unwrap_or_default(),
            preview_link: info.preview_link.unwrap_or_default(),
        }
    }

    fn text_to_speech_allowed(&self) -> bool {
        self.access_info
            .as_ref()
            .and_then(|a| a.text_to_speech_permission.as_deref())
            == Some("ALLOWED")
    }
}

// --- Google Books ---

#[derive(Debug)]
pub struct GoogleBooksClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GoogleBooksClient {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid catalog url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Catalog url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await?;
            return Err(anyhow!("Catalog API error ({}): {}", status, error_text));
        }

        let body = resp.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse catalog response: {}. Body: {}", e, body))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CatalogClient for GoogleBooksClient {
    async fn fetch_volume(&self, id: &str) -> Result<Volume> {
        let url = self.endpoint(&["volumes", id])?;
        self.get_json(url).await
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Book>> {
        let mut url = self.endpoint(&["volumes"])?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("maxResults", &max_results.to_string());
        let result: SearchResponse = self.get_json(url).await?;
        Ok(result.items.into_iter().map(Volume::into_book).collect())
    }
}

// --- Text synthesis ---

const PARTIAL_NOTE: &str = "The catalog only exposes a partial preview of this book. \
Use the preview link to access the full content.";
const UNAVAILABLE_NOTE: &str = "Preview content is not available for this book.";
// Wide enough that html2text never wraps a snippet; pages are wrapped at render time.
const SNIPPET_WIDTH: usize = 10_000;

fn header(book: &Book) -> String {
    let authors = if book.authors.is_empty() {
        "Unknown author".to_string()
    } else {
        book.authors_line()
    };
    format!("{}\n\nby {}\n\n", book.title, authors)
}

/// Reading text built from a successful metadata lookup.
pub fn compose_text(book: &Book, volume: &Volume) -> String {
    let info = &volume.volume_info;
    let mut text = header(book);

    let overview = info
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .or(Some(book.description.as_str()).filter(|d| !d.trim().is_empty()));
    if let Some(overview) = overview {
        text += &format!("Overview\n\n{}\n\n", overview.trim());
    }

    let mut details = Vec::new();
    if let Some(publisher) = &info.publisher {
        details.push(format!("Publisher: {}", publisher));
    }
    if let Some(date) = &info.published_date {
        details.push(format!("Published: {}", date));
    }
    if let Some(pages) = info.page_count {
        details.push(format!("Pages: {}", pages));
    }
    if !info.categories.is_empty() {
        details.push(format!("Categories: {}", info.categories.join(", ")));
    }
    if !details.is_empty() {
        text += &format!("Details\n\n{}\n\n", details.join("\n"));
    }

    if volume.text_to_speech_allowed() && !book.preview_link.is_empty() {
        text += &format!("You can read more at: {}\n\n", book.preview_link);
    }

    text += &format!("Preview Content:\n\n{}\n", PARTIAL_NOTE);

    let snippet = volume
        .search_info
        .as_ref()
        .and_then(|s| s.text_snippet.as_deref())
        .map(normalize_snippet)
        .filter(|s| !s.trim().is_empty());
    if let Some(snippet) = snippet {
        text += &format!("\nExcerpt:\n\n{}\n", snippet);
    }

    text
}

/// Reading text built from the caller-supplied fields only.
pub fn fallback_text(book: &Book) -> String {
    let mut text = header(book);
    if !book.description.trim().is_empty() {
        text += &format!("{}\n\n", book.description.trim());
    }
    text += UNAVAILABLE_NOTE;
    if !book.preview_link.is_empty() {
        text += &format!(" Please visit: {}", book.preview_link);
    }
    text
}

/// Fetch metadata and synthesize the reading text. Never fails: any lookup
/// error degrades to [`fallback_text`].
pub async fn load_text(client: &dyn CatalogClient, book: &Book) -> String {
    match client.fetch_volume(&book.id).await {
        Ok(volume) => {
            info!("Loaded catalog metadata for {}", book.id);
            compose_text(book, &volume)
        }
        Err(e) => {
            warn!("Catalog lookup for {} failed, using local fields: {:#}", book.id, e);
            fallback_text(book)
        }
    }
}

/// Render a catalog snippet as plain text. `<b>` comes out as `**`.
pub fn normalize_snippet(snippet: &str) -> String {
    match html2text::from_read(snippet.as_bytes(), SNIPPET_WIDTH) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("Could not render snippet, keeping it raw: {}", e);
            snippet.trim().to_string()
        }
    }
}
