//! HTTP client for the prompt library backend and the reference reader.

use promptshelf_core::models::{
    CategoryList, LoraCatalog, LoraEntry, PromptDraft, PromptEntry, ReferenceItem, ReferencePage,
    RefreshReport,
};
use promptshelf_core::pagination::{Page, PageRequest, PageSource};
use promptshelf_core::ShelfError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Turn an error response into a human-readable message.
pub(crate) fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or(body)
            .to_string();
    }

    body.to_string()
}

pub(crate) fn api_url(base: &str, segments: &[&str]) -> Result<reqwest::Url, ShelfError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|err| ShelfError::InvalidInput(format!("invalid URL '{}': {}", base, err)))?;
    let mut path = url.path_segments_mut().map_err(|_| {
        ShelfError::InvalidInput(format!("URL '{}' cannot be used as an API base", base))
    })?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    drop(path);
    Ok(url)
}

/// Rewrite `http://localhost` to `127.0.0.1` and drop trailing slashes.
pub(crate) fn normalize_server(server: String) -> String {
    if let Ok(mut url) = reqwest::Url::parse(&server) {
        let should_normalize_localhost =
            url.scheme().eq_ignore_ascii_case("http") && url.host_str() == Some("localhost");
        if should_normalize_localhost && url.set_host(Some("127.0.0.1")).is_err() {
            return server;
        }
        let mut normalized = url.to_string();
        while normalized.ends_with('/') {
            normalized.pop();
        }
        return normalized;
    }
    server
}

fn transport_error(err: reqwest::Error) -> ShelfError {
    ShelfError::Http(err.to_string())
}

#[derive(Serialize)]
struct IndexBody {
    index: usize,
}

#[derive(Serialize)]
struct IndexedPrompt<'a> {
    index: usize,
    #[serde(flatten)]
    entry: &'a PromptEntry,
}

/// Client for both services; cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    server: String,
    reader: String,
}

impl ApiClient {
    /// Build a client for the library backend at `server` and the reference
    /// reader at `reader`.
    ///
    /// # Errors
    /// Returns [`ShelfError::Http`] when the HTTP client cannot be built.
    pub fn new(server: &str, reader: &str, timeout: Duration) -> Result<Self, ShelfError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            http,
            server: normalize_server(server.to_string()),
            reader: normalize_server(reader.to_string()),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn reader(&self) -> &str {
        &self.reader
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ShelfError> {
        let res = request.send().await.map_err(transport_error)?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => format!("failed to read error response body: {}", err),
        };
        let message = error_message_for_response(status, &body);
        warn!(status = status.as_u16(), %message, "request rejected");
        Err(ShelfError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ShelfError> {
        let res = self.send(request).await?;
        let body = res.text().await.map_err(transport_error)?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptEntry>, ShelfError> {
        let url = api_url(&self.server, &["prompt_manage", "get"])?;
        self.send_json(self.http.post(url)).await
    }

    /// Validate `draft` and append it to the library.
    ///
    /// # Errors
    /// Returns [`ShelfError::InvalidInput`] without contacting the backend
    /// when the name or text is blank.
    pub async fn add_prompt(&self, draft: PromptDraft) -> Result<PromptEntry, ShelfError> {
        let entry = draft.validate()?;
        let url = api_url(&self.server, &["prompt_manage", "add"])?;
        self.send(self.http.post(url).json(&entry)).await?;
        debug!(name = %entry.name, "prompt added");
        Ok(entry)
    }

    /// Validate `draft` and replace the prompt at `index`.
    pub async fn update_prompt(
        &self,
        index: usize,
        draft: PromptDraft,
    ) -> Result<PromptEntry, ShelfError> {
        let entry = draft.validate()?;
        let url = api_url(&self.server, &["prompt_manage", "update"])?;
        let body = IndexedPrompt {
            index,
            entry: &entry,
        };
        self.send(self.http.post(url).json(&body)).await?;
        debug!(index, name = %entry.name, "prompt updated");
        Ok(entry)
    }

    pub async fn delete_prompt(&self, index: usize) -> Result<(), ShelfError> {
        let url = api_url(&self.server, &["prompt_manage", "delete"])?;
        self.send(self.http.post(url).json(&IndexBody { index }))
            .await?;
        Ok(())
    }

    /// Delete several prompts by index, highest first, so earlier deletions
    /// never shift an index still pending.
    ///
    /// # Returns
    /// The indices deleted, in request order.
    pub async fn delete_prompts(&self, indices: &[usize]) -> Result<Vec<usize>, ShelfError> {
        let mut ordered = indices.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();
        for index in &ordered {
            self.delete_prompt(*index).await?;
        }
        Ok(ordered)
    }

    pub async fn lora_catalog(&self) -> Result<LoraCatalog, ShelfError> {
        let url = api_url(&self.server, &["prompt_manage", "lora", "list"])?;
        self.send_json(self.http.get(url)).await
    }

    /// Ask the backend to rescan every Lora's metadata.
    pub async fn refresh_loras(&self) -> Result<RefreshReport, ShelfError> {
        let url = api_url(&self.server, &["prompt_manage", "lora", "refresh"])?;
        self.send_json(self.http.get(url).query(&[("mode", "all")]))
            .await
    }

    pub async fn reference_categories(&self) -> Result<Vec<String>, ShelfError> {
        let url = api_url(&self.reader, &["api", "categories"])?;
        let list: CategoryList = self.send_json(self.http.get(url)).await?;
        Ok(list.categories)
    }

    pub async fn reference_page(&self, request: &PageRequest) -> Result<ReferencePage, ShelfError> {
        let url = api_url(&self.reader, &["api", "references"])?;
        let mut params = vec![
            ("offset", request.offset.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(category) = &request.query.category {
            params.push(("category", category.clone()));
        }
        if let Some(search) = &request.query.search {
            params.push(("search", search.clone()));
        }
        self.send_json(self.http.get(url).query(&params)).await
    }
}

impl PageSource<PromptEntry> for ApiClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<PromptEntry>, ShelfError> {
        if request.offset > 0 {
            return Ok(Page::whole(Vec::new()));
        }
        Ok(Page::whole(self.list_prompts().await?))
    }
}

impl PageSource<LoraEntry> for ApiClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<LoraEntry>, ShelfError> {
        if request.offset > 0 {
            return Ok(Page::whole(Vec::new()));
        }
        Ok(Page::whole(self.lora_catalog().await?.loras))
    }
}

impl PageSource<ReferenceItem> for ApiClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<ReferenceItem>, ShelfError> {
        let page = self.reference_page(request).await?;
        Ok(Page {
            items: page.references,
            total: page.total,
            has_more: page.has_more,
        })
    }
}

#[cfg(test)]
mod tests;
