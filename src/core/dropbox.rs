//! Storage backend that keeps every object as a file in the root of a
//! Dropbox account, talking to the v2 HTTP API with a long-lived bearer
//! token.

use crate::core::classify::classify_failure;
use crate::core::wire::{
    header_arg, wire_path, ListFolderArg, ListFolderContinueArg, ListFolderResult, PathArg,
    UploadArg, API_ARG_HEADER, DEFAULT_API_BASE, DEFAULT_CONTENT_BASE, DELETE_PATH,
    DOWNLOAD_PATH, LIST_FOLDER_CONTINUE_PATH, LIST_FOLDER_PATH, UPLOAD_PATH,
};
use crate::domain::model::{ListPage, ListRefsItem, Reference, StorageOpts};
use crate::domain::ports::{Lister, Storage};
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_url, Validate,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::fmt;

/// Name the backend is registered under.
pub const BACKEND_NAME: &str = "DROPBOX";

pub const TOKEN_KEY: &str = "token";
pub const PAGE_SIZE_KEY: &str = "page_size";
pub const API_BASE_KEY: &str = "api_base";
pub const CONTENT_BASE_KEY: &str = "content_base";

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
/// Largest `limit` list_folder accepts.
pub const MAX_PAGE_SIZE: u32 = 2000;

/// Names the listed namespace in errors raised by a first-page listing.
const ROOT_LABEL: &str = "<root>";

#[derive(Clone)]
pub struct DropboxConfig {
    pub token: String,
    pub api_base: String,
    pub content_base: String,
    pub page_size: u32,
}

impl DropboxConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            content_base: DEFAULT_CONTENT_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Points both hosts at one base URL, e.g. a local mock server.
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.api_base = base.to_string();
        self.content_base = base.to_string();
        self
    }

    pub fn from_opts(opts: &StorageOpts) -> Result<Self> {
        let token = *validate_required_field(TOKEN_KEY, &opts.get(TOKEN_KEY))?;

        let page_size = match opts.get(PAGE_SIZE_KEY) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| StoreError::InvalidConfigValueError {
                    field: PAGE_SIZE_KEY.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_PAGE_SIZE,
        };

        let config = Self {
            token: token.to_string(),
            api_base: opts
                .get(API_BASE_KEY)
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            content_base: opts
                .get(CONTENT_BASE_KEY)
                .unwrap_or(DEFAULT_CONTENT_BASE)
                .trim_end_matches('/')
                .to_string(),
            page_size,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Validate for DropboxConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string(TOKEN_KEY, &self.token)?;
        validate_url(API_BASE_KEY, &self.api_base)?;
        validate_url(CONTENT_BASE_KEY, &self.content_base)?;
        validate_range(PAGE_SIZE_KEY, self.page_size, 1, MAX_PAGE_SIZE)?;
        Ok(())
    }
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for DropboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropboxConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("content_base", &self.content_base)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DropboxStorage {
    client: Client,
    config: DropboxConfig,
}

impl DropboxStorage {
    pub fn new(config: DropboxConfig) -> Result<Self> {
        Self::with_client(config, Client::new())
    }

    /// Uses a caller-owned client, so connection pooling stays with the caller.
    pub fn with_client(config: DropboxConfig, client: Client) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Configured Dropbox storage: {:?}", config);
        Ok(Self { client, config })
    }

    pub fn from_opts(opts: &StorageOpts) -> Result<Self> {
        Self::new(DropboxConfig::from_opts(opts)?)
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    fn content_url(&self, path: &str) -> String {
        format!("{}{}", self.config.content_base, path)
    }

    /// Sends one authenticated request. Anything but 200 is classified into
    /// a `StoreError`; the body of a failed response is consumed here.
    async fn send(
        &self,
        op: &'static str,
        reference: &str,
        request: RequestBuilder,
    ) -> Result<Response> {
        let response = request
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|source| StoreError::Transport { op, source })?;

        let status = response.status();
        tracing::debug!("{}: response status {}", op, status);

        if status != StatusCode::OK {
            let body = response
                .bytes()
                .await
                .map_err(|source| StoreError::Transport { op, source })?;
            tracing::debug!(
                "{}: error body: {}",
                op,
                String::from_utf8_lossy(&body)
            );
            return Err(classify_failure(op, reference, status, &body));
        }

        Ok(response)
    }

    async fn read_body(op: &'static str, response: Response) -> Result<Vec<u8>> {
        let bytes = response
            .bytes()
            .await
            .map_err(|source| StoreError::Transport { op, source })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Storage for DropboxStorage {
    fn link_base(&self) -> Result<String> {
        Err(StoreError::NotSupported)
    }

    async fn download(&self, reference: &str) -> Result<Vec<u8>> {
        const OP: &str = "dropbox.download";

        let arg = header_arg(&PathArg {
            path: wire_path(reference),
        })?;
        let url = self.content_url(DOWNLOAD_PATH);
        tracing::debug!("{}: POST {} for {}", OP, url, reference);

        let request = self.client.post(&url).header(API_ARG_HEADER, arg);
        let response = self.send(OP, reference, request).await?;
        let data = Self::read_body(OP, response).await?;

        tracing::debug!("{}: read {} bytes of {}", OP, data.len(), reference);
        Ok(data)
    }

    // Single-request upload; the service caps these at 150 MB.
    async fn put(&self, reference: &str, contents: &[u8]) -> Result<()> {
        const OP: &str = "dropbox.put";

        let arg = header_arg(&UploadArg::overwrite(wire_path(reference)))?;
        let url = self.content_url(UPLOAD_PATH);
        tracing::debug!(
            "{}: POST {} for {} ({} bytes)",
            OP,
            url,
            reference,
            contents.len()
        );

        let request = self
            .client
            .post(&url)
            .header(API_ARG_HEADER, arg)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(contents.to_vec());
        self.send(OP, reference, request).await?;
        Ok(())
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        const OP: &str = "dropbox.delete";

        let url = self.api_url(DELETE_PATH);
        tracing::debug!("{}: POST {} for {}", OP, url, reference);

        let request = self.client.post(&url).json(&PathArg {
            path: wire_path(reference),
        });
        self.send(OP, reference, request).await?;
        Ok(())
    }

    fn close(&self) {
        // The client is shared; nothing to release.
        tracing::debug!("dropbox.close");
    }

    fn as_lister(&self) -> Option<&dyn Lister> {
        Some(self)
    }
}

#[async_trait]
impl Lister for DropboxStorage {
    async fn list(&self, token: &str) -> Result<ListPage> {
        const OP: &str = "dropbox.list";

        let request = if token.is_empty() {
            let url = self.api_url(LIST_FOLDER_PATH);
            tracing::debug!("{}: POST {} (limit {})", OP, url, self.config.page_size);
            self.client.post(&url).json(&ListFolderArg {
                path: String::new(),
                limit: self.config.page_size,
            })
        } else {
            // The page size was fixed when the cursor was created.
            let url = self.api_url(LIST_FOLDER_CONTINUE_PATH);
            tracing::debug!("{}: POST {}", OP, url);
            self.client.post(&url).json(&ListFolderContinueArg {
                cursor: token.to_string(),
            })
        };

        let label = if token.is_empty() { ROOT_LABEL } else { token };
        let response = self.send(OP, label, request).await?;
        let body = Self::read_body(OP, response).await?;
        let result: ListFolderResult =
            serde_json::from_slice(&body).map_err(|source| StoreError::Parse { op: OP, source })?;

        let refs: Vec<ListRefsItem> = result
            .entries
            .into_iter()
            .map(|entry| {
                tracing::trace!("{}: entry {} ({:?}, {} bytes)", OP, entry.name, entry.tag, entry.size);
                ListRefsItem {
                    reference: Reference::from(entry.name),
                    size: entry.size,
                }
            })
            .collect();

        let next_token = if result.has_more {
            result.cursor
        } else {
            String::new()
        };

        tracing::debug!(
            "{}: {} refs, more: {}",
            OP,
            refs.len(),
            !next_token.is_empty()
        );
        Ok(ListPage { refs, next_token })
    }
}

/// Factory used by the backend registry.
pub fn new_storage(opts: &StorageOpts) -> Result<Box<dyn Storage>> {
    Ok(Box::new(DropboxStorage::from_opts(opts)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;
    use httpmock::prelude::*;
    use serde_json::json;

    const TOKEN: &str = "test-token";

    fn storage_for(server: &MockServer) -> DropboxStorage {
        DropboxStorage::new(DropboxConfig::new(TOKEN).with_base_url(&server.base_url())).unwrap()
    }

    #[test]
    fn test_from_opts_requires_token() {
        let err = DropboxConfig::from_opts(&StorageOpts::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(matches!(err, StoreError::MissingConfigError { ref field } if field == "token"));

        let err = DropboxConfig::from_opts(&StorageOpts::new().with_key_value(TOKEN_KEY, ""))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_from_opts_defaults() {
        let config =
            DropboxConfig::from_opts(&StorageOpts::new().with_key_value(TOKEN_KEY, TOKEN)).unwrap();
        assert_eq!(config.token, TOKEN);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.content_base, DEFAULT_CONTENT_BASE);
    }

    #[test]
    fn test_from_opts_overrides() {
        let opts = StorageOpts::new()
            .with_key_value(TOKEN_KEY, TOKEN)
            .with_key_value(PAGE_SIZE_KEY, "2")
            .with_key_value(API_BASE_KEY, "http://127.0.0.1:9000/")
            .with_key_value(CONTENT_BASE_KEY, "http://127.0.0.1:9001");
        let config = DropboxConfig::from_opts(&opts).unwrap();
        assert_eq!(config.page_size, 2);
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.content_base, "http://127.0.0.1:9001");
    }

    #[test]
    fn test_from_opts_rejects_bad_page_size() {
        for raw in ["zero", "0", "2001"] {
            let opts = StorageOpts::new()
                .with_key_value(TOKEN_KEY, TOKEN)
                .with_key_value(PAGE_SIZE_KEY, raw);
            let err = DropboxConfig::from_opts(&opts).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invalid, "page_size {}", raw);
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = DropboxConfig::new("very-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_link_base_is_not_supported() {
        let storage = DropboxStorage::new(DropboxConfig::new(TOKEN)).unwrap();
        let err = storage.link_base().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        storage.close();
    }

    #[tokio::test]
    async fn test_download_sends_path_argument() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(DOWNLOAD_PATH)
                .header("Authorization", "Bearer test-token")
                .header(API_ARG_HEADER, r#"{"path":"/blob-1"}"#);
            then.status(200)
                .header("Content-Type", "application/octet-stream")
                .body("stored bytes");
        });

        let data = storage_for(&server).download("blob-1").await.unwrap();

        mock.assert();
        assert_eq!(data, b"stored bytes");
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH);
            then.status(409)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "error_summary": "path/not_found/.",
                    "error": {".tag": "path", "path": {".tag": "not_found"}}
                }));
        });

        let err = storage_for(&server).download("missing").await.unwrap_err();

        mock.assert();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_download_server_error_is_io() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH);
            then.status(500);
        });

        let err = storage_for(&server).download("blob").await.unwrap_err();

        mock.assert();
        assert_eq!(err.kind(), ErrorKind::IO);
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_put_sends_upload_argument_and_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(UPLOAD_PATH)
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/octet-stream")
                .header(
                    API_ARG_HEADER,
                    r#"{"path":"/blob-1","mode":"overwrite","autorename":true,"mute":true}"#,
                )
                .body("new contents");
            then.status(200)
                .json_body(json!({"name": "blob-1", "size": 12}));
        });

        storage_for(&server)
            .put("blob-1", b"new contents")
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_put_rejected_by_service() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(UPLOAD_PATH);
            then.status(409).json_body(json!({
                "error_summary": "path/insufficient_space/...",
                "error": {}
            }));
        });

        let err = storage_for(&server).put("blob", b"x").await.unwrap_err();

        mock.assert();
        assert_eq!(err.kind(), ErrorKind::IO);
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_download_rejected_conflict_is_io() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH);
            then.status(409).json_body(json!({
                "error_summary": "path/restricted_content/..",
                "error": {".tag": "path", "path": {".tag": "restricted_content"}}
            }));
        });

        let err = storage_for(&server).download("x").await.unwrap_err();

        mock.assert();
        assert_eq!(err.kind(), ErrorKind::IO);
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("path/restricted_content/.."));
    }

    #[tokio::test]
    async fn test_failed_response_with_truncated_body_is_transport() {
        let server = MockServer::start();
        // Announces more body than it sends, so reading the body fails.
        let mock = server.mock(|when, then| {
            when.method(POST).path(DOWNLOAD_PATH);
            then.status(409)
                .header("Content-Length", "512")
                .body(r#"{"error_summary": "path/"#);
        });

        let err = storage_for(&server).download("x").await.unwrap_err();

        mock.assert();
        assert_eq!(err.kind(), ErrorKind::IO);
        // A body that could not be read must not become an empty summary.
        match &err {
            StoreError::Transport { .. } => {}
            StoreError::RemoteRejected { summary, .. } => assert!(!summary.is_empty()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_not_found_names_the_listing() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(POST).path(LIST_FOLDER_PATH);
            then.status(409)
                .json_body(json!({"error_summary": "path/not_found/..", "error": {}}));
        });
        let next = server.mock(|when, then| {
            when.method(POST).path(LIST_FOLDER_CONTINUE_PATH);
            then.status(409)
                .json_body(json!({"error_summary": "path/not_found/..", "error": {}}));
        });

        let storage = storage_for(&server);
        let err = storage.list("").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "dropbox.list: item does not exist: <root>");

        let err = storage.list("cursor-9").await.unwrap_err();
        assert_eq!(err.to_string(), "dropbox.list: item does not exist: cursor-9");

        first.assert();
        next.assert();
    }

    #[tokio::test]
    async fn test_delete_sends_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(DELETE_PATH)
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .json_body(json!({"path": "/blob-1"}));
            then.status(200)
                .json_body(json!({"metadata": {".tag": "file", "name": "blob-1"}}));
        });

        storage_for(&server).delete("blob-1").await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_delete_missing_reference_is_not_suppressed() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(DELETE_PATH);
            then.status(409).json_body(json!({
                "error_summary": "path_lookup/not_found/..",
                "error": {}
            }));
        });

        let err = storage_for(&server).delete("gone").await.unwrap_err();

        mock.assert();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_first_page_uses_page_size() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(LIST_FOLDER_PATH)
                .header("Authorization", "Bearer test-token")
                .json_body(json!({"path": "", "limit": 3}));
            then.status(200).json_body(json!({
                "entries": [
                    {".tag": "file", "name": "b", "size": 2},
                    {".tag": "file", "name": "a", "size": 1}
                ],
                "cursor": "cursor-1",
                "has_more": true
            }));
        });

        let storage = DropboxStorage::new(
            DropboxConfig::new(TOKEN)
                .with_base_url(&server.base_url())
                .with_page_size(3),
        )
        .unwrap();
        let page = storage.list("").await.unwrap();

        mock.assert();
        // Service order is kept.
        assert_eq!(
            page.refs,
            vec![
                ListRefsItem {
                    reference: Reference::from("b"),
                    size: 2
                },
                ListRefsItem {
                    reference: Reference::from("a"),
                    size: 1
                },
            ]
        );
        assert_eq!(page.next_token, "cursor-1");
        assert!(!page.is_last());
    }

    #[tokio::test]
    async fn test_list_continue_clears_cursor_when_done() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(LIST_FOLDER_CONTINUE_PATH)
                .json_body(json!({"cursor": "cursor-1"}));
            then.status(200).json_body(json!({
                "entries": [{".tag": "file", "name": "c", "size": 3}],
                "cursor": "cursor-2",
                "has_more": false
            }));
        });

        let page = storage_for(&server).list("cursor-1").await.unwrap();

        mock.assert();
        assert_eq!(page.refs.len(), 1);
        assert_eq!(page.next_token, "");
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_list_malformed_response_is_parse_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(LIST_FOLDER_PATH);
            then.status(200).body("{not json");
        });

        let err = storage_for(&server).list("").await.unwrap_err();

        mock.assert();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert_eq!(err.kind(), ErrorKind::IO);
    }

    #[tokio::test]
    async fn test_transport_failure_is_io() {
        // Nothing listens on port 1.
        let storage =
            DropboxStorage::new(DropboxConfig::new(TOKEN).with_base_url("http://127.0.0.1:1"))
                .unwrap();

        let err = storage.download("blob").await.unwrap_err();

        assert!(matches!(err, StoreError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_new_storage_exposes_lister() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(LIST_FOLDER_PATH);
            then.status(200).json_body(json!({
                "entries": [],
                "cursor": "unused",
                "has_more": false
            }));
        });

        let opts = StorageOpts::new()
            .with_key_value(TOKEN_KEY, TOKEN)
            .with_key_value(API_BASE_KEY, server.base_url());
        let storage = new_storage(&opts).unwrap();
        let lister = storage.as_lister().expect("dropbox storage lists");
        let page = lister.list("").await.unwrap();

        mock.assert();
        assert!(page.refs.is_empty());
        assert!(page.is_last());
    }
}
