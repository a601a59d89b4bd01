//! HTTP transport used to download server-side previews.

use crate::error::{Result, ThumbnailError};
use std::io::{self, Read};
use std::time::Duration;

/// Status code of a successful preview response.
pub const HTTP_OK: u16 = 200;
/// Status code meaning the server will never produce a preview.
pub const HTTP_NOT_FOUND: u16 = 404;

/// Response to a preview GET request.
pub struct PreviewResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl PreviewResponse {
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }

    /// Reads the whole body into memory.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.body
            .read_to_end(&mut bytes)
            .map_err(|e| ThumbnailError::FetchFailed(format!("Failed to read body: {}", e)))?;
        Ok(bytes)
    }

    /// Consumes and discards the body so the connection can be reused.
    pub fn exhaust(mut self) {
        let _ = io::copy(&mut self.body, &mut io::sink());
    }
}

/// Blocking HTTP GET abstraction.
pub trait PreviewHttpClient: Send + Sync {
    /// Issues a GET; non-2xx statuses are returned, not turned into errors.
    fn get(&self, url: &str) -> Result<PreviewResponse>;
}

/// `reqwest` backed client with an overall request timeout.
pub struct ReqwestPreviewClient {
    client: reqwest::blocking::Client,
}

impl ReqwestPreviewClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sync-thumbnails/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl PreviewHttpClient for ReqwestPreviewClient {
    fn get(&self, url: &str) -> Result<PreviewResponse> {
        let response = self.client.get(url).send()?;
        Ok(PreviewResponse::new(response.status().as_u16(), response))
    }
}
