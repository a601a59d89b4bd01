//! Thumbnails for server files, downloaded from the preview endpoint.

use crate::config::ServerConfig;
use crate::content::RemoteFile;
use crate::error::{Result, ThumbnailError};
use crate::services::callbacks::ThumbnailHost;
use crate::services::http_client::{HTTP_NOT_FOUND, HTTP_OK, PreviewHttpClient};
use crate::services::preview_renderer::PreviewRenderer;
use image::DynamicImage;
use log::debug;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::sync::Arc;

/// Characters left as-is in preview paths; everything else is percent-encoded.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'!')
    .remove(b'.')
    .remove(b'~')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'/');

/// Percent-encodes a remote path, keeping `/` separators.
pub fn encode_remote_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// Builds `{base}{encodedPath}?x={px}&y={px}&c={etag}&preview=1`.
pub fn preview_url(base: &str, remote_path: &str, px: u32, etag: &str) -> String {
    format!(
        "{}{}?x={}&y={}&c={}&preview=1",
        base,
        encode_remote_path(remote_path),
        px,
        px,
        etag
    )
}

/// Fetch strategy for `ContentItem::RemoteFile`.
pub struct RemoteFileService {
    client: Arc<dyn PreviewHttpClient>,
    host: Arc<dyn ThumbnailHost>,
    server: Option<ServerConfig>,
    renderer: PreviewRenderer,
}

impl RemoteFileService {
    pub fn new(
        client: Arc<dyn PreviewHttpClient>,
        host: Arc<dyn ThumbnailHost>,
        server: Option<ServerConfig>,
        renderer: PreviewRenderer,
    ) -> Self {
        Self {
            client,
            host,
            server,
            renderer,
        }
    }

    /// WebDAV root the file's path is relative to.
    fn base_url(&self, file: &RemoteFile) -> Option<String> {
        if let Some(space_id) = &file.space_id {
            if let Some(url) = self.host.webdav_url_for_space(&file.owner, space_id) {
                return Some(url);
            }
        }
        self.server.as_ref().map(ServerConfig::files_webdav_url)
    }

    /// Downloads the server preview for `file`.
    ///
    /// A 200 or a 404 is a definitive verdict and turns off further attempts for
    /// the file; other statuses are treated as transient.
    pub fn fetch(&self, file: &RemoteFile) -> Result<DynamicImage> {
        let base = self.base_url(file).ok_or_else(|| {
            ThumbnailError::FetchFailed("no server configured for remote previews".to_string())
        })?;
        let uri = preview_url(
            &base,
            &file.remote_path,
            self.renderer.thumbnail_px(),
            &file.etag,
        );
        debug!("URI: {}", uri);

        let response = self.client.get(&uri)?;
        let status = response.status;
        let result = self.renderer.render(response, &file.mime_type);

        if status == HTTP_OK || status == HTTP_NOT_FOUND {
            self.host.disable_further_thumbnail_attempts(file.id);
        }
        result
    }
}
