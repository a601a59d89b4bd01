//! Thumbnails for space header images.

use crate::content::SpaceImage;
use crate::error::Result;
use crate::services::http_client::PreviewHttpClient;
use crate::services::preview_renderer::PreviewRenderer;
use image::DynamicImage;
use log::debug;
use std::sync::Arc;

/// Builds `{webdavUrl}?scalingup=0&a=1&x={size}&y={size}&c={etag}&preview=1`.
pub fn space_special_url(webdav_url: &str, size: u32, etag: &str) -> String {
    format!(
        "{}?scalingup=0&a=1&x={}&y={}&c={}&preview=1",
        webdav_url, size, size, etag
    )
}

/// Fetch strategy for `ContentItem::SpaceImage`.
pub struct SpaceImageService {
    client: Arc<dyn PreviewHttpClient>,
    renderer: PreviewRenderer,
    space_thumbnail_px: u32,
}

impl SpaceImageService {
    pub fn new(
        client: Arc<dyn PreviewHttpClient>,
        renderer: PreviewRenderer,
        space_thumbnail_px: u32,
    ) -> Self {
        Self {
            client,
            renderer,
            space_thumbnail_px,
        }
    }

    /// Downloads the space image preview at twice the header height.
    pub fn fetch(&self, space: &SpaceImage) -> Result<DynamicImage> {
        let uri = space_special_url(&space.webdav_url, self.space_thumbnail_px * 2, &space.etag);
        debug!("URI: {}", uri);

        let response = self.client.get(&uri)?;
        self.renderer.render(response, &space.mime_type)
    }
}
