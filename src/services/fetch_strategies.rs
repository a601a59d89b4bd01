//! Dispatch from a content item to the strategy that can produce its thumbnail.

use crate::config::ThumbnailConfig;
use crate::content::ContentItem;
use crate::error::Result;
use crate::services::callbacks::ThumbnailHost;
use crate::services::http_client::PreviewHttpClient;
use crate::services::local_file_service::LocalFileService;
use crate::services::preview_renderer::PreviewRenderer;
use crate::services::remote_file_service::RemoteFileService;
use crate::services::space_image_service::SpaceImageService;
use image::DynamicImage;
use std::sync::Arc;

/// One strategy per content item variant.
pub struct FetchStrategies {
    remote: RemoteFileService,
    local: LocalFileService,
    space: SpaceImageService,
}

impl FetchStrategies {
    pub fn new(
        config: &ThumbnailConfig,
        client: Arc<dyn PreviewHttpClient>,
        host: Arc<dyn ThumbnailHost>,
    ) -> Self {
        let renderer = PreviewRenderer::new(config);
        Self {
            remote: RemoteFileService::new(
                Arc::clone(&client),
                host,
                config.server.clone(),
                renderer.clone(),
            ),
            local: LocalFileService::new(config.thumbnail_px, config.max_decode_bytes),
            space: SpaceImageService::new(client, renderer, config.space_thumbnail_px),
        }
    }

    /// Produces a thumbnail for `item` with the matching strategy.
    pub fn fetch(&self, item: &ContentItem) -> Result<DynamicImage> {
        match item {
            ContentItem::RemoteFile(file) => self.remote.fetch(file),
            ContentItem::LocalFile(file) => self.local.fetch(file),
            ContentItem::SpaceImage(space) => self.space.fetch(space),
        }
    }
}
