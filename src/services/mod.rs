//! Service layer: thumbnail fetch strategies and the collaborators they talk to.
//!
//! Each content item variant has its own service; `FetchStrategies` picks one by
//! matching on the variant.

pub mod callbacks;
pub mod fetch_strategies;
pub mod http_client;
pub mod local_file_service;
pub mod preview_renderer;
pub mod remote_file_service;
pub mod space_image_service;

pub use callbacks::ThumbnailHost;
pub use fetch_strategies::FetchStrategies;
pub use http_client::{PreviewHttpClient, PreviewResponse, ReqwestPreviewClient};
pub use local_file_service::LocalFileService;
pub use preview_renderer::PreviewRenderer;
pub use remote_file_service::RemoteFileService;
pub use space_image_service::SpaceImageService;
