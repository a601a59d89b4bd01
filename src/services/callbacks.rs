//! Hooks into the host application's persistence and account layers.

/// Callbacks the pipeline invokes on the host application.
pub trait ThumbnailHost: Send + Sync {
    /// The server gave a definitive answer (200 or 404) for this file; the host
    /// should stop asking for its thumbnail.
    fn disable_further_thumbnail_attempts(&self, file_id: i64);

    /// Resolves the WebDAV root of a space the file belongs to.
    ///
    /// `None` falls back to the account's personal files root.
    fn webdav_url_for_space(&self, _owner: &str, _space_id: &str) -> Option<String> {
        None
    }

    /// Hint that decoding ran out of memory and caches may be trimmed.
    fn reclaim_memory(&self) {}
}
