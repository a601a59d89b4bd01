//! Shared fixtures and test doubles.

use crate::config::{ServerConfig, ThumbnailConfig};
use crate::content::RemoteFile;
use crate::error::{Result, ThumbnailError};
use crate::services::{PreviewHttpClient, PreviewResponse, ThumbnailHost};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

pub fn encode_jpeg(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut bytes, ImageFormat::Jpeg)
        .unwrap();
    bytes.into_inner()
}

pub fn remote_file(remote_id: &str, remote_path: &str, mime_type: &str) -> RemoteFile {
    RemoteFile {
        id: 1,
        remote_id: remote_id.to_string(),
        remote_path: remote_path.to_string(),
        mime_type: mime_type.to_string(),
        etag: "etag1".to_string(),
        owner: "alice".to_string(),
        space_id: None,
        needs_thumbnail_update: false,
    }
}

pub fn test_config() -> ThumbnailConfig {
    ThumbnailConfig {
        cache_dir: std::env::temp_dir().join("sync-thumbnails-test"),
        thumbnail_px: 80,
        worker_threads: 2,
        server: Some(ServerConfig {
            base_url: "https://cloud.example.com".to_string(),
            user_id: "alice".to_string(),
        }),
        ..ThumbnailConfig::default()
    }
}

/// Serves canned responses; unknown URLs get a 404.
#[derive(Default)]
pub struct FakeHttpClient {
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    requests: Mutex<Vec<String>>,
    offline: Mutex<bool>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body));
    }

    /// Every following request fails at the transport level.
    pub fn fail_all(&self) {
        *self.offline.lock().unwrap() = true;
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl PreviewHttpClient for FakeHttpClient {
    fn get(&self, url: &str) -> Result<PreviewResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        if *self.offline.lock().unwrap() {
            return Err(ThumbnailError::FetchFailed("connection refused".to_string()));
        }
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or((404, Vec::new()));
        Ok(PreviewResponse::new(status, Cursor::new(body)))
    }
}

/// A [`FakeHttpClient`] whose requests block until the test releases their URL.
#[derive(Default)]
pub struct GatedHttpClient {
    inner: FakeHttpClient,
    state: Mutex<GateLog>,
    changed: Condvar,
}

#[derive(Default)]
struct GateLog {
    started: Vec<String>,
    released: HashSet<String>,
}

impl GatedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: Vec<u8>) {
        self.inner.respond(url, status, body);
    }

    pub fn release(&self, url: &str) {
        self.state.lock().unwrap().released.insert(url.to_string());
        self.changed.notify_all();
    }

    /// Waits until a request for `url` has started.
    pub fn wait_for_request(&self, url: &str, timeout: Duration) -> bool {
        let state = self.state.lock().unwrap();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |log| !log.started.iter().any(|u| u == url))
            .unwrap();
        state.started.iter().any(|u| u == url)
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.inner.requests().iter().filter(|u| *u == url).count()
    }
}

impl PreviewHttpClient for GatedHttpClient {
    fn get(&self, url: &str) -> Result<PreviewResponse> {
        {
            let mut state = self.state.lock().unwrap();
            state.started.push(url.to_string());
            self.changed.notify_all();
            let _released = self
                .changed
                .wait_while(state, |log| !log.released.contains(url))
                .unwrap();
        }
        self.inner.get(url)
    }
}

/// Records every callback it receives.
#[derive(Default)]
pub struct RecordingHost {
    disabled: Mutex<Vec<i64>>,
    space_urls: Mutex<HashMap<String, String>>,
    reclaims: Mutex<usize>,
}

impl RecordingHost {
    pub fn disabled(&self) -> Vec<i64> {
        self.disabled.lock().unwrap().clone()
    }

    pub fn set_space_url(&self, space_id: &str, url: &str) {
        self.space_urls
            .lock()
            .unwrap()
            .insert(space_id.to_string(), url.to_string());
    }

    pub fn reclaims(&self) -> usize {
        *self.reclaims.lock().unwrap()
    }
}

impl ThumbnailHost for RecordingHost {
    fn disable_further_thumbnail_attempts(&self, file_id: i64) {
        self.disabled.lock().unwrap().push(file_id);
    }

    fn webdav_url_for_space(&self, _owner: &str, space_id: &str) -> Option<String> {
        self.space_urls.lock().unwrap().get(space_id).cloned()
    }

    fn reclaim_memory(&self) {
        *self.reclaims.lock().unwrap() += 1;
    }
}
