use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sync_thumbnails::file_utils::{self, PathExt};
use sync_thumbnails::services::{FetchStrategies, ReqwestPreviewClient, ThumbnailHost};
use sync_thumbnails::ui::{ChannelDispatcher, DisplaySlot};
use sync_thumbnails::{
    ContentItem, LocalFile, TaskOutcome, ThumbnailCacheGate, ThumbnailConfig, ThumbnailError,
    ThumbnailScheduler,
};

const USAGE: &str = "Usage: sync-thumbnails [--config FILE] PATH...";

/// Host for the command line: there is no database to update, so callbacks are only logged.
struct LoggingHost;

impl ThumbnailHost for LoggingHost {
    fn disable_further_thumbnail_attempts(&self, file_id: i64) {
        info!("Server answered for file {}; no further thumbnail attempts", file_id);
    }

    fn reclaim_memory(&self) {
        warn!("Thumbnail decoding ran out of memory");
    }
}

struct Args {
    config: Option<PathBuf>,
    paths: Vec<PathBuf>,
}

fn parse_args() -> Result<Args, ThumbnailError> {
    let mut config = None;
    let mut paths = Vec::new();
    let mut args = std::env::args_os().skip(1);

    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy().into_owned();
        match arg_str.as_str() {
            "--config" | "-c" => {
                let file = args
                    .next()
                    .ok_or_else(|| ThumbnailError::Config("--config needs a file".to_string()))?;
                config = Some(PathBuf::from(file));
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => {
                return Err(ThumbnailError::Config(format!(
                    "Unknown option {}\n{}",
                    flag, USAGE
                )));
            }
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    Ok(Args { config, paths })
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sync-thumbnails").join("config.toml"))
}

/// Expands directories into the supported images they contain.
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            match file_utils::scan_directory(path) {
                Ok(found) => images.extend(found.iter().map(|image| absolute(image))),
                Err(e) => warn!("Failed to scan {}: {}", path.display(), e),
            }
        } else if file_utils::is_supported_image(path) {
            images.push(absolute(path));
        } else {
            warn!("Skipping unsupported file {}", path.display());
        }
    }
    images
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let args = parse_args()?;
    let config = match (args.config, default_config_path()) {
        (Some(path), _) => ThumbnailConfig::load_required(&path)?,
        (None, Some(path)) => ThumbnailConfig::load(&path)?,
        (None, None) => ThumbnailConfig::default(),
    };
    config.validate()?;

    let images = collect_images(&args.paths);
    if images.is_empty() {
        warn!("No images to process\n{}", USAGE);
        return Ok(());
    }

    let client = Arc::new(ReqwestPreviewClient::new(Duration::from_secs(
        config.http_timeout_secs,
    ))?);
    let host: Arc<dyn ThumbnailHost> = Arc::new(LoggingHost);
    let strategies = FetchStrategies::new(&config, client, Arc::clone(&host));
    let (dispatcher, completions) = ChannelDispatcher::new();
    let scheduler = ThumbnailScheduler::new(
        &config,
        ThumbnailCacheGate::global(),
        strategies,
        host,
        Arc::new(dispatcher),
    )?;

    info!(
        "Generating {} thumbnails into {}",
        images.len(),
        config.cache_dir.display()
    );

    let finished = Arc::new(AtomicUsize::new(0));
    let committed = Arc::new(AtomicUsize::new(0));
    let mut slots = Vec::with_capacity(images.len());
    for path in images {
        let item = ContentItem::from(LocalFile {
            absolute_path: path.clone(),
        });
        let slot = Arc::new(DisplaySlot::new());
        slot.bind_to(item.cache_key());

        let finished = Arc::clone(&finished);
        let committed = Arc::clone(&committed);
        scheduler.request_thumbnail_with(item, &slot, move |outcome| {
            match outcome {
                TaskOutcome::Committed => {
                    committed.fetch_add(1, Ordering::Relaxed);
                    info!("{}: thumbnail ready", path.format_for_log());
                }
                TaskOutcome::NoImage => info!("{}: no thumbnail", path.format_for_log()),
                TaskOutcome::Superseded => {}
            }
            finished.fetch_add(1, Ordering::Relaxed);
        });
        slots.push(slot);
    }

    while finished.load(Ordering::Relaxed) < slots.len() {
        completions.run_next(Duration::from_millis(100));
    }

    info!(
        "{} of {} thumbnails ready",
        committed.load(Ordering::Relaxed),
        slots.len()
    );
    Ok(())
}
