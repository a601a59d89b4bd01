//! サムネイル表示スロットの状態管理。

use crate::content::CacheKey;
use image::DynamicImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a display slot, stable for the slot's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

impl SlotId {
    /// 新しい一意のIDを払い出す。
    pub fn next() -> Self {
        Self(NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A place a thumbnail can be shown in, typically a reusable list row.
///
/// `live_tag` answers which item the slot shows right now; a result is only
/// committed when it still matches. `show_thumbnail` is only ever called from
/// the completion dispatcher.
pub trait ThumbnailSlot: Send + Sync {
    fn slot_id(&self) -> SlotId;

    fn live_tag(&self) -> Option<CacheKey>;

    fn show_thumbnail(&self, image: DynamicImage);
}

/// 汎用の表示スロット。
///
/// タグは呼び出し側（リスト行の再利用時など）が更新し、画像は完了ディスパッチャ
/// から書き込まれる。
pub struct DisplaySlot {
    id: SlotId,
    tag: RwLock<Option<CacheKey>>,
    image: RwLock<Option<DynamicImage>>,
}

impl DisplaySlot {
    /// 新しいスロットを作成する（タグも画像も空）。
    pub fn new() -> Self {
        Self {
            id: SlotId::next(),
            tag: RwLock::new(None),
            image: RwLock::new(None),
        }
    }

    /// 表示対象のタグを設定する。`None` で未割り当てに戻る。
    pub fn set_tag(&self, tag: Option<CacheKey>) {
        *self.tag.write().unwrap_or_else(PoisonError::into_inner) = tag;
    }

    /// Points the slot at a new item and drops whatever it was showing.
    pub fn bind_to(&self, tag: CacheKey) {
        self.set_tag(Some(tag));
        *self.image.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// 現在表示中の画像。
    pub fn current_image(&self) -> Option<DynamicImage> {
        self.image
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.set_tag(None);
        *self.image.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for DisplaySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbnailSlot for DisplaySlot {
    fn slot_id(&self) -> SlotId {
        self.id
    }

    fn live_tag(&self) -> Option<CacheKey> {
        self.tag.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn show_thumbnail(&self, image: DynamicImage) {
        *self.image.write().unwrap_or_else(PoisonError::into_inner) = Some(image);
    }
}
