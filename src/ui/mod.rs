//! UI-facing side of thumbnail generation.
//!
//! Threading model:
//! - UIスレッド: スロットのタグ更新、`request_thumbnail` 呼び出し、完了ジョブの実行
//! - rayonワーカー: キャッシュ参照、ネットワーク取得、画像デコード
//! - `CompletionDispatcher`: ワーカーからUIスレッドへの結果返却時に使用

pub mod dispatcher;
pub mod display_slot;

pub use dispatcher::{ChannelDispatcher, CompletionDispatcher, CompletionQueue, InlineDispatcher};
pub use display_slot::{DisplaySlot, SlotId, ThumbnailSlot};
