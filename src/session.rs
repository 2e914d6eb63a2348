//! Conversation State Machine
//! ユーザーごとの対話ステージ管理。メモリ内のみで、再起動時は
//! 進行中の会話を放棄する（許容されたロス）。

use std::collections::HashMap;
use std::time::{Duration, Instant};

// ========================================
// ステージ定義
// ========================================

/// 購入フローで持ち回る注文内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub product: String,
    pub quantity: u32,
    /// 現時点の最終価格（クーポン適用で更新され得る）
    pub total: i64,
    /// 割引の説明（表示用）
    pub label: String,
    pub code: Option<String>,
}

/// 対話ステージ。レコードが無いこと自体が「フロー外」を意味する。
/// 受信メッセージの解釈はまずこのステージで分岐し、ステージが
/// 期待する入力（数量・コード・設定値・問い合わせ本文）としてのみ読む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    // ---- 購入者 ----
    SelectingProduct,
    EnteringQuantity { product: String },
    AwaitingDiscountCode { order: Order },
    AwaitingPaymentConfirmation { order: Order },
    AwaitingScreenshot { order: Order },
    PendingAdminReview { order: Order, buyer_name: String },
    EnteringInquiry,
    AwaitingWarrantyVideo { product: String },
    WarrantyPending { product: String },
    // ---- 管理者 ----
    AddingStock { product: String },
    AwaitingRejectionReason { target: i64 },
    ComposingReply { target: i64 },
    EditingConfigField { product: String, field: ConfigField },
}

impl Stage {
    /// 放置されても自動削除しないステージ。
    /// 承認待ちはボタン付きメッセージを管理者側が握っているため、
    /// 勝手に消すとボタンが宙に浮く。
    fn exempt_from_eviction(&self) -> bool {
        matches!(
            self,
            Stage::PendingAdminReview { .. } | Stage::WarrantyPending { .. }
        )
    }
}

/// /config で編集できる商品フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Price,
    Url,
    DiscountPrice,
    DiscountLink,
}

impl ConfigField {
    /// コールバックペイロードに載せるキー
    pub fn key(self) -> &'static str {
        match self {
            ConfigField::Price => "price",
            ConfigField::Url => "url",
            ConfigField::DiscountPrice => "dprice",
            ConfigField::DiscountLink => "dlink",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "price" => Some(ConfigField::Price),
            "url" => Some(ConfigField::Url),
            "dprice" => Some(ConfigField::DiscountPrice),
            "dlink" => Some(ConfigField::DiscountLink),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfigField::Price => "通常価格",
            ConfigField::Url => "支払いリンク",
            ConfigField::DiscountPrice => "割引価格",
            ConfigField::DiscountLink => "割引リンク",
        }
    }
}

// ========================================
// セッション管理
// ========================================

#[derive(Debug)]
struct Session {
    stage: Stage,
    touched_at: Instant,
}

/// ユーザーID → セッション。1ユーザーにつき高々1件。
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<i64, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, user_id: i64) -> Option<&Stage> {
        self.sessions.get(&user_id).map(|s| &s.stage)
    }

    pub fn stage_cloned(&self, user_id: i64) -> Option<Stage> {
        self.stage(user_id).cloned()
    }

    /// ステージを設定（既存があれば置き換え）
    pub fn set(&mut self, user_id: i64, stage: Stage) {
        self.sessions.insert(
            user_id,
            Session {
                stage,
                touched_at: Instant::now(),
            },
        );
    }

    /// フロー完了・却下・明示キャンセルで呼ぶ
    pub fn clear(&mut self, user_id: i64) -> Option<Stage> {
        self.sessions.remove(&user_id).map(|s| s.stage)
    }

    /// 放置セッションの掃き出し。消した件数を返す。
    pub fn evict_stale(&mut self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| s.stage.exempt_from_eviction() || s.touched_at.elapsed() < ttl);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_session_per_user() {
        let mut mgr = SessionManager::new();
        mgr.set(1, Stage::SelectingProduct);
        mgr.set(
            1,
            Stage::EnteringQuantity {
                product: "データ".to_string(),
            },
        );
        assert_eq!(mgr.len(), 1);
        assert!(matches!(
            mgr.stage(1),
            Some(Stage::EnteringQuantity { .. })
        ));
    }

    #[test]
    fn clear_removes_record() {
        let mut mgr = SessionManager::new();
        mgr.set(1, Stage::SelectingProduct);
        assert!(mgr.clear(1).is_some());
        assert!(mgr.stage(1).is_none());
        assert!(mgr.clear(1).is_none());
    }

    #[test]
    fn eviction_skips_pending_review() {
        let order = Order {
            product: "データ".to_string(),
            quantity: 1,
            total: 1500,
            label: "通常価格".to_string(),
            code: None,
        };
        let mut mgr = SessionManager::new();
        mgr.set(1, Stage::SelectingProduct);
        mgr.set(
            2,
            Stage::PendingAdminReview {
                order,
                buyer_name: "買い手".to_string(),
            },
        );
        mgr.set(
            3,
            Stage::WarrantyPending {
                product: "データ".to_string(),
            },
        );

        // TTL 0 = 即時失効とみなす
        let evicted = mgr.evict_stale(Duration::ZERO);
        assert_eq!(evicted, 1);
        assert!(mgr.stage(1).is_none());
        assert!(mgr.stage(2).is_some());
        assert!(mgr.stage(3).is_some());
    }
}
