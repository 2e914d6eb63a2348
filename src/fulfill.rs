//! Fulfillment Dispatcher
//! 承認後の在庫払い出しと購入者への配信

use chrono::Utc;
use tracing::{info, warn};

use crate::inventory::{self, StockError};
use crate::models::PurchaseRecord;
use crate::AppState;

/// 配信後に必ず送る注意書き（商品種別によらず固定）
pub const USAGE_NOTICE: &str = "⚠️ ご注意\n\
    eSIMご利用時は必ず【読み取り画面を録画】してください。\n\
    使用できなかった場合でも、録画がないと保証対象外になります。";

/// 在庫を払い出して購入者へ配信する。残り在庫数を返す。
///
/// 在庫確保・保存・自動バックアップは台帳ロックの内側で一息に行い、
/// 配信はロック外で行う。取り出し済みのユニットは配信に失敗しても
/// 消費済み扱い（ロールバックも自動リトライもしない — 同じ参照の
/// 再送は購入者側で無害なため、ログを残して先へ進む）。
pub async fn fulfill(
    state: &AppState,
    buyer_id: i64,
    buyer_name: &str,
    product: &str,
    quantity: u32,
    total: i64,
    code: Option<String>,
) -> Result<usize, StockError> {
    let (units, remaining) = {
        let mut ledger = state.ledger.lock().await;
        let units = inventory::allocate(&mut ledger.doc, product, quantity)?;
        ledger.save().await;
        ledger.snapshot_auto().await;
        let remaining = inventory::available(&ledger.doc, product);
        (units, remaining)
    };

    let count = units.len();
    for (i, file_id) in units.iter().enumerate() {
        let caption = format!(
            "✅ {}の商品をお送りします（{}/{}枚目）ありがとうございました！",
            product,
            i + 1,
            count
        );
        if let Err(e) = state
            .transport
            .send_photo(buyer_id, file_id, &caption, &[])
            .await
        {
            warn!(
                "商品画像の送信に失敗しました (user={}, {}/{}枚目): {}",
                buyer_id,
                i + 1,
                count,
                e
            );
        }
    }

    // 購入履歴はバッチごとに1件
    state.purchases.lock().await.push(PurchaseRecord {
        user_id: buyer_id,
        user_name: buyer_name.to_string(),
        product: product.to_string(),
        quantity,
        total,
        code,
        at: Utc::now(),
    });

    if let Err(e) = state.transport.send_text(buyer_id, USAGE_NOTICE, &[]).await {
        warn!("注意書きの送信に失敗しました (user={}): {}", buyer_id, e);
    }

    info!(
        "フルフィルメント完了: user={} product={} qty={} total={}円 残り在庫={}",
        buyer_id, product, quantity, total, remaining
    );
    Ok(remaining)
}

/// 保証対応の再送。1枚だけ払い出し、購入履歴には記録しない。
pub async fn resend_unit(state: &AppState, buyer_id: i64, product: &str) -> Result<usize, StockError> {
    let (units, remaining) = {
        let mut ledger = state.ledger.lock().await;
        let units = inventory::allocate(&mut ledger.doc, product, 1)?;
        ledger.save().await;
        ledger.snapshot_auto().await;
        let remaining = inventory::available(&ledger.doc, product);
        (units, remaining)
    };

    if let Some(file_id) = units.first() {
        let caption = format!("✅ 保証により {} を再送します。", product);
        if let Err(e) = state
            .transport
            .send_photo(buyer_id, file_id, &caption, &[])
            .await
        {
            warn!("保証再送の送信に失敗しました (user={}): {}", buyer_id, e);
        }
    }
    if let Err(e) = state.transport.send_text(buyer_id, USAGE_NOTICE, &[]).await {
        warn!("注意書きの送信に失敗しました (user={}): {}", buyer_id, e);
    }

    info!("保証再送: user={} product={} 残り在庫={}", buyer_id, product, remaining);
    Ok(remaining)
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state_with;

    #[tokio::test]
    async fn fulfill_pops_fifo_and_logs_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mock) = state_with(&dir, &[("データ", &["u1", "u2", "u3"])]).await;

        let remaining = fulfill(&state, 10, "買い手", "データ", 2, 3000, None)
            .await
            .unwrap();
        assert_eq!(remaining, 1);

        // 先頭2枚が順番どおり配信される
        assert_eq!(mock.photos_to(10), vec!["u1".to_string(), "u2".to_string()]);
        // 注意書きが最後に1通
        let texts = mock.texts_to(10);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("録画"));

        let purchases = state.purchases.lock().await;
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].quantity, 2);
        assert_eq!(purchases[0].total, 3000);

        let ledger = state.ledger.lock().await;
        assert_eq!(ledger.doc.stock["データ"].len(), 1);
    }

    #[tokio::test]
    async fn fulfill_shortage_pops_nothing_and_logs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mock) = state_with(&dir, &[("データ", &["u1"])]).await;

        let err = fulfill(&state, 10, "買い手", "データ", 2, 3000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::Insufficient { .. }));
        assert!(mock.photos_to(10).is_empty());
        assert!(state.purchases.lock().await.is_empty());

        let ledger = state.ledger.lock().await;
        assert_eq!(ledger.doc.stock["データ"].len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_roll_back() {
        let dir = tempfile::tempdir().unwrap();
        // "bad" の送信だけ失敗させる
        let (state, mock) = crate::test_support::state_with_failing(
            &dir,
            &[("データ", &["bad", "good"])],
            &["bad"],
        )
        .await;

        let remaining = fulfill(&state, 10, "買い手", "データ", 2, 3000, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        // 失敗した1枚目は消費済みのまま、2枚目は届いている
        assert_eq!(mock.photos_to(10), vec!["good".to_string()]);
        let ledger = state.ledger.lock().await;
        assert!(ledger.doc.stock["データ"].is_empty());
    }

    #[tokio::test]
    async fn auto_backup_written_after_fulfillment() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _mock) = state_with(&dir, &[("データ", &["u1"])]).await;

        fulfill(&state, 10, "買い手", "データ", 1, 1500, None)
            .await
            .unwrap();

        let auto = dir
            .path()
            .join("backups")
            .join(crate::ledger::AUTO_BACKUP_NAME);
        assert!(auto.exists());
    }
}
