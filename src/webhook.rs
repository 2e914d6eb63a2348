//! Payment Gateway Webhook
//! カード決済プロバイダからの「支払い完了」通知を受ける axum サーバ。
//! 注文IDでチェックアウトセッションを突合し、管理者確認を経由せずに
//! 手動承認と同じフルフィルメント経路を呼ぶ。

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::fulfill;
use crate::inventory::StockError;
use crate::AppState;

/// 共有シークレットを運ぶヘッダ
const TOKEN_HEADER: &str = "X-Webhook-Token";

// ========================================
// ペイロード
// ========================================

#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub data: GatewayEventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayEventData {
    #[serde(rename = "merchantPaymentId")]
    pub merchant_payment_id: Option<String>,
}

// ========================================
// サーバ
// ========================================

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/paypay/callback", post(gateway_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.webhook_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 決済Webhookサーバを起動しました: {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ========================================
// Handler
// ========================================

/// POST /paypay/callback
///
/// 関心外のイベント・未知の注文IDにも 200 を返す
/// （ゲートウェイに同じ通知を再送させ続けないため）。
pub async fn gateway_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(event): Json<GatewayEvent>,
) -> (StatusCode, Json<Value>) {
    let Some(expected) = state.config.gateway_token.as_deref() else {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "ok": false, "error": "card payments disabled" })),
        );
    };
    let provided = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        warn!("Webhook の認証に失敗しました");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false })));
    }

    if event.event_type != "PAYMENT_COMPLETED" {
        return (StatusCode::OK, Json(json!({ "ok": true, "ignored": true })));
    }
    let Some(session_id) = event.data.merchant_payment_id else {
        return (StatusCode::OK, Json(json!({ "ok": true, "ignored": true })));
    };

    let Some(checkout) = state.checkouts.lock().await.remove(&session_id) else {
        warn!("未知の注文IDの支払い通知: {}", session_id);
        return (StatusCode::OK, Json(json!({ "ok": true, "ignored": true })));
    };

    info!(
        "💰 カード決済完了: session={} user={} product={} qty={} amount={}円",
        session_id, checkout.user_id, checkout.product, checkout.quantity, checkout.amount
    );

    match fulfill::fulfill(
        &state,
        checkout.user_id,
        &checkout.user_name,
        &checkout.product,
        checkout.quantity,
        checkout.amount,
        checkout.code.clone(),
    )
    .await
    {
        Ok(remaining) => {
            state.sessions.lock().await.clear(checkout.user_id);
            state
                .transport
                .send_text(
                    state.config.admin_id,
                    &format!(
                        "💰 カード決済で {} を{}枚送信しました（{}円）。残り在庫: {}枚",
                        checkout.product, checkout.quantity, checkout.amount, remaining
                    ),
                    &[],
                )
                .await
                .ok();
            (StatusCode::OK, Json(json!({ "ok": true })))
        }
        Err(StockError::Insufficient { .. }) => {
            // 在庫不足。注文を戻しておき、入荷後に再通知があれば配送できる。
            state
                .checkouts
                .lock()
                .await
                .insert(session_id.clone(), checkout.clone());
            state
                .transport
                .send_text(
                    checkout.user_id,
                    "⚠️ お支払いは確認できましたが在庫が不足しています。入荷後にお送りします。",
                    &[],
                )
                .await
                .ok();
            state
                .transport
                .send_text(
                    state.config.admin_id,
                    &format!(
                        "⚠️ カード決済の在庫不足: {} ×{}枚（注文ID: {}）。/addstock 後に再送してください。",
                        checkout.product, checkout.quantity, session_id
                    ),
                    &[],
                )
                .await
                .ok();
            (StatusCode::OK, Json(json!({ "ok": true, "delayed": true })))
        }
        Err(e) => {
            warn!("カード決済のフルフィルメント失敗: {}", e);
            (StatusCode::OK, Json(json!({ "ok": true, "error": e.to_string() })))
        }
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckoutSession;
    use crate::test_support::{state_with, TEST_ADMIN};

    fn event(event_type: &str, id: Option<&str>) -> GatewayEvent {
        GatewayEvent {
            event_type: event_type.to_string(),
            data: GatewayEventData {
                merchant_payment_id: id.map(|s| s.to_string()),
            },
        }
    }

    fn headers_with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token.parse().unwrap());
        headers
    }

    async fn register_checkout(state: &Arc<crate::AppState>, session_id: &str, quantity: u32) {
        state.checkouts.lock().await.insert(
            session_id.to_string(),
            CheckoutSession {
                user_id: 10,
                user_name: "買い手".to_string(),
                product: "データ".to_string(),
                quantity,
                amount: 1500 * i64::from(quantity),
                code: None,
            },
        );
    }

    #[tokio::test]
    async fn bad_token_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mock) = state_with(&dir, &[("データ", &["u1"])]).await;
        register_checkout(&state, "order-1", 1).await;

        let (status, _) = gateway_callback(
            State(state.clone()),
            headers_with_token("wrong"),
            Json(event("PAYMENT_COMPLETED", Some("order-1"))),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(mock.photos_to(10).is_empty());
        assert!(state.checkouts.lock().await.contains_key("order-1"));
    }

    #[tokio::test]
    async fn unknown_order_acked_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mock) = state_with(&dir, &[("データ", &["u1"])]).await;

        let (status, _) = gateway_callback(
            State(state.clone()),
            headers_with_token("hook-secret"),
            Json(event("PAYMENT_COMPLETED", Some("no-such-order"))),
        )
        .await;

        // 再送ループを防ぐため 200 で受けるが、何も配送しない
        assert_eq!(status, StatusCode::OK);
        assert!(mock.photos_to(10).is_empty());
        assert_eq!(state.ledger.lock().await.doc.stock["データ"].len(), 1);
    }

    #[tokio::test]
    async fn completed_payment_fulfills_without_admin_review() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mock) = state_with(&dir, &[("データ", &["u1", "u2"])]).await;
        register_checkout(&state, "order-1", 1).await;

        let (status, _) = gateway_callback(
            State(state.clone()),
            headers_with_token("hook-secret"),
            Json(event("PAYMENT_COMPLETED", Some("order-1"))),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(mock.photos_to(10), vec!["u1".to_string()]);
        assert!(!state.checkouts.lock().await.contains_key("order-1"));
        assert_eq!(state.purchases.lock().await.len(), 1);
        // 管理者には事後通知のみ
        assert!(mock
            .texts_to(TEST_ADMIN)
            .iter()
            .any(|t| t.contains("カード決済")));
    }

    #[tokio::test]
    async fn other_events_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mock) = state_with(&dir, &[("データ", &["u1"])]).await;
        register_checkout(&state, "order-1", 1).await;

        let (status, _) = gateway_callback(
            State(state.clone()),
            headers_with_token("hook-secret"),
            Json(event("PAYMENT_FAILED", Some("order-1"))),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(mock.photos_to(10).is_empty());
        assert!(state.checkouts.lock().await.contains_key("order-1"));
    }

    #[tokio::test]
    async fn shortage_keeps_checkout_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mock) = state_with(&dir, &[("データ", &["u1"])]).await;
        register_checkout(&state, "order-1", 3).await;

        let (status, _) = gateway_callback(
            State(state.clone()),
            headers_with_token("hook-secret"),
            Json(event("PAYMENT_COMPLETED", Some("order-1"))),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(mock.photos_to(10).is_empty());
        // 注文は保持され、購入者には遅延の案内が届く
        assert!(state.checkouts.lock().await.contains_key("order-1"));
        assert!(mock.texts_to(10).iter().any(|t| t.contains("在庫が不足")));
        assert_eq!(state.ledger.lock().await.doc.stock["データ"].len(), 1);
    }
}
