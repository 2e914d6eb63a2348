//! 購入者フロー
//! 商品選択 → 数量 → （クーポン） → 支払い報告 → スクリーンショット →
//! 管理者確認待ち。ほかに保証申請と問い合わせ。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::inventory;
use crate::ledger::looks_like_code;
use crate::models::{CheckoutSession, ProductLink};
use crate::pricing;
use crate::session::{Order, Stage};
use crate::transport::Button;
use crate::AppState;

// ========================================
// 購入フロー
// ========================================

/// /start — 購入メニュー表示、商品選択ステージへ
pub async fn start(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    let (overview, buttons) = {
        let ledger = state.ledger.lock().await;
        let mut names: Vec<&String> = ledger.doc.links.keys().collect();
        names.sort();

        let mut overview = String::from("📦 在庫状況\n");
        let mut buttons = Vec::new();
        for name in names {
            let count = inventory::available(&ledger.doc, name);
            overview.push_str(&format!("{}: {}枚\n", name, count));
            buttons.push(vec![Button::new(
                &format!("{}（{}枚）", name, count),
                &format!("type_{}", name),
            )]);
        }
        (overview, buttons)
    };

    state.sessions.lock().await.set(user_id, Stage::SelectingProduct);
    state
        .transport
        .send_text(
            chat_id,
            &format!(
                "こんにちは！eSIM販売Botです。\nどちらにしますか？\n\n{}",
                overview
            ),
            &buttons,
        )
        .await?;
    Ok(())
}

/// 商品選択ボタン。在庫が1枚も無ければ選択ステージに留まる。
pub async fn select_product(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    user_id: i64,
    product: &str,
) -> anyhow::Result<()> {
    let available = {
        let ledger = state.ledger.lock().await;
        if !ledger.doc.links.contains_key(product) {
            state
                .transport
                .answer_callback(callback_id, Some("⚠️ 商品が見つかりません。"), true)
                .await?;
            return Ok(());
        }
        inventory::available(&ledger.doc, product)
    };

    if available == 0 {
        state
            .transport
            .send_text(
                chat_id,
                &format!(
                    "⚠️ 現在「{}」の在庫がありません。追加されるまでお待ちください。",
                    product
                ),
                &[],
            )
            .await?;
        state.transport.answer_callback(callback_id, None, false).await?;
        return Ok(());
    }

    state.sessions.lock().await.set(
        user_id,
        Stage::EnteringQuantity {
            product: product.to_string(),
        },
    );
    state
        .transport
        .send_text(
            chat_id,
            &format!(
                "{}ですね。何枚購入しますか？（在庫: {}枚）",
                product, available
            ),
            &[],
        )
        .await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

/// 数量入力。1〜在庫数の整数のみ受け付け、仮価格（クーポン無し）を計算する。
pub async fn quantity_input(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    product: &str,
    text: &str,
) -> anyhow::Result<()> {
    let quantity = match text.parse::<u32>() {
        Ok(q) => q,
        Err(_) => {
            state
                .transport
                .send_text(chat_id, "⚠️ 数量は数字で入力してください。", &[])
                .await?;
            return Ok(());
        }
    };
    if quantity == 0 {
        state
            .transport
            .send_text(chat_id, "⚠️ 1枚以上で指定してください。", &[])
            .await?;
        return Ok(());
    }

    let (link, available) = {
        let ledger = state.ledger.lock().await;
        let Some(link) = ledger.doc.links.get(product).cloned() else {
            state
                .transport
                .send_text(chat_id, "⚠️ 商品が見つかりません。/start からやり直してください。", &[])
                .await?;
            state.sessions.lock().await.clear(user_id);
            return Ok(());
        };
        (link, inventory::available(&ledger.doc, product))
    };

    if !inventory_fits(quantity, available) {
        state
            .transport
            .send_text(
                chat_id,
                &format!("⚠️ 在庫が足りません（在庫: {}枚）。", available),
                &[],
            )
            .await?;
        return Ok(());
    }

    // クーポン無しの仮価格。数量6以上はここでまとめ買い割引が乗る。
    let quote = pricing::compute_price(product, &link, quantity, None, &HashMap::new())
        .unwrap_or_else(|_| pricing::Quote {
            total: link.price * i64::from(quantity),
            label: "通常価格".to_string(),
        });

    let order = Order {
        product: product.to_string(),
        quantity,
        total: quote.total,
        label: quote.label,
        code: None,
    };
    let (text, buttons) = payment_message(&order, &link, card_enabled(state));
    state
        .sessions
        .lock()
        .await
        .set(user_id, Stage::AwaitingPaymentConfirmation { order });
    state.transport.send_text(chat_id, &text, &buttons).await?;
    Ok(())
}

fn inventory_fits(quantity: u32, available: usize) -> bool {
    quantity as usize <= available
}

fn card_enabled(state: &AppState) -> bool {
    state.config.gateway_token.is_some()
}

/// 支払い案内のテキストとボタンを組み立てる
fn payment_message(
    order: &Order,
    link: &ProductLink,
    card_enabled: bool,
) -> (String, Vec<Vec<Button>>) {
    // クーポン適用時は割引リンクがあればそちらへ誘導する
    let pay_link = if order.code.is_some() {
        link.discount_link.as_ref().or(link.url.as_ref())
    } else {
        link.url.as_ref()
    };

    let mut text = format!(
        "📦 {} × {}枚\n💴 お支払い金額は {}円です",
        order.product, order.quantity, order.total
    );
    if order.label != "通常価格" {
        text.push_str(&format!("（{}）", order.label));
    }
    text.push('\n');
    match pay_link {
        Some(url) => text.push_str(&format!(
            "\nこちらのリンクからお支払いください👇\n{}\n",
            url
        )),
        None => text.push_str("\n⚠️ 支払いリンクが未設定です。管理者にお問い合わせください。\n"),
    }
    text.push_str("\n支払いが完了したら「完了」と送ってください。");

    let mut buttons = Vec::new();
    if order.quantity <= 5 && order.code.is_none() {
        buttons.push(vec![Button::new("🎫 クーポンを使う", "coupon")]);
    }
    if card_enabled {
        buttons.push(vec![Button::new("💳 カード決済", "card")]);
    }
    (text, buttons)
}

/// クーポン入力ステージへ（支払い案内のボタンから）
pub async fn coupon_prompt(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    user_id: i64,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(user_id);
    let Some(Stage::AwaitingPaymentConfirmation { order }) = stage else {
        state
            .transport
            .answer_callback(callback_id, Some("⚠️ 先に商品と数量を選んでください。"), false)
            .await?;
        return Ok(());
    };

    state
        .sessions
        .lock()
        .await
        .set(user_id, Stage::AwaitingDiscountCode { order });
    state
        .transport
        .send_text(
            chat_id,
            "🎫 クーポンコードを入力してください（例: PROMO-ABC123）",
            &[vec![Button::new("↩️ 戻る", "back_pay")]],
        )
        .await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

/// クーポン入力をやめて支払い案内へ戻る
pub async fn back_to_payment(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    user_id: i64,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(user_id);
    let Some(Stage::AwaitingDiscountCode { order }) = stage else {
        state.transport.answer_callback(callback_id, None, false).await?;
        return Ok(());
    };

    let link = {
        let ledger = state.ledger.lock().await;
        ledger.doc.links.get(&order.product).cloned()
    };
    if let Some(link) = link {
        let (text, buttons) = payment_message(&order, &link, card_enabled(state));
        state.transport.send_text(chat_id, &text, &buttons).await?;
    }
    state
        .sessions
        .lock()
        .await
        .set(user_id, Stage::AwaitingPaymentConfirmation { order });
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

/// クーポン入力ステージでのテキスト
pub async fn code_input(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    order: Order,
    text: &str,
) -> anyhow::Result<()> {
    let code = text.trim().to_uppercase();
    if !looks_like_code(&code) {
        state
            .transport
            .send_text(
                chat_id,
                "⚠️ クーポンの形式が正しくありません（例: PROMO-ABC123）。",
                &[vec![Button::new("↩️ 戻る", "back_pay")]],
            )
            .await?;
        return Ok(());
    }
    try_redeem(state, chat_id, user_id, order, &code).await
}

/// 支払い報告待ちステージでのテキスト。
/// 「完了」で次へ進む。クーポン形式の文字列なら価格を再計算して
/// その場で案内を更新する（ステージは進めない）。それ以外は無視。
pub async fn payment_confirmation_input(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    order: Order,
    text: &str,
) -> anyhow::Result<()> {
    let lowered = text.to_lowercase();
    if text.contains("完了") || lowered == "done" || lowered == "complete" {
        state
            .sessions
            .lock()
            .await
            .set(user_id, Stage::AwaitingScreenshot { order });
        state
            .transport
            .send_text(
                chat_id,
                "📷 お支払いのスクリーンショット（画像）を送信してください。",
                &[],
            )
            .await?;
        return Ok(());
    }

    let code = text.trim().to_uppercase();
    if looks_like_code(&code) {
        return try_redeem(state, chat_id, user_id, order, &code).await;
    }
    // ステージが期待しない入力は明示的に無視する
    Ok(())
}

/// クーポンの引き換えを試みる。成立時にその場で使用済みへ倒して保存し、
/// 注文内容を新価格で更新して支払い案内を出し直す。
async fn try_redeem(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    order: Order,
    code: &str,
) -> anyhow::Result<()> {
    let outcome = {
        let mut ledger = state.ledger.lock().await;
        let Some(link) = ledger.doc.links.get(&order.product).cloned() else {
            state
                .transport
                .send_text(chat_id, "⚠️ 商品が見つかりません。/start からやり直してください。", &[])
                .await?;
            return Ok(());
        };
        match pricing::compute_price(
            &order.product,
            &link,
            order.quantity,
            Some(code),
            &ledger.doc.codes,
        ) {
            Ok(quote) => {
                // 引き換え成立。この時点から二度と使えない。
                if let Some(entry) = ledger.doc.codes.get_mut(code) {
                    entry.used = true;
                }
                ledger.save().await;
                Ok((quote, link))
            }
            Err(e) => Err(e),
        }
    };

    match outcome {
        Ok((quote, link)) => {
            info!("クーポン引き換え: user={} code={}", user_id, code);
            let updated = Order {
                total: quote.total,
                label: quote.label,
                code: Some(code.to_string()),
                ..order
            };
            let (text, buttons) = payment_message(&updated, &link, card_enabled(state));
            state
                .sessions
                .lock()
                .await
                .set(user_id, Stage::AwaitingPaymentConfirmation { order: updated });
            state.transport.send_text(chat_id, &text, &buttons).await?;
        }
        Err(e) => {
            state
                .transport
                .send_text(chat_id, &format!("⚠️ {}", e), &[])
                .await?;
        }
    }
    Ok(())
}

/// スクリーンショット受信 → 管理者へ転送して承認待ちへ
pub async fn screenshot(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    user_name: &str,
    order: Order,
    file_id: String,
) -> anyhow::Result<()> {
    let caption = format!(
        "📩 支払い完了報告\n👤 ユーザー: {}\n🆔 ユーザーID: {}\n📦 商品: {}\n🔢 数量: {}枚\n💴 金額: {}円（{}）\n🎫 クーポン: {}",
        user_name,
        user_id,
        order.product,
        order.quantity,
        order.total,
        order.label,
        order.code.as_deref().unwrap_or("なし"),
    );
    let buttons = vec![vec![
        Button::new("✅ 確認完了", &format!("confirm_{}", user_id)),
        Button::new("❌ 却下", &format!("reject_{}", user_id)),
    ]];
    state
        .transport
        .send_photo(state.config.admin_id, &file_id, &caption, &buttons)
        .await?;

    state.sessions.lock().await.set(
        user_id,
        Stage::PendingAdminReview {
            order,
            buyer_name: user_name.to_string(),
        },
    );
    state
        .transport
        .send_text(chat_id, "🕐 受け取り確認中です。しばらくお待ちください。", &[])
        .await?;
    Ok(())
}

/// /cancel — どのステージからでも即時に抜ける。
/// フルフィルメント前は在庫を確保していないので、返却処理は不要。
pub async fn cancel(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    let cleared = state.sessions.lock().await.clear(user_id);
    let reply = if cleared.is_some() {
        "キャンセルしました。/start からやり直せます。"
    } else {
        "進行中の操作はありません。"
    };
    state.transport.send_text(chat_id, reply, &[]).await?;
    Ok(())
}

// ========================================
// カード決済
// ========================================

/// カード決済ボタン。チェックアウトセッションを発行し、
/// 支払い完了は Webhook 側が拾って自動フルフィルメントする。
pub async fn card_checkout(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    user_id: i64,
    user_name: &str,
) -> anyhow::Result<()> {
    if !card_enabled(state) {
        state
            .transport
            .answer_callback(callback_id, Some("カード決済は現在利用できません。"), true)
            .await?;
        return Ok(());
    }

    let stage = state.sessions.lock().await.stage_cloned(user_id);
    let Some(Stage::AwaitingPaymentConfirmation { order }) = stage else {
        state
            .transport
            .answer_callback(callback_id, Some("⚠️ 先に商品と数量を選んでください。"), false)
            .await?;
        return Ok(());
    };

    let session_id = Uuid::new_v4().to_string();
    state.checkouts.lock().await.insert(
        session_id.clone(),
        CheckoutSession {
            user_id,
            user_name: user_name.to_string(),
            product: order.product.clone(),
            quantity: order.quantity,
            amount: order.total,
            code: order.code.clone(),
        },
    );

    let pay_link = {
        let ledger = state.ledger.lock().await;
        ledger
            .doc
            .links
            .get(&order.product)
            .and_then(|l| l.url.clone())
    };
    let mut text = format!(
        "💳 カード決済\n注文ID: {}\n金額: {}円\n",
        session_id, order.total
    );
    match pay_link {
        Some(url) => text.push_str(&format!("\nこちらからお支払いください👇\n{}\n", url)),
        None => text.push_str("\n⚠️ 支払いリンクが未設定です。管理者にお問い合わせください。\n"),
    }
    text.push_str("\n支払いが確認されると自動で商品をお送りします。");

    info!(
        "チェックアウトセッション発行: session={} user={} product={} qty={} amount={}",
        session_id, user_id, order.product, order.quantity, order.total
    );
    state.transport.send_text(chat_id, &text, &[]).await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

// ========================================
// 保証
// ========================================

/// /保証 — 対象タイプの選択ボタンを出す
pub async fn warranty_start(state: &Arc<AppState>, chat_id: i64) -> anyhow::Result<()> {
    let buttons = {
        let ledger = state.ledger.lock().await;
        let mut names: Vec<&String> = ledger.doc.links.keys().collect();
        names.sort();
        names
            .iter()
            .map(|name| vec![Button::new(name, &format!("warranty_{}", name))])
            .collect::<Vec<_>>()
    };
    state
        .transport
        .send_text(chat_id, "どちらのタイプの保証ですか？", &buttons)
        .await?;
    Ok(())
}

pub async fn warranty_select(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    user_id: i64,
    product: &str,
) -> anyhow::Result<()> {
    state.sessions.lock().await.set(
        user_id,
        Stage::AwaitingWarrantyVideo {
            product: product.to_string(),
        },
    );
    state
        .transport
        .send_text(
            chat_id,
            "🎞️ 保証対象の動画（読み取り画面の録画）を送信してください。",
            &[],
        )
        .await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

/// 保証動画受信 → 管理者へ転送して判断待ちへ
pub async fn warranty_video(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    user_name: &str,
    product: &str,
    file_id: String,
) -> anyhow::Result<()> {
    let caption = format!(
        "🎥 保証リクエスト\nユーザー: {}\nID: {}\nタイプ: {}",
        user_name, user_id, product
    );
    let buttons = vec![vec![
        Button::new("✅ 保証する", &format!("approve_{}", user_id)),
        Button::new("❌ 却下", &format!("deny_{}", user_id)),
    ]];
    state
        .transport
        .send_video(state.config.admin_id, &file_id, &caption, &buttons)
        .await?;

    state.sessions.lock().await.set(
        user_id,
        Stage::WarrantyPending {
            product: product.to_string(),
        },
    );
    state
        .transport
        .send_text(
            chat_id,
            "🎞️ 動画を受け取りました。管理者の確認をお待ちください。",
            &[],
        )
        .await?;
    Ok(())
}

// ========================================
// 問い合わせ
// ========================================

pub async fn inquiry_start(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    state.sessions.lock().await.set(user_id, Stage::EnteringInquiry);
    state
        .transport
        .send_text(chat_id, "✉️ お問い合わせ内容を送信してください。", &[])
        .await?;
    Ok(())
}

/// 問い合わせ本文 → 管理者へ転送（返信ボタン付き）
pub async fn inquiry_input(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    user_name: &str,
    text: &str,
) -> anyhow::Result<()> {
    let forwarded = format!(
        "📨 お問い合わせ\n👤 {}（{}）\n\n{}",
        user_name, user_id, text
    );
    state
        .transport
        .send_text(
            state.config.admin_id,
            &forwarded,
            &[vec![Button::new("✉️ 返信する", &format!("reply_{}", user_id))]],
        )
        .await?;

    state.sessions.lock().await.clear(user_id);
    state
        .transport
        .send_text(
            chat_id,
            "お問い合わせを受け付けました。返信をお待ちください。",
            &[],
        )
        .await?;
    Ok(())
}
