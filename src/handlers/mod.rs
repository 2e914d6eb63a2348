//! Handlers
//! 受信イベントのディスパッチ。テキストはまずコマンドとして、次に
//! そのユーザーの現在ステージが期待する入力として解釈する。
//! ステージ無し・解釈不能な入力は明示的な no-op。

pub mod admin;
pub mod buyer;

use std::sync::Arc;

use tracing::warn;

use crate::session::Stage;
use crate::transport::Event;
use crate::AppState;

/// 受信イベント1件を処理する。エラーはここで握ってログに残し、
/// ポーリングループへは伝播させない。
pub async fn dispatch(state: &Arc<AppState>, event: Event) {
    let result = match event {
        Event::Text {
            chat_id,
            user_id,
            user_name,
            text,
        } => on_text(state, chat_id, user_id, &user_name, text.trim()).await,
        Event::Callback {
            callback_id,
            chat_id,
            message_id,
            user_id,
            user_name,
            data,
        } => {
            on_callback(
                state,
                &callback_id,
                chat_id,
                message_id,
                user_id,
                &user_name,
                &data,
            )
            .await
        }
        Event::Photo {
            chat_id,
            user_id,
            user_name,
            file_id,
        } => on_photo(state, chat_id, user_id, &user_name, file_id).await,
        Event::Video {
            chat_id,
            user_id,
            user_name,
            file_id,
        } => on_video(state, chat_id, user_id, &user_name, file_id).await,
    };

    if let Err(e) = result {
        warn!("イベント処理でエラー: {:#}", e);
    }
}

pub fn is_admin(state: &AppState, user_id: i64) -> bool {
    user_id == state.config.admin_id
}

// ========================================
// テキスト
// ========================================

async fn on_text(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    user_name: &str,
    text: &str,
) -> anyhow::Result<()> {
    // コマンドはステージより優先（/cancel でいつでも抜けられる）
    if let Some(rest) = text.strip_prefix('/') {
        return on_command(state, chat_id, user_id, rest).await;
    }

    let stage = state.sessions.lock().await.stage_cloned(user_id);
    match stage {
        Some(Stage::EnteringQuantity { product }) => {
            buyer::quantity_input(state, chat_id, user_id, &product, text).await
        }
        Some(Stage::AwaitingDiscountCode { order }) => {
            buyer::code_input(state, chat_id, user_id, order, text).await
        }
        Some(Stage::AwaitingPaymentConfirmation { order }) => {
            buyer::payment_confirmation_input(state, chat_id, user_id, order, text).await
        }
        Some(Stage::EnteringInquiry) => {
            buyer::inquiry_input(state, chat_id, user_id, user_name, text).await
        }
        Some(Stage::AwaitingRejectionReason { target }) => {
            admin::rejection_reason_input(state, chat_id, user_id, target, text).await
        }
        Some(Stage::ComposingReply { target }) => {
            admin::reply_input(state, chat_id, user_id, target, text).await
        }
        Some(Stage::EditingConfigField { product, field }) => {
            admin::config_value_input(state, chat_id, user_id, &product, field, text).await
        }
        // テキスト入力を待たないステージでは無視する
        Some(_) => Ok(()),
        None => no_stage_text(state, chat_id, text).await,
    }
}

/// ステージ外のテキスト
async fn no_stage_text(state: &Arc<AppState>, chat_id: i64, text: &str) -> anyhow::Result<()> {
    if text.contains("完了") {
        state
            .transport
            .send_text(chat_id, "⚠️ まず /start から始めてください。", &[])
            .await?;
    }
    Ok(())
}

async fn on_command(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    rest: &str,
) -> anyhow::Result<()> {
    let (name, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    let name = name.split('@').next().unwrap_or(name);
    let args = args.trim();

    match name {
        // ---- 全ユーザー ----
        "start" => return buyer::start(state, chat_id, user_id).await,
        "help" => return send_help(state, chat_id, user_id).await,
        "cancel" => return buyer::cancel(state, chat_id, user_id).await,
        "保証" => return buyer::warranty_start(state, chat_id).await,
        "問い合わせ" => return buyer::inquiry_start(state, chat_id, user_id).await,
        _ => {}
    }

    // ---- 管理者専用 ----
    if !is_admin(state, user_id) {
        if matches!(
            name,
            "addstock"
                | "done"
                | "stock"
                | "addproduct"
                | "config"
                | "issuecode"
                | "codes"
                | "resetcodes"
                | "delcode"
                | "log"
                | "backup"
                | "backups"
                | "restore"
        ) {
            state
                .transport
                .send_text(chat_id, "権限がありません。", &[])
                .await?;
        }
        // 未知のコマンドは黙って無視する
        return Ok(());
    }

    match name {
        "addstock" => admin::addstock(state, chat_id, user_id, args).await,
        "done" => admin::done(state, chat_id, user_id).await,
        "stock" => admin::stock(state, chat_id).await,
        "addproduct" => admin::addproduct(state, chat_id, args).await,
        "config" => admin::config_menu(state, chat_id).await,
        "issuecode" => admin::issuecode(state, chat_id, args).await,
        "codes" => admin::codes(state, chat_id).await,
        "resetcodes" => admin::resetcodes(state, chat_id, args).await,
        "delcode" => admin::delcode(state, chat_id, args).await,
        "log" => admin::purchase_log(state, chat_id).await,
        "backup" => admin::backup(state, chat_id, args).await,
        "backups" => admin::backups(state, chat_id).await,
        "restore" => admin::restore(state, chat_id, args).await,
        _ => Ok(()),
    }
}

// ========================================
// コールバック（ボタン押下）
// ========================================

async fn on_callback(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    message_id: i64,
    user_id: i64,
    user_name: &str,
    data: &str,
) -> anyhow::Result<()> {
    // ---- 購入者が押すボタン ----
    if let Some(product) = data.strip_prefix("type_") {
        return buyer::select_product(state, callback_id, chat_id, user_id, product).await;
    }
    if let Some(product) = data.strip_prefix("warranty_") {
        return buyer::warranty_select(state, callback_id, chat_id, user_id, product).await;
    }
    match data {
        "coupon" => return buyer::coupon_prompt(state, callback_id, chat_id, user_id).await,
        "back_pay" => return buyer::back_to_payment(state, callback_id, chat_id, user_id).await,
        "card" => {
            return buyer::card_checkout(state, callback_id, chat_id, user_id, user_name).await
        }
        _ => {}
    }

    // ---- ここから管理者専用ボタン ----
    if !is_admin(state, user_id) {
        state
            .transport
            .answer_callback(callback_id, Some("権限がありません。"), true)
            .await?;
        return Ok(());
    }

    if let Some(target) = parse_target(data, "confirm_") {
        return admin::approve_purchase(state, callback_id, chat_id, message_id, target).await;
    }
    if let Some(target) = parse_target(data, "reject_") {
        return admin::begin_rejection(state, callback_id, chat_id, user_id, target).await;
    }
    if let Some(target) = parse_target(data, "approve_") {
        return admin::warranty_approve(state, callback_id, chat_id, message_id, target).await;
    }
    if let Some(target) = parse_target(data, "deny_") {
        return admin::warranty_deny(state, callback_id, chat_id, message_id, target).await;
    }
    if let Some(target) = parse_target(data, "reply_") {
        return admin::begin_reply(state, callback_id, chat_id, user_id, target).await;
    }
    if let Some(product) = data.strip_prefix("cfg_") {
        return admin::config_product_menu(state, callback_id, chat_id, product).await;
    }
    if let Some(rest) = data.strip_prefix("cfgf_") {
        return admin::config_field_select(state, callback_id, chat_id, user_id, rest).await;
    }

    warn!("未知のコールバックペイロード: {}", data);
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

fn parse_target(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?.parse().ok()
}

// ========================================
// 画像・動画
// ========================================

async fn on_photo(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    user_name: &str,
    file_id: String,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(user_id);
    match stage {
        Some(Stage::AddingStock { product }) => {
            admin::stock_photo(state, chat_id, user_id, &product, file_id).await
        }
        Some(Stage::AwaitingScreenshot { order }) => {
            buyer::screenshot(state, chat_id, user_id, user_name, order, file_id).await
        }
        // 期待していない画像は読み飛ばす
        _ => Ok(()),
    }
}

async fn on_video(
    state: &Arc<AppState>,
    chat_id: i64,
    user_id: i64,
    user_name: &str,
    file_id: String,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(user_id);
    match stage {
        Some(Stage::AwaitingWarrantyVideo { product }) => {
            buyer::warranty_video(state, chat_id, user_id, user_name, &product, file_id).await
        }
        _ => Ok(()),
    }
}

// ========================================
// ヘルプ
// ========================================

async fn send_help(state: &Arc<AppState>, chat_id: i64, user_id: i64) -> anyhow::Result<()> {
    let mut text = String::from(
        "🧭 コマンド一覧\n\n\
         【ユーザー向け】\n\
         /start - 購入メニューを開く\n\
         /保証 - 保証申請を行う\n\
         /問い合わせ - 運営への問い合わせ\n\
         /cancel - 進行中の操作を取り消す\n\
         /help - この一覧を表示\n",
    );
    if is_admin(state, user_id) {
        text.push_str(
            "\n【管理者専用】\n\
             /addstock <商品名> - 在庫を追加（/done で終了）\n\
             /stock - 在庫確認\n\
             /addproduct <商品名> - 商品を追加\n\
             /config - 価格・リンク設定\n\
             /issuecode <商品名> [割引額] - クーポン発行\n\
             /codes - クーポン一覧\n\
             /resetcodes [商品名] - クーポンを未使用へ戻す\n\
             /delcode <コード> - クーポン削除\n\
             /log - 購入履歴\n\
             /backup [ラベル] - バックアップ作成\n\
             /backups - バックアップ一覧\n\
             /restore <ファイル名> - バックアップから復元\n",
        );
    }
    state.transport.send_text(chat_id, &text, &[]).await?;
    Ok(())
}

// ========================================
// Tests（対話シナリオ）
// ========================================
