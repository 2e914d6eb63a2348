//! 管理者フロー
//! 支払い承認/却下・在庫登録・商品/価格設定・クーポン管理・
//! 購入履歴・バックアップ操作

use std::sync::Arc;

use tracing::warn;

use crate::fulfill;
use crate::inventory::{self, StockError};
use crate::models::ProductLink;
use crate::session::{ConfigField, Stage};
use crate::transport::Button;
use crate::AppState;

// ========================================
// 支払い承認・却下
// ========================================

/// ✅ 確認完了ボタン。在庫を払い出して購入者へ配信する。
pub async fn approve_purchase(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    message_id: i64,
    target: i64,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(target);
    let Some(Stage::PendingAdminReview { order, buyer_name }) = stage else {
        state
            .transport
            .answer_callback(callback_id, Some("⚠️ ユーザーデータが見つかりません。"), true)
            .await?;
        return Ok(());
    };

    let (product, quantity, total, code) = (
        order.product.clone(),
        order.quantity,
        order.total,
        order.code.clone(),
    );

    match fulfill::fulfill(state, target, &buyer_name, &product, quantity, total, code).await {
        Ok(remaining) => {
            // 完了後に初めて状態を消す（ここまでは再試行可能）
            state.sessions.lock().await.clear(target);
            let summary = format!(
                "✅ {} を{}枚送信しました。残り在庫: {}枚",
                product, quantity, remaining
            );
            // 承認ボタンはスクリーンショット（画像）に付いているのでキャプション編集
            if state
                .transport
                .edit_caption(chat_id, message_id, &summary)
                .await
                .is_err()
            {
                state.transport.send_text(chat_id, &summary, &[]).await?;
            }
            state.transport.answer_callback(callback_id, None, false).await?;
        }
        Err(StockError::Insufficient { .. }) => {
            // 購入者の状態は残し、入荷後に再承認できるようにする
            state
                .transport
                .send_text(
                    target,
                    "⚠️ 現在この商品の在庫が不足しています。入荷後にあらためてお送りします。",
                    &[],
                )
                .await
                .ok();
            state
                .transport
                .answer_callback(callback_id, Some("❌ 在庫がありません。"), true)
                .await?;
        }
        Err(e) => {
            warn!("フルフィルメント失敗: {}", e);
            state
                .transport
                .answer_callback(callback_id, Some(&format!("⚠️ {}", e)), true)
                .await?;
        }
    }
    Ok(())
}

/// ❌ 却下ボタン。理由の入力を待つ。
pub async fn begin_rejection(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    admin_id: i64,
    target: i64,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(target);
    if !matches!(stage, Some(Stage::PendingAdminReview { .. })) {
        state
            .transport
            .answer_callback(callback_id, Some("⚠️ ユーザーデータが見つかりません。"), true)
            .await?;
        return Ok(());
    }

    state
        .sessions
        .lock()
        .await
        .set(admin_id, Stage::AwaitingRejectionReason { target });
    state
        .transport
        .send_text(chat_id, "却下理由を入力してください。", &[])
        .await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

/// 却下理由テキスト。購入者へそのまま伝えて両者の状態を消す。
pub async fn rejection_reason_input(
    state: &Arc<AppState>,
    chat_id: i64,
    admin_id: i64,
    target: i64,
    reason: &str,
) -> anyhow::Result<()> {
    state
        .transport
        .send_text(
            target,
            &format!(
                "❌ お支払いを確認できませんでした。\n理由: {}\n\nご不明な点は /問い合わせ からご連絡ください。",
                reason
            ),
            &[],
        )
        .await
        .ok();

    let mut sessions = state.sessions.lock().await;
    sessions.clear(target);
    sessions.clear(admin_id);
    drop(sessions);

    state
        .transport
        .send_text(chat_id, "却下を購入者へ送信しました。", &[])
        .await?;
    Ok(())
}

// ========================================
// 保証の承認・却下
// ========================================

pub async fn warranty_approve(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    message_id: i64,
    target: i64,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(target);
    let Some(Stage::WarrantyPending { product }) = stage else {
        state
            .transport
            .answer_callback(callback_id, Some("⚠️ データが見つかりません。"), true)
            .await?;
        return Ok(());
    };

    match fulfill::resend_unit(state, target, &product).await {
        Ok(remaining) => {
            state.sessions.lock().await.clear(target);
            let summary = format!(
                "✅ {} の保証を承認し、再送しました。残り在庫: {}枚",
                product, remaining
            );
            if state
                .transport
                .edit_caption(chat_id, message_id, &summary)
                .await
                .is_err()
            {
                state.transport.send_text(chat_id, &summary, &[]).await?;
            }
            state.transport.answer_callback(callback_id, None, false).await?;
        }
        Err(StockError::Insufficient { .. }) => {
            state
                .transport
                .answer_callback(callback_id, Some("❌ 在庫がありません。"), true)
                .await?;
        }
        Err(e) => {
            state
                .transport
                .answer_callback(callback_id, Some(&format!("⚠️ {}", e)), true)
                .await?;
        }
    }
    Ok(())
}

pub async fn warranty_deny(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    message_id: i64,
    target: i64,
) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(target);
    if !matches!(stage, Some(Stage::WarrantyPending { .. })) {
        state
            .transport
            .answer_callback(callback_id, Some("⚠️ データが見つかりません。"), true)
            .await?;
        return Ok(());
    }

    state
        .transport
        .send_text(target, "⚠️ 保証リクエストは却下されました。", &[])
        .await
        .ok();
    state.sessions.lock().await.clear(target);

    if state
        .transport
        .edit_caption(chat_id, message_id, "❌ 保証リクエストを却下しました。")
        .await
        .is_err()
    {
        state
            .transport
            .send_text(chat_id, "❌ 保証リクエストを却下しました。", &[])
            .await?;
    }
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

// ========================================
// 問い合わせへの返信
// ========================================

pub async fn begin_reply(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    admin_id: i64,
    target: i64,
) -> anyhow::Result<()> {
    state
        .sessions
        .lock()
        .await
        .set(admin_id, Stage::ComposingReply { target });
    state
        .transport
        .send_text(chat_id, "返信内容を入力してください。", &[])
        .await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

pub async fn reply_input(
    state: &Arc<AppState>,
    chat_id: i64,
    admin_id: i64,
    target: i64,
    text: &str,
) -> anyhow::Result<()> {
    state
        .transport
        .send_text(target, &format!("📩 運営からの返信\n\n{}", text), &[])
        .await
        .ok();
    state.sessions.lock().await.clear(admin_id);
    state
        .transport
        .send_text(chat_id, "返信を送信しました。", &[])
        .await?;
    Ok(())
}

// ========================================
// 在庫管理
// ========================================

/// /addstock <商品名> — 在庫画像の受付ステージへ
pub async fn addstock(
    state: &Arc<AppState>,
    chat_id: i64,
    admin_id: i64,
    args: &str,
) -> anyhow::Result<()> {
    let product = args.trim();
    let known = {
        let ledger = state.ledger.lock().await;
        ledger.doc.links.contains_key(product)
    };
    if product.is_empty() || !known {
        let list = product_list(state).await;
        state
            .transport
            .send_text(
                chat_id,
                &format!("使い方: /addstock <商品名>\n商品: {}", list),
                &[],
            )
            .await?;
        return Ok(());
    }

    state.sessions.lock().await.set(
        admin_id,
        Stage::AddingStock {
            product: product.to_string(),
        },
    );
    state
        .transport
        .send_text(
            chat_id,
            &format!(
                "🖼️ {} の在庫画像を送ってください（複数可）。終わったら /done を送ってください。",
                product
            ),
            &[],
        )
        .await?;
    Ok(())
}

/// 在庫登録ステージで受けた画像1枚 = 在庫1枚
pub async fn stock_photo(
    state: &Arc<AppState>,
    chat_id: i64,
    _admin_id: i64,
    product: &str,
    file_id: String,
) -> anyhow::Result<()> {
    let result = {
        let mut ledger = state.ledger.lock().await;
        let result = inventory::add_unit(&mut ledger.doc, product, file_id);
        if result.is_ok() {
            ledger.save().await;
        }
        result
    };

    match result {
        Ok(count) => {
            state
                .transport
                .send_text(
                    chat_id,
                    &format!("✅ {} に在庫を追加しました。現在 {}枚", product, count),
                    &[],
                )
                .await?;
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

/// /done — 在庫登録ステージを終了
pub async fn done(state: &Arc<AppState>, chat_id: i64, admin_id: i64) -> anyhow::Result<()> {
    let stage = state.sessions.lock().await.stage_cloned(admin_id);
    let Some(Stage::AddingStock { product }) = stage else {
        state
            .transport
            .send_text(chat_id, "進行中の在庫登録はありません。", &[])
            .await?;
        return Ok(());
    };

    state.sessions.lock().await.clear(admin_id);
    let count = {
        let ledger = state.ledger.lock().await;
        inventory::available(&ledger.doc, &product)
    };
    state
        .transport
        .send_text(
            chat_id,
            &format!("在庫登録を終了しました。{} は現在 {}枚です。", product, count),
            &[],
        )
        .await?;
    Ok(())
}

/// /stock — 在庫一覧
pub async fn stock(state: &Arc<AppState>, chat_id: i64) -> anyhow::Result<()> {
    let text = {
        let ledger = state.ledger.lock().await;
        let mut names: Vec<&String> = ledger.doc.links.keys().collect();
        names.sort();
        let mut text = String::from("📦 現在の在庫\n");
        for name in names {
            text.push_str(&format!(
                "{}: {}枚\n",
                name,
                inventory::available(&ledger.doc, name)
            ));
        }
        text
    };
    state.transport.send_text(chat_id, &text, &[]).await?;
    Ok(())
}

// ========================================
// 商品・価格設定
// ========================================

/// /addproduct <商品名> — 価格0・リンク未設定で商品を作成
pub async fn addproduct(state: &Arc<AppState>, chat_id: i64, args: &str) -> anyhow::Result<()> {
    let Some(name) = args.split_whitespace().next() else {
        state
            .transport
            .send_text(chat_id, "使い方: /addproduct <商品名>", &[])
            .await?;
        return Ok(());
    };

    let created = {
        let mut ledger = state.ledger.lock().await;
        if ledger.doc.links.contains_key(name) {
            false
        } else {
            ledger
                .doc
                .links
                .insert(name.to_string(), ProductLink::new(0, None));
            ledger.doc.stock.entry(name.to_string()).or_default();
            ledger.save().await;
            true
        }
    };

    let reply = if created {
        format!(
            "✅ 商品「{}」を追加しました。/config で価格とリンクを設定してください。",
            name
        )
    } else {
        "⚠️ その商品は既に存在します。".to_string()
    };
    state.transport.send_text(chat_id, &reply, &[]).await?;
    Ok(())
}

/// /config — 編集する商品を選ぶ
pub async fn config_menu(state: &Arc<AppState>, chat_id: i64) -> anyhow::Result<()> {
    let buttons = {
        let ledger = state.ledger.lock().await;
        let mut names: Vec<&String> = ledger.doc.links.keys().collect();
        names.sort();
        names
            .iter()
            .map(|name| vec![Button::new(name, &format!("cfg_{}", name))])
            .collect::<Vec<_>>()
    };
    state
        .transport
        .send_text(chat_id, "⚙️ 設定する商品を選んでください。", &buttons)
        .await?;
    Ok(())
}

/// 商品選択 → 編集項目の選択
pub async fn config_product_menu(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    product: &str,
) -> anyhow::Result<()> {
    let current = {
        let ledger = state.ledger.lock().await;
        ledger.doc.links.get(product).cloned()
    };
    let Some(link) = current else {
        state
            .transport
            .answer_callback(callback_id, Some("⚠️ 商品が見つかりません。"), true)
            .await?;
        return Ok(());
    };

    let text = format!(
        "⚙️ {} の現在の設定\n通常価格: {}円\n支払いリンク: {}\n割引価格: {}\n割引リンク: {}\n\nどの項目を変更しますか？",
        product,
        link.price,
        link.url.as_deref().unwrap_or("未設定"),
        link.discount_price
            .map(|p| format!("{}円", p))
            .unwrap_or_else(|| "未設定".to_string()),
        link.discount_link.as_deref().unwrap_or("未設定"),
    );
    let buttons: Vec<Vec<Button>> = [
        ConfigField::Price,
        ConfigField::Url,
        ConfigField::DiscountPrice,
        ConfigField::DiscountLink,
    ]
    .iter()
    .map(|f| {
        vec![Button::new(
            f.label(),
            &format!("cfgf_{}_{}", f.key(), product),
        )]
    })
    .collect();

    state.transport.send_text(chat_id, &text, &buttons).await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

/// 編集項目の選択 → 値の入力ステージへ。payload は "<field>_<商品名>"。
pub async fn config_field_select(
    state: &Arc<AppState>,
    callback_id: &str,
    chat_id: i64,
    admin_id: i64,
    payload: &str,
) -> anyhow::Result<()> {
    let Some((key, product)) = payload.split_once('_') else {
        state.transport.answer_callback(callback_id, None, false).await?;
        return Ok(());
    };
    let Some(field) = ConfigField::from_key(key) else {
        state.transport.answer_callback(callback_id, None, false).await?;
        return Ok(());
    };

    state.sessions.lock().await.set(
        admin_id,
        Stage::EditingConfigField {
            product: product.to_string(),
            field,
        },
    );
    let hint = match field {
        ConfigField::Price => "数字で入力してください。",
        ConfigField::DiscountPrice => "数字で入力してください（未設定に戻すには - を送信）。",
        ConfigField::Url | ConfigField::DiscountLink => {
            "URLを入力してください（未設定に戻すには - を送信）。"
        }
    };
    state
        .transport
        .send_text(
            chat_id,
            &format!("新しい{}を入力してください。{}", field.label(), hint),
            &[],
        )
        .await?;
    state.transport.answer_callback(callback_id, None, false).await?;
    Ok(())
}

/// 設定値の入力。検証に通らない限りステージは維持される。
pub async fn config_value_input(
    state: &Arc<AppState>,
    chat_id: i64,
    admin_id: i64,
    product: &str,
    field: ConfigField,
    text: &str,
) -> anyhow::Result<()> {
    let value = text.trim();

    enum Parsed {
        Price(i64),
        MaybePrice(Option<i64>),
        MaybeUrl(Option<String>),
    }

    let parsed = match field {
        ConfigField::Price => match parse_price(value) {
            Some(p) => Parsed::Price(p),
            None => {
                state
                    .transport
                    .send_text(chat_id, "⚠️ 価格は0以上の数字で入力してください。", &[])
                    .await?;
                return Ok(());
            }
        },
        ConfigField::DiscountPrice => {
            if value == "-" {
                Parsed::MaybePrice(None)
            } else {
                match parse_price(value) {
                    Some(p) => Parsed::MaybePrice(Some(p)),
                    None => {
                        state
                            .transport
                            .send_text(chat_id, "⚠️ 価格は0以上の数字で入力してください。", &[])
                            .await?;
                        return Ok(());
                    }
                }
            }
        }
        ConfigField::Url | ConfigField::DiscountLink => {
            if value == "-" {
                Parsed::MaybeUrl(None)
            } else if is_url(value) {
                Parsed::MaybeUrl(Some(value.to_string()))
            } else {
                state
                    .transport
                    .send_text(
                        chat_id,
                        "⚠️ URLは http:// または https:// で始まる形式で入力してください。",
                        &[],
                    )
                    .await?;
                return Ok(());
            }
        }
    };

    let updated = {
        let mut ledger = state.ledger.lock().await;
        match ledger.doc.links.get_mut(product) {
            Some(link) => {
                match parsed {
                    Parsed::Price(p) => link.price = p,
                    Parsed::MaybePrice(p) => link.discount_price = p,
                    Parsed::MaybeUrl(url) => match field {
                        ConfigField::Url => link.url = url,
                        _ => link.discount_link = url,
                    },
                }
                ledger.save().await;
                true
            }
            None => false,
        }
    };

    state.sessions.lock().await.clear(admin_id);
    let reply = if updated {
        format!("✅ {} の{}を更新しました。", product, field.label())
    } else {
        "⚠️ 商品が見つかりません。".to_string()
    };
    state.transport.send_text(chat_id, &reply, &[]).await?;
    Ok(())
}

fn parse_price(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().filter(|p| *p >= 0)
}

fn is_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

// ========================================
// クーポン管理
// ========================================

/// /issuecode <商品名> [割引額]
pub async fn issuecode(state: &Arc<AppState>, chat_id: i64, args: &str) -> anyhow::Result<()> {
    let mut parts = args.split_whitespace();
    let (Some(product), amount) = (parts.next(), parts.next()) else {
        state
            .transport
            .send_text(chat_id, "使い方: /issuecode <商品名> [割引額]", &[])
            .await?;
        return Ok(());
    };

    let amount = match amount {
        Some(raw) => match raw.parse::<i64>().ok().filter(|v| *v > 0) {
            Some(v) => Some(v),
            None => {
                state
                    .transport
                    .send_text(chat_id, "⚠️ 割引額は1以上の数字で入力してください。", &[])
                    .await?;
                return Ok(());
            }
        },
        None => None,
    };

    let issued = {
        let mut ledger = state.ledger.lock().await;
        if !ledger.doc.links.contains_key(product) {
            None
        } else {
            let code = ledger.issue_code(product, amount);
            ledger.save().await;
            Some(code)
        }
    };

    let reply = match issued {
        Some(code) => format!(
            "🎫 クーポンを発行しました\nコード: {}\n対象: {}\n割引: {}",
            code,
            product,
            amount
                .map(|v| format!("{}円引き", v))
                .unwrap_or_else(|| "商品の割引価格を適用".to_string()),
        ),
        None => {
            let list = product_list(state).await;
            format!("⚠️ 商品が見つかりません。商品: {}", list)
        }
    };
    state.transport.send_text(chat_id, &reply, &[]).await?;
    Ok(())
}

/// /codes — クーポン一覧
pub async fn codes(state: &Arc<AppState>, chat_id: i64) -> anyhow::Result<()> {
    let text = {
        let ledger = state.ledger.lock().await;
        if ledger.doc.codes.is_empty() {
            "クーポンはありません。".to_string()
        } else {
            let mut entries: Vec<(&String, &crate::models::CodeEntry)> =
                ledger.doc.codes.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut text = String::from("🎫 クーポン一覧\n");
            for (code, entry) in entries {
                text.push_str(&format!(
                    "{}: {} {}{}\n",
                    code,
                    entry.target,
                    if entry.used { "使用済み" } else { "未使用" },
                    entry
                        .discount_value
                        .map(|v| format!("（-{}円）", v))
                        .unwrap_or_default(),
                ));
            }
            text
        }
    };
    state.transport.send_text(chat_id, &text, &[]).await?;
    Ok(())
}

/// /resetcodes [商品名] — 使用済みクーポンを未使用へ戻す
pub async fn resetcodes(state: &Arc<AppState>, chat_id: i64, args: &str) -> anyhow::Result<()> {
    let product = args.split_whitespace().next();
    let count = {
        let mut ledger = state.ledger.lock().await;
        let count = ledger.reset_codes(product);
        if count > 0 {
            ledger.save().await;
        }
        count
    };
    state
        .transport
        .send_text(
            chat_id,
            &format!("♻️ {}件のクーポンを未使用に戻しました。", count),
            &[],
        )
        .await?;
    Ok(())
}

/// /delcode <コード>
pub async fn delcode(state: &Arc<AppState>, chat_id: i64, args: &str) -> anyhow::Result<()> {
    let Some(code) = args.split_whitespace().next() else {
        state
            .transport
            .send_text(chat_id, "使い方: /delcode <コード>", &[])
            .await?;
        return Ok(());
    };
    let code = code.to_uppercase();

    let removed = {
        let mut ledger = state.ledger.lock().await;
        let removed = ledger.doc.codes.remove(&code).is_some();
        if removed {
            ledger.save().await;
        }
        removed
    };

    let reply = if removed {
        format!("🗑️ クーポン {} を削除しました。", code)
    } else {
        "⚠️ クーポンが見つかりません。".to_string()
    };
    state.transport.send_text(chat_id, &reply, &[]).await?;
    Ok(())
}

// ========================================
// レポート・バックアップ
// ========================================

/// /log — 直近の購入履歴
pub async fn purchase_log(state: &Arc<AppState>, chat_id: i64) -> anyhow::Result<()> {
    let text = {
        let purchases = state.purchases.lock().await;
        if purchases.is_empty() {
            "購入履歴はありません。".to_string()
        } else {
            let mut text = format!("📜 購入履歴（直近{}件）\n", purchases.len().min(20));
            for record in purchases.iter().rev().take(20) {
                text.push_str(&format!(
                    "{} {}({}) {}×{} {}円{}\n",
                    record.at.format("%m/%d %H:%M"),
                    record.user_name,
                    record.user_id,
                    record.product,
                    record.quantity,
                    record.total,
                    record
                        .code
                        .as_deref()
                        .map(|c| format!(" 🎫{}", c))
                        .unwrap_or_default(),
                ));
            }
            text
        }
    };
    state.transport.send_text(chat_id, &text, &[]).await?;
    Ok(())
}

/// /backup [ラベル]
pub async fn backup(state: &Arc<AppState>, chat_id: i64, args: &str) -> anyhow::Result<()> {
    let label = args.split_whitespace().next();
    let result = {
        let ledger = state.ledger.lock().await;
        ledger.snapshot(label).await
    };
    let reply = match result {
        Ok(name) => format!("💾 バックアップを作成しました: {}", name),
        Err(e) => format!("⚠️ バックアップに失敗しました: {}", e),
    };
    state.transport.send_text(chat_id, &reply, &[]).await?;
    Ok(())
}

/// /backups — 一覧
pub async fn backups(state: &Arc<AppState>, chat_id: i64) -> anyhow::Result<()> {
    let result = {
        let ledger = state.ledger.lock().await;
        ledger.list_backups().await
    };
    let reply = match result {
        Ok(names) if names.is_empty() => "バックアップはありません。".to_string(),
        Ok(names) => format!("💾 バックアップ一覧\n{}", names.join("\n")),
        Err(e) => format!("⚠️ 一覧を取得できません: {}", e),
    };
    state.transport.send_text(chat_id, &reply, &[]).await?;
    Ok(())
}

/// /restore <ファイル名> — 破壊的。ライブ状態をバックアップで置き換える。
pub async fn restore(state: &Arc<AppState>, chat_id: i64, args: &str) -> anyhow::Result<()> {
    let Some(name) = args.split_whitespace().next() else {
        state
            .transport
            .send_text(chat_id, "使い方: /restore <ファイル名>（/backups で一覧）", &[])
            .await?;
        return Ok(());
    };

    let result = {
        let mut ledger = state.ledger.lock().await;
        ledger.restore(name).await
    };
    let reply = match result {
        Ok(()) => format!("♻️ 復元しました: {}", name),
        Err(e) => format!("⚠️ 復元に失敗しました: {}", e),
    };
    state.transport.send_text(chat_id, &reply, &[]).await?;
    Ok(())
}

// ========================================
// Helper Functions
// ========================================

async fn product_list(state: &Arc<AppState>) -> String {
    let ledger = state.ledger.lock().await;
    let mut names: Vec<&String> = ledger.doc.links.keys().collect();
    names.sort();
    if names.is_empty() {
        "（なし）".to_string()
    } else {
        names
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}
