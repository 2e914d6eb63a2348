//! eSIM自販機Bot
//! Telegram 上で eSIM バウチャー画像を販売する単一運営者向けBot。
//! 購入フローは会話ステートマシンで進み、在庫・価格・クーポンは
//! JSON 台帳として永続化する。支払い確認は管理者の手動承認が基本で、
//! カード決済の Webhook 経由の自動承認を任意で併用できる。

mod config;
mod fulfill;
mod handlers;
mod inventory;
mod ledger;
mod models;
mod pricing;
mod session;
mod telegram;
#[cfg(test)]
mod test_support;
mod transport;
mod webhook;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{info, warn};

use config::AppConfig;
use ledger::Ledger;
use models::{CheckoutSession, PurchaseRecord};
use session::SessionManager;
use transport::ChatTransport;

/// プロセス全体で共有する状態。
///
/// 共有コレクションはすべて Mutex 越しに触る。ポーリングループと
/// Webhook サーバが並行に走るため、在庫の確認と取り出しは必ず
/// 台帳ロックの内側で一息に行うこと（inventory::allocate 参照）。
pub struct AppState {
    pub config: AppConfig,
    pub transport: Arc<dyn ChatTransport>,
    pub ledger: Mutex<Ledger>,
    pub sessions: Mutex<SessionManager>,
    pub purchases: Mutex<Vec<PurchaseRecord>>,
    pub checkouts: Mutex<HashMap<String, CheckoutSession>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ログ初期化
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 資格情報が無ければここで落とす（トラフィックを受ける前に）
    let config = AppConfig::from_env().context("設定の読み込みに失敗しました")?;
    let session_ttl = Duration::from_secs(config.session_ttl_secs);

    let ledger = Ledger::load(
        config.data_path.clone(),
        config.backup_dir.clone(),
        config.backup_keep,
    )
    .await;

    let api = Arc::new(telegram::TelegramApi::new(&config.telegram_token));
    let transport: Arc<dyn ChatTransport> = api.clone();

    let state = Arc::new(AppState {
        config,
        transport,
        ledger: Mutex::new(ledger),
        sessions: Mutex::new(SessionManager::new()),
        purchases: Mutex::new(Vec::new()),
        checkouts: Mutex::new(HashMap::new()),
    });

    // 決済Webhookサーバ
    {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = webhook::serve(state).await {
                warn!("Webhookサーバが停止しました: {:#}", e);
            }
        });
    }

    // 放置セッションの掃き出し
    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = state.sessions.lock().await.evict_stale(session_ttl);
                if evicted > 0 {
                    info!("放置セッションを{}件整理しました", evicted);
                }
            }
        });
    }

    info!("🤖 eSIM自販機Bot 起動中...");
    run_polling(api, state).await
}

/// getUpdates のロングポーリングループ。
/// イベントは1本のループで順に処理する（ハンドラ内の台帳変更が直列化される）。
async fn run_polling(
    api: Arc<telegram::TelegramApi>,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let mut offset = 0;
    loop {
        match api.get_updates(offset).await {
            Ok((events, next_offset)) => {
                offset = next_offset;
                for event in events {
                    handlers::dispatch(&state, event).await;
                }
            }
            Err(e) => {
                warn!("getUpdates に失敗しました: {}。5秒後に再試行します", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
