//! テスト補助
//! 一時ディレクトリ上の台帳とモックトランスポートで AppState を組む

use std::collections::HashMap;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::ledger::Ledger;
use crate::session::SessionManager;
use crate::transport::testing::MockTransport;
use crate::AppState;

pub const TEST_ADMIN: i64 = 999;

pub async fn state_with(
    dir: &TempDir,
    stock: &[(&str, &[&str])],
) -> (Arc<AppState>, Arc<MockTransport>) {
    state_with_failing(dir, stock, &[]).await
}

/// fail_file_ids に挙げた画像の送信だけ失敗するモックで組む
pub async fn state_with_failing(
    dir: &TempDir,
    stock: &[(&str, &[&str])],
    fail_file_ids: &[&str],
) -> (Arc<AppState>, Arc<MockTransport>) {
    let config = AppConfig {
        telegram_token: "test-token".to_string(),
        admin_id: TEST_ADMIN,
        gateway_token: Some("hook-secret".to_string()),
        webhook_port: 0,
        data_path: dir.path().join("data.json"),
        backup_dir: dir.path().join("backups"),
        session_ttl_secs: 3600,
        backup_keep: 5,
    };

    let mut ledger = Ledger::load(
        config.data_path.clone(),
        config.backup_dir.clone(),
        config.backup_keep,
    )
    .await;
    for (product, units) in stock {
        // 既定セットに無い商品はテスト用の価格で登録する
        ledger
            .doc
            .links
            .entry(product.to_string())
            .or_insert_with(|| crate::models::ProductLink::new(1000, None));
        let queue = ledger.doc.stock.entry(product.to_string()).or_default();
        for unit in *units {
            queue.push_back(unit.to_string());
        }
    }
    ledger.save().await;

    let mock = Arc::new(MockTransport {
        fail_file_ids: fail_file_ids.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    });

    let state = Arc::new(AppState {
        config,
        transport: mock.clone(),
        ledger: Mutex::new(ledger),
        sessions: Mutex::new(SessionManager::new()),
        purchases: Mutex::new(Vec::new()),
        checkouts: Mutex::new(HashMap::new()),
    });
    (state, mock)
}
