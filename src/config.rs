//! 設定
//! 環境変数から起動時に読み込む。必須の資格情報が無ければ即時終了
//! （トラフィックを受ける前に落とす）。

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bot トークン（必須）
    pub telegram_token: String,
    /// 管理者のユーザーID（必須）
    pub admin_id: i64,
    /// 決済 Webhook の共有シークレット。未設定ならカード決済は無効。
    pub gateway_token: Option<String>,
    pub webhook_port: u16,
    pub data_path: PathBuf,
    pub backup_dir: PathBuf,
    /// 放置セッションの失効秒数
    pub session_ttl_secs: u64,
    /// 手動バックアップの保持数
    pub backup_keep: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let telegram_token =
            env::var("TELEGRAM_TOKEN").context("TELEGRAM_TOKEN が設定されていません")?;
        let admin_id = env::var("ADMIN_ID")
            .context("ADMIN_ID が設定されていません")?
            .parse::<i64>()
            .context("ADMIN_ID は数値で指定してください")?;

        Ok(Self {
            telegram_token,
            admin_id,
            gateway_token: env::var("PAYPAY_WEBHOOK_TOKEN").ok(),
            webhook_port: env_or("WEBHOOK_PORT", 8000)?,
            data_path: PathBuf::from(
                env::var("DATA_PATH").unwrap_or_else(|_| "data.json".to_string()),
            ),
            backup_dir: PathBuf::from(
                env::var("BACKUP_DIR").unwrap_or_else(|_| "backups".to_string()),
            ),
            session_ttl_secs: env_or("SESSION_TTL_SECS", 3600)?,
            backup_keep: env_or("BACKUP_KEEP", 20)?,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} の値が不正です: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
