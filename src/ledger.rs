//! Ledger Store
//! 在庫・商品設定・クーポンを1枚の JSON ドキュメントとして永続化する

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use rand::Rng;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::models::{CodeEntry, LedgerDoc, ProductLink};

/// 自動バックアップのファイル名（常にこの1枠だけを上書き）
pub const AUTO_BACKUP_NAME: &str = "backup_auto.json";

/// クーポンコードの固定プレフィックス（5文字）
pub const CODE_PREFIX: &str = "PROMO";

// ========================================
// Ledger
// ========================================

/// 台帳ストア。エンティティ数は高々数十〜数百なので、
/// 「全部読む・少し変える・全部書く」のスナップショット方式で十分。
pub struct Ledger {
    pub doc: LedgerDoc,
    data_path: PathBuf,
    backup_dir: PathBuf,
    backup_keep: usize,
}

impl Ledger {
    /// 台帳を読み込む。ファイルが無ければ既定の商品セットで初期化し、
    /// 壊れていれば既定値へフォールバックする。呼び出し元には失敗を返さない。
    pub async fn load(data_path: PathBuf, backup_dir: PathBuf, backup_keep: usize) -> Self {
        if let Err(e) = fs::create_dir_all(&backup_dir).await {
            warn!("バックアップディレクトリを作成できません: {}", e);
        }

        let (doc, fresh) = match fs::read_to_string(&data_path).await {
            Ok(raw) => match serde_json::from_str::<LedgerDoc>(&raw) {
                Ok(doc) => {
                    info!(
                        "台帳を読み込みました: 商品{}件 / クーポン{}件",
                        doc.links.len(),
                        doc.codes.len()
                    );
                    (doc, false)
                }
                Err(e) => {
                    // 壊れたファイルは次の保存まで残す
                    warn!("台帳の解析に失敗したため既定値で起動します: {}", e);
                    (default_doc(), false)
                }
            },
            Err(_) => {
                info!("台帳ファイルが無いため既定の商品セットで初期化します");
                (default_doc(), true)
            }
        };

        let ledger = Self {
            doc,
            data_path,
            backup_dir,
            backup_keep,
        };
        if fresh {
            ledger.save().await;
        }
        ledger
    }

    /// 全状態をディスクへ書き戻す。失敗はログに残すだけで、
    /// メモリ内の状態が次の成功まで正となる。
    pub async fn save(&self) {
        if let Err(e) = self.try_save().await {
            warn!("台帳の保存に失敗しました: {:#}", e);
        }
    }

    async fn try_save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.doc)?;
        let tmp_path = self.data_path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("一時ファイルを作成できません: {:?}", tmp_path))?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &self.data_path)
            .await
            .with_context(|| format!("台帳ファイルを置き換えられません: {:?}", self.data_path))?;
        Ok(())
    }

    // ========================================
    // バックアップ
    // ========================================

    /// 手動スナップショット。ライブファイルをタイムスタンプ名で複製する。
    /// メモリ内の状態には触れない。
    pub async fn snapshot(&self, label: Option<&str>) -> Result<String> {
        if !self.data_path.exists() {
            bail!("台帳ファイルがまだ保存されていません");
        }

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let name = match label {
            Some(label) => format!("backup_{}_{}.json", stamp, sanitize_label(label)),
            None => format!("backup_{}.json", stamp),
        };
        let dest = self.backup_dir.join(&name);
        fs::copy(&self.data_path, &dest)
            .await
            .with_context(|| format!("バックアップを書き込めません: {:?}", dest))?;

        info!("バックアップを作成しました: {}", name);
        self.prune_backups().await;
        Ok(name)
    }

    /// 自動スナップショット。各フルフィルメント後に呼ばれ、
    /// 常に同じ1ファイルだけを上書きする。失敗はログのみ。
    pub async fn snapshot_auto(&self) {
        let dest = self.backup_dir.join(AUTO_BACKUP_NAME);
        if let Err(e) = fs::copy(&self.data_path, &dest).await {
            warn!("自動バックアップに失敗しました: {}", e);
        }
    }

    /// 指定バックアップでライブファイルを上書きし、メモリ内も再読込する。
    /// 未保存のライブ状態は失われる（破壊的）。
    pub async fn restore(&mut self, name: &str) -> Result<()> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            bail!("不正なバックアップ名です: {}", name);
        }
        let src = self.backup_dir.join(name);
        let raw = fs::read_to_string(&src)
            .await
            .with_context(|| format!("バックアップを読めません: {}", name))?;

        // 壊れたバックアップでライブを潰さないよう、先に解析する
        let doc: LedgerDoc = serde_json::from_str(&raw)
            .with_context(|| format!("バックアップの形式が不正です: {}", name))?;

        fs::copy(&src, &self.data_path)
            .await
            .with_context(|| "ライブファイルを上書きできません")?;
        self.doc = doc;

        info!("バックアップから復元しました: {}", name);
        Ok(())
    }

    /// バックアップファイル名の一覧（名前順 = 時刻順）
    pub async fn list_backups(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.backup_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with("backup_") && name.ends_with(".json") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// 手動バックアップを保持数まで間引く（自動枠は対象外）
    async fn prune_backups(&self) {
        let Ok(names) = self.list_backups().await else {
            return;
        };
        let manual: Vec<&String> = names.iter().filter(|n| *n != AUTO_BACKUP_NAME).collect();
        if manual.len() <= self.backup_keep {
            return;
        }
        let excess = manual.len() - self.backup_keep;
        for name in manual.into_iter().take(excess) {
            let path = self.backup_dir.join(name);
            if let Err(e) = fs::remove_file(&path).await {
                warn!("古いバックアップを削除できません: {:?}: {}", path, e);
            }
        }
    }

    // ========================================
    // クーポン発行
    // ========================================

    /// 対象商品向けの未使用クーポンを1件発行する。
    /// amount 指定時は固定割引額、未指定なら商品の割引価格ルールに従う。
    pub fn issue_code(&mut self, product: &str, amount: Option<i64>) -> String {
        let code = loop {
            let candidate = generate_code();
            if !self.doc.codes.contains_key(&candidate) {
                break candidate;
            }
        };
        self.doc.codes.insert(
            code.clone(),
            CodeEntry {
                used: false,
                target: product.to_string(),
                discount_value: amount,
            },
        );
        code
    }

    /// クーポンを未使用へ戻す。商品指定ありならその商品のみ。件数を返す。
    pub fn reset_codes(&mut self, product: Option<&str>) -> usize {
        let mut count = 0;
        for entry in self.doc.codes.values_mut() {
            if entry.used && product.map_or(true, |p| entry.target == p) {
                entry.used = false;
                count += 1;
            }
        }
        count
    }
}

// ========================================
// Helper Functions
// ========================================

/// 出荷時の既定商品セット
fn default_doc() -> LedgerDoc {
    let mut doc = LedgerDoc::default();
    doc.links.insert(
        "通話可能".to_string(),
        ProductLink::new(
            3000,
            Some("https://qr.paypay.ne.jp/p2p01_uMrph5YFDveRCFmw".to_string()),
        ),
    );
    doc.links.insert(
        "データ".to_string(),
        ProductLink::new(
            1500,
            Some("https://qr.paypay.ne.jp/p2p01_RSC8W9GG2ZcIso1I".to_string()),
        ),
    );
    doc.stock.insert("通話可能".to_string(), VecDeque::new());
    doc.stock.insert("データ".to_string(), VecDeque::new());
    doc
}

/// `PROMO-XXXXXX` 形式のコードを生成する（英数大文字6桁、一様ランダム）
fn generate_code() -> String {
    let random_bytes: [u8; 5] = rand::thread_rng().gen();
    let encoded = base32::encode(base32::Alphabet::Crockford, &random_bytes);
    format!("{}-{}", CODE_PREFIX, &encoded[..6])
}

/// 入力テキストがクーポンコードの形式か（大文字化済みの文字列を渡す）
pub fn looks_like_code(text: &str) -> bool {
    let Some(rest) = text.strip_prefix(CODE_PREFIX) else {
        return false;
    };
    let Some(suffix) = rest.strip_prefix('-') else {
        return false;
    };
    suffix.len() == 6
        && suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(32)
        .collect()
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_ledger(dir: &tempfile::TempDir) -> Ledger {
        Ledger::load(
            dir.path().join("data.json"),
            dir.path().join("backups"),
            3,
        )
        .await
    }

    #[tokio::test]
    async fn load_initializes_default_products() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = temp_ledger(&dir).await;

        assert_eq!(ledger.doc.links.len(), 2);
        assert_eq!(ledger.doc.links["データ"].price, 1500);
        assert_eq!(ledger.doc.links["通話可能"].price, 3000);
        assert!(ledger.doc.codes.is_empty());
        // 初期化時点でディスク上にも実体ができている
        assert!(dir.path().join("data.json").exists());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = temp_ledger(&dir).await;

        ledger
            .doc
            .stock
            .get_mut("データ")
            .unwrap()
            .extend(["file_a".to_string(), "file_b".to_string()]);
        let code = ledger.issue_code("データ", Some(300));
        ledger.doc.links.get_mut("データ").unwrap().discount_price = Some(1200);
        ledger.save().await;

        let reloaded = temp_ledger(&dir).await;
        assert_eq!(
            reloaded.doc.stock["データ"],
            VecDeque::from(["file_a".to_string(), "file_b".to_string()])
        );
        assert_eq!(reloaded.doc.codes[&code].target, "データ");
        assert_eq!(reloaded.doc.codes[&code].discount_value, Some(300));
        assert!(!reloaded.doc.codes[&code].used);
        assert_eq!(reloaded.doc.links["データ"].discount_price, Some(1200));
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("data.json"), "{ これはJSONではない")
            .await
            .unwrap();

        let ledger = temp_ledger(&dir).await;
        assert_eq!(ledger.doc.links.len(), 2);
    }

    #[tokio::test]
    async fn auto_snapshot_keeps_single_slot_with_latest_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = temp_ledger(&dir).await;

        ledger
            .doc
            .stock
            .get_mut("データ")
            .unwrap()
            .push_back("first".to_string());
        ledger.save().await;
        ledger.snapshot_auto().await;

        ledger
            .doc
            .stock
            .get_mut("データ")
            .unwrap()
            .push_back("second".to_string());
        ledger.save().await;
        ledger.snapshot_auto().await;

        let names = ledger.list_backups().await.unwrap();
        assert_eq!(names, vec![AUTO_BACKUP_NAME.to_string()]);

        let raw = tokio::fs::read_to_string(dir.path().join("backups").join(AUTO_BACKUP_NAME))
            .await
            .unwrap();
        let doc: LedgerDoc = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.stock["データ"].len(), 2);
    }

    #[tokio::test]
    async fn restore_overwrites_live_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = temp_ledger(&dir).await;

        ledger
            .doc
            .stock
            .get_mut("データ")
            .unwrap()
            .push_back("kept".to_string());
        ledger.save().await;
        let name = ledger.snapshot(Some("before")).await.unwrap();

        ledger.doc.stock.get_mut("データ").unwrap().clear();
        ledger.save().await;
        assert!(ledger.doc.stock["データ"].is_empty());

        ledger.restore(&name).await.unwrap();
        assert_eq!(ledger.doc.stock["データ"].len(), 1);

        // ライブファイル側も復元されている
        let reloaded = temp_ledger(&dir).await;
        assert_eq!(reloaded.doc.stock["データ"].len(), 1);
    }

    #[tokio::test]
    async fn restore_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = temp_ledger(&dir).await;
        assert!(ledger.restore("../data.json").await.is_err());
        assert!(ledger.restore("backup_missing.json").await.is_err());
    }

    #[tokio::test]
    async fn manual_backups_pruned_to_retention() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = temp_ledger(&dir).await;

        for i in 0..5 {
            ledger.snapshot(Some(&format!("label{}", i))).await.unwrap();
        }
        let names = ledger.list_backups().await.unwrap();
        // 保持数3（自動枠は別勘定）
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn issued_codes_match_pattern() {
        let code = generate_code();
        assert!(looks_like_code(&code), "code was {}", code);
        assert!(looks_like_code("PROMO-ABC123"));
        assert!(!looks_like_code("PROMO-abc123"));
        assert!(!looks_like_code("PROMO-ABC12"));
        assert!(!looks_like_code("PRMO-ABC123"));
        assert!(!looks_like_code("完了"));
    }
}
