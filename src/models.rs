//! Data Models
//! 台帳ドキュメント・購入履歴・チェックアウトセッションのデータ構造定義

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ========================================
// 台帳ドキュメント (data.json)
// ========================================

/// 永続化ドキュメント全体
///
/// トップレベルキーは STOCK / LINKS / CODES の3つ。
/// 保存は常にドキュメント全体の上書き（部分書き込みなし）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerDoc {
    /// 商品名 → 在庫（配信ファイル参照の列、先頭から払い出す）
    #[serde(rename = "STOCK", default)]
    pub stock: HashMap<String, VecDeque<String>>,

    /// 商品名 → 価格・支払いリンク設定
    #[serde(rename = "LINKS", default)]
    pub links: HashMap<String, ProductLink>,

    /// クーポンコード → 状態
    #[serde(rename = "CODES", default)]
    pub codes: HashMap<String, CodeEntry>,
}

/// 商品の価格・リンク設定 (LINKS の値)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductLink {
    /// 通常の支払いリンク（未設定の場合は None）
    #[serde(default)]
    pub url: Option<String>,

    /// 通常価格（円、整数）
    pub price: i64,

    /// 割引時の支払いリンク
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_link: Option<String>,

    /// 割引価格（クーポン適用時に1枚目へ適用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<i64>,
}

impl ProductLink {
    pub fn new(price: i64, url: Option<String>) -> Self {
        Self {
            url,
            price,
            discount_link: None,
            discount_price: None,
        }
    }
}

/// クーポンコードの状態 (CODES の値)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntry {
    /// 使用済みフラグ。一度 true になったら二度と戻らない（管理者リセットを除く）
    pub used: bool,

    /// 対象商品名
    #[serde(rename = "type")]
    pub target: String,

    /// 固定割引額（円）。None の場合は商品の割引価格ルールを適用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<i64>,
}

// ========================================
// 購入履歴（メモリ内のみ・管理者レポート用）
// ========================================

/// 確定した販売1件の記録（配信バッチごとに1エントリ）
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    pub user_id: i64,
    pub user_name: String,
    pub product: String,
    pub quantity: u32,
    pub total: i64,
    pub code: Option<String>,
    pub at: DateTime<Utc>,
}

// ========================================
// チェックアウトセッション（カード決済）
// ========================================

/// カード決済の注文情報。作成時に購入者・商品・数量・金額を刻印し、
/// Webhook 受信時に突合する。
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub user_id: i64,
    pub user_name: String,
    pub product: String,
    pub quantity: u32,
    pub amount: i64,
    pub code: Option<String>,
}
