//! Discount Engine
//! 数量・クーポンから最終価格を計算する純粋ロジック

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{CodeEntry, ProductLink};

/// まとめ買い割引の閾値
const BULK_10_MIN: u32 = 10;
const BULK_5_MIN: u32 = 6;

/// 価格計算の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// 最終価格（円）
    pub total: i64,
    /// 適用された割引の説明（購入者・管理者向け表示に使う）
    pub label: String,
}

/// クーポン・割引まわりの拒否理由。それぞれ購入者に別メッセージで返す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("クーポンコードが見つかりません")]
    CodeNotFound,
    #[error("このクーポンは使用済みです")]
    CodeUsed,
    #[error("このクーポンは対象商品が異なります")]
    CodeWrongProduct,
    #[error("まとめ買い割引が適用されているためクーポンは併用できません")]
    BulkDiscountApplied,
    #[error("この商品には割引価格が設定されていません")]
    NoDiscountPrice,
}

/// 最終価格を計算する。
///
/// 優先順位: まとめ買い10% (10枚〜) → まとめ買い5% (6〜9枚) → クーポン。
/// まとめ買いとクーポンは排他で、数量6以上でのクーポンは照合前に拒否する。
/// パーセント割引は整数演算で切り捨て、固定額割引は0円を下限とする。
/// 数量の妥当性（正の整数・在庫以下）は呼び出し元が保証する。
pub fn compute_price(
    product: &str,
    link: &ProductLink,
    quantity: u32,
    code: Option<&str>,
    codes: &HashMap<String, CodeEntry>,
) -> Result<Quote, PriceError> {
    let q = i64::from(quantity);
    let base = link.price * q;

    if quantity >= BULK_10_MIN {
        if code.is_some() {
            return Err(PriceError::BulkDiscountApplied);
        }
        return Ok(Quote {
            total: base * 90 / 100,
            label: format!("まとめ買い割引 10%OFF（{}枚）", quantity),
        });
    }

    if quantity >= BULK_5_MIN {
        if code.is_some() {
            return Err(PriceError::BulkDiscountApplied);
        }
        return Ok(Quote {
            total: base * 95 / 100,
            label: format!("まとめ買い割引 5%OFF（{}枚）", quantity),
        });
    }

    let Some(code) = code else {
        return Ok(Quote {
            total: base,
            label: "通常価格".to_string(),
        });
    };

    let entry = codes.get(code).ok_or(PriceError::CodeNotFound)?;
    // 使用済みは対象商品の一致に関わらず拒否
    if entry.used {
        return Err(PriceError::CodeUsed);
    }
    if entry.target != product {
        return Err(PriceError::CodeWrongProduct);
    }

    match entry.discount_value {
        Some(value) => Ok(Quote {
            total: (base - value).max(0),
            label: format!("クーポン適用 -{}円", value),
        }),
        None => {
            // 1枚目だけ割引価格、残りは通常価格
            let discounted = link.discount_price.ok_or(PriceError::NoDiscountPrice)?;
            Ok(Quote {
                total: discounted + link.price * (q - 1),
                label: "クーポン適用（1枚目割引価格）".to_string(),
            })
        }
    }
}

// ========================================
// Tests
// ========================================
