//! Inventory Allocator
//! 在庫列に対する先入れ先出しの払い出し・追加

use thiserror::Error;

use crate::models::LedgerDoc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("商品が見つかりません: {0}")]
    UnknownProduct(String),
    #[error("在庫が足りません（要求 {requested} / 在庫 {available}）")]
    Insufficient { requested: u32, available: usize },
}

/// 現在の在庫数
pub fn available(doc: &LedgerDoc, product: &str) -> usize {
    doc.stock.get(product).map_or(0, |units| units.len())
}

pub fn check_available(doc: &LedgerDoc, product: &str, quantity: u32) -> bool {
    quantity as usize <= available(doc, product)
}

/// 先頭から quantity 枚を払い出す。
///
/// 不足時は1枚も取り出さずに失敗する（部分払い出しなし）。
/// 残数確認と取り出しの間に await を挟まないこと — この関数を
/// 台帳ロックの内側で呼ぶことがフルフィルメント時の競合安全の前提。
pub fn allocate(doc: &mut LedgerDoc, product: &str, quantity: u32) -> Result<Vec<String>, StockError> {
    let units = doc
        .stock
        .get_mut(product)
        .ok_or_else(|| StockError::UnknownProduct(product.to_string()))?;

    if (quantity as usize) > units.len() {
        return Err(StockError::Insufficient {
            requested: quantity,
            available: units.len(),
        });
    }

    Ok(units.drain(..quantity as usize).collect())
}

/// 在庫を末尾へ1枚追加し、追加後の枚数を返す
pub fn add_unit(doc: &mut LedgerDoc, product: &str, file_ref: String) -> Result<usize, StockError> {
    let units = doc
        .stock
        .get_mut(product)
        .ok_or_else(|| StockError::UnknownProduct(product.to_string()))?;
    units.push_back(file_ref);
    Ok(units.len())
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn doc_with(units: &[&str]) -> LedgerDoc {
        let mut doc = LedgerDoc::default();
        doc.stock.insert(
            "データ".to_string(),
            units.iter().map(|s| s.to_string()).collect::<VecDeque<_>>(),
        );
        doc
    }

    #[test]
    fn allocate_pops_head_prefix_in_order() {
        let mut doc = doc_with(&["a", "b", "c", "d"]);
        let taken = allocate(&mut doc, "データ", 2).unwrap();
        assert_eq!(taken, vec!["a".to_string(), "b".to_string()]);
        // 残りは元の列から先頭を除いたもの
        assert_eq!(
            doc.stock["データ"],
            VecDeque::from(["c".to_string(), "d".to_string()])
        );
    }

    #[test]
    fn allocate_shortage_pops_nothing() {
        let mut doc = doc_with(&["a", "b"]);
        let err = allocate(&mut doc, "データ", 3).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                requested: 3,
                available: 2
            }
        );
        assert_eq!(doc.stock["データ"].len(), 2);
    }

    #[test]
    fn allocate_unknown_product_fails() {
        let mut doc = doc_with(&[]);
        assert!(matches!(
            allocate(&mut doc, "謎の商品", 1),
            Err(StockError::UnknownProduct(_))
        ));
    }

    #[test]
    fn add_unit_appends_to_tail() {
        let mut doc = doc_with(&["a"]);
        let count = add_unit(&mut doc, "データ", "b".to_string()).unwrap();
        assert_eq!(count, 2);
        let taken = allocate(&mut doc, "データ", 2).unwrap();
        assert_eq!(taken, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn check_available_boundaries() {
        let doc = doc_with(&["a", "b"]);
        assert!(check_available(&doc, "データ", 2));
        assert!(!check_available(&doc, "データ", 3));
        assert!(!check_available(&doc, "通話可能", 1));
    }
}
