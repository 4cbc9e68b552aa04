use crate::models::{LineItem, RateConfig, SkippedRow};
use camino::Utf8PathBuf;
use indexmap::IndexMap;

/// Header label → 1-based column index, in sheet order.
pub type ColumnMap = IndexMap<String, u32>;

/// Result of one successful import.
///
/// Replaced wholesale on every import; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub items: Vec<LineItem>,
    pub skipped: Vec<SkippedRow>,
    pub source_path: Utf8PathBuf,
    /// 1-based row holding the column labels
    pub header_row: u32,
    pub column_map: ColumnMap,
    /// Left-most header column mentioning "total" or "amount"
    pub total_column: Option<u32>,
    pub grand_total: f64,
    /// Rates in force when the sheet was priced
    pub rates: RateConfig,
}

impl SessionState {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of units over all accepted lines
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn source_file_name(&self) -> &str {
        self.source_path
            .file_name()
            .unwrap_or(self.source_path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(row: u32, quantity: u64) -> LineItem {
        LineItem {
            row_index: row,
            name: format!("Item {}", row),
            unit_cost: 1.0,
            total_line_cost: quantity as f64,
            source_price: 1.0,
            quantity,
            cartons: 1.0,
            units_per_carton: quantity as f64,
            volume_cbm: 0.0,
        }
    }

    #[test]
    fn test_session_summary_helpers() {
        let session = SessionState {
            items: vec![item(2, 10), item(3, 5)],
            skipped: Vec::new(),
            source_path: Utf8PathBuf::from("/sheets/supplier.xlsx"),
            header_row: 1,
            column_map: ColumnMap::new(),
            total_column: None,
            grand_total: 15.0,
            rates: RateConfig::default(),
        };

        assert!(!session.is_empty());
        assert_eq!(session.total_units(), 15);
        assert_eq!(session.source_file_name(), "supplier.xlsx");
    }
}
