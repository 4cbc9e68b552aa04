//! Header row detection.
//!
//! Supplier sheets usually start with a few rows of letterhead before the table. The
//! header row is the first row (within a scan limit) containing one of the sentinel
//! labels; its cells become the [`ColumnMap`] used by the rest of the import.

use crate::models::{ColumnLabels, ColumnMap};
use crate::services::workbook::CellGrid;
use regex::Regex;
use std::sync::LazyLock;

/// Default number of leading rows searched for the header
pub const HEADER_SCAN_LIMIT: u32 = 20;

/// Matches headers of columns that receive the exported unit cost
static TOTAL_COLUMN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)total|amount").expect("Invalid total column regex"));

/// Location of the header row and its labels
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    /// 1-based header row
    pub row: u32,
    pub column_map: ColumnMap,
    /// Left-most column whose header mentions "total" or "amount", taken from the row
    /// itself since `column_map` keeps only the last column of a repeated label
    pub total_column: Option<u32>,
}

/// Typed view of the columns the importer reads, resolved once per import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub item: Option<u32>,
    pub alt_name: Option<u32>,
    pub price: Option<u32>,
    pub cartons: Option<u32>,
    pub units_per_carton: Option<u32>,
    pub volume: Option<u32>,
}

impl ColumnLayout {
    pub fn resolve(column_map: &ColumnMap, labels: &ColumnLabels) -> Self {
        let lookup = |label: &str| column_map.get(label).copied();

        Self {
            item: lookup(&labels.item),
            alt_name: lookup(&labels.alt_name),
            price: lookup(&labels.price),
            cartons: lookup(&labels.cartons),
            units_per_carton: lookup(&labels.units_per_carton),
            volume: lookup(&labels.volume),
        }
    }
}

/// Find the header row within the first `scan_limit` rows.
///
/// The first row holding a cell equal to either sentinel label wins. Every non-blank
/// cell of that row is recorded; a label that appears twice maps to its right-most
/// column. Returns `None` when no scanned row qualifies.
pub fn locate_header(grid: &CellGrid, labels: &ColumnLabels, scan_limit: u32) -> Option<HeaderInfo> {
    let sentinels = labels.sentinels();
    let last_row = scan_limit.min(grid.row_count());

    for row in 1..=last_row {
        let texts: Vec<String> = grid.row(row).iter().map(|cell| cell.display_text()).collect();

        if !texts.iter().any(|text| sentinels.contains(&text.as_str())) {
            continue;
        }

        let total_column = texts
            .iter()
            .position(|text| TOTAL_COLUMN_PATTERN.is_match(text))
            .map(|idx| idx as u32 + 1);

        let mut column_map = ColumnMap::new();
        for (idx, text) in texts.into_iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let col = idx as u32 + 1;
            // Re-inserting an existing key keeps its position, so drop it first
            column_map.shift_remove(&text);
            column_map.insert(text, col);
        }

        tracing::debug!("Header found at row {} with {} labels", row, column_map.len());
        return Some(HeaderInfo {
            row,
            column_map,
            total_column,
        });
    }

    tracing::debug!("No header row found in the first {} rows", last_row);
    None
}
