use crate::models::{ColumnLabels, RateConfig, SessionState, UserConfig};
use crate::services::costing::compute_costs;
use crate::services::header::{ColumnLayout, HEADER_SCAN_LIMIT, locate_header};
use crate::services::workbook::{WorkbookError, read_first_sheet};
use camino::Utf8Path;
use thiserror::Error;

/// Errors that abort an import
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Workbook(#[from] WorkbookError),

    #[error("Header not found: none of the first {scanned} rows contains '{item}' or '{price}'")]
    HeaderNotFound {
        scanned: u32,
        item: String,
        price: String,
    },
}

/// Knobs for header detection
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub labels: ColumnLabels,
    pub header_scan_limit: u32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            labels: ColumnLabels::default(),
            header_scan_limit: HEADER_SCAN_LIMIT,
        }
    }
}

impl From<&UserConfig> for ImportOptions {
    fn from(config: &UserConfig) -> Self {
        Self {
            labels: config.columns.clone(),
            header_scan_limit: config.import.header_scan_limit,
        }
    }
}

/// Read the first sheet of `path`, find its header and price every row.
///
/// `rates` is applied as passed; callers hand in whatever is current at the time of
/// the call.
pub fn import_sheet(
    path: &Utf8Path,
    rates: &RateConfig,
    options: &ImportOptions,
) -> Result<SessionState, ImportError> {
    tracing::info!(
        "Importing {} (exchange_rate={}, shipping_rate={})",
        path,
        rates.exchange_rate(),
        rates.shipping_rate()
    );

    let sheet = read_first_sheet(path)?;

    let header = locate_header(&sheet.cells, &options.labels, options.header_scan_limit)
        .ok_or_else(|| ImportError::HeaderNotFound {
            scanned: options.header_scan_limit,
            item: options.labels.item.clone(),
            price: options.labels.price.clone(),
        })?;

    let layout = ColumnLayout::resolve(&header.column_map, &options.labels);
    if layout.price.is_none() {
        tracing::warn!(
            "Sheet '{}' has no '{}' column; prices default to 0",
            sheet.name,
            options.labels.price
        );
    }

    let report = compute_costs(&sheet.cells, header.row, &layout, rates);

    Ok(SessionState {
        items: report.items,
        skipped: report.skipped,
        source_path: path.to_path_buf(),
        header_row: header.row,
        column_map: header.column_map,
        total_column: header.total_column,
        grand_total: report.grand_total,
        rates: *rates,
    })
}
