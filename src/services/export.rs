//! Writing the annotated copy of a priced sheet.
//!
//! The source file is never modified. Its sheets are re-read with `calamine`, the unit
//! costs are placed into a target column of the first sheet and the whole workbook is
//! written to a new file with `rust_xlsxwriter`.

use crate::models::{ColumnLabels, ColumnMap, SessionState, UserConfig};
use crate::services::workbook::{CellValue, SheetData, WorkbookError, read_all_sheets};
use camino::{Utf8Path, Utf8PathBuf};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Formula, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::fs;
use std::io;
use thiserror::Error;

/// Windows `ERROR_SHARING_VIOLATION`
const SHARING_VIOLATION: i32 = 32;
/// Windows `ERROR_LOCK_VIOLATION`
const LOCK_VIOLATION: i32 = 33;

/// Largest column index an xlsx sheet can hold
const MAX_XLSX_COLUMN: u32 = 16_384;

/// Errors that abort an export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No data to export - import a price sheet first")]
    NoData,

    #[error(transparent)]
    Read(#[from] WorkbookError),

    #[error("Target column {0} is beyond the last spreadsheet column")]
    ColumnOutOfRange(u32),

    #[error("Failed to build output workbook: {0}")]
    Build(#[from] XlsxError),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} is open in another program - close it and try again")]
    FileInUse(Utf8PathBuf),

    #[error("Failed to save {path}: {source}")]
    Save {
        path: Utf8PathBuf,
        #[source]
        source: XlsxError,
    },
}

/// Where and how an export is written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub output_dir: Utf8PathBuf,
    pub currency: String,
    pub labels: ColumnLabels,
}

impl ExportOptions {
    pub fn from_config(config: &UserConfig) -> Self {
        Self {
            output_dir: config
                .export
                .output_dir
                .clone()
                .unwrap_or_else(default_output_dir),
            currency: config.rates.currency.clone(),
            labels: config.columns.clone(),
        }
    }

    /// Header text written above the unit costs
    pub fn header_label(&self) -> String {
        format!("Unit Cost ({})", self.currency)
    }
}

/// The platform downloads folder, or the working directory when there is none
pub fn default_output_dir() -> Utf8PathBuf {
    dirs::download_dir()
        .and_then(|path| Utf8PathBuf::try_from(path).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

/// `CostSheet_<unix_timestamp>.xlsx`
pub fn output_file_name(timestamp: i64) -> String {
    format!("CostSheet_{}.xlsx", timestamp)
}

/// Pick the 1-based column that receives the unit costs.
///
/// Order of preference: `total_column` (the left-most header mentioning
/// "total"/"amount", see [`HeaderInfo`](crate::services::HeaderInfo)), the column right of
/// the price column, then the first column after the header's last label.
pub fn resolve_target_column(
    total_column: Option<u32>,
    column_map: &ColumnMap,
    labels: &ColumnLabels,
) -> u32 {
    total_column
        .or_else(|| column_map.get(&labels.price).map(|col| col + 1))
        .unwrap_or_else(|| column_map.values().copied().max().unwrap_or(0) + 1)
}

/// Write an annotated copy of the session's source file into `options.output_dir`.
///
/// An empty session fails with [`ExportError::NoData`] before any file is touched.
/// Returns the path of the written file.
pub fn export_session(
    session: &SessionState,
    options: &ExportOptions,
) -> Result<Utf8PathBuf, ExportError> {
    if session.is_empty() {
        return Err(ExportError::NoData);
    }

    let target_col =
        resolve_target_column(session.total_column, &session.column_map, &options.labels);
    if target_col > MAX_XLSX_COLUMN {
        return Err(ExportError::ColumnOutOfRange(target_col));
    }

    tracing::info!(
        "Exporting {} items from {} into column {}",
        session.items.len(),
        session.source_path,
        target_col
    );

    let mut sheets = read_all_sheets(&session.source_path)?;
    let annotated = annotate_sheet(&mut sheets[0], session, target_col, &options.header_label());

    let mut workbook = build_workbook(&sheets, &annotated, target_col)?;

    fs::create_dir_all(&options.output_dir).map_err(|source| ExportError::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;

    let output_path = options
        .output_dir
        .join(output_file_name(chrono::Utc::now().timestamp()));

    save_workbook(&mut workbook, &output_path)?;

    tracing::info!("Export written to {}", output_path);
    Ok(output_path)
}

/// Cells written by the export, so they can be styled
struct Annotated {
    header: (u32, u32),
    costs: HashSet<(u32, u32)>,
}

fn annotate_sheet(
    sheet: &mut SheetData,
    session: &SessionState,
    target_col: u32,
    header_label: &str,
) -> Annotated {
    let header = (session.header_row, target_col);
    sheet.formulas.remove(&header);
    sheet
        .cells
        .set(header.0, header.1, CellValue::Text(header_label.to_string()));

    let mut costs = HashSet::with_capacity(session.items.len());
    for item in &session.items {
        let cell = (item.row_index, target_col);
        sheet.formulas.remove(&cell);
        sheet
            .cells
            .set(cell.0, cell.1, CellValue::Number(item.unit_cost));
        costs.insert(cell);
    }

    Annotated { header, costs }
}

fn build_workbook(
    sheets: &[SheetData],
    annotated: &Annotated,
    target_col: u32,
) -> Result<Workbook, XlsxError> {
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x00CC66))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    let cost_format = Format::new().set_num_format("#,##0.00");
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let mut workbook = Workbook::new();

    for (index, sheet) in sheets.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (row, col, value) in sheet.cells.cells() {
            let format = if index != 0 {
                None
            } else if (row, col) == annotated.header {
                Some(&header_format)
            } else if annotated.costs.contains(&(row, col)) {
                Some(&cost_format)
            } else {
                None
            };

            write_cell(
                worksheet,
                row,
                col,
                value,
                sheet.formulas.get(&(row, col)),
                format,
                &date_format,
            )?;
        }

        // Formulas whose cached value was empty still need writing
        for (&(row, col), formula) in &sheet.formulas {
            if matches!(sheet.cells.get(row, col), CellValue::Empty) {
                if let Some((r, c)) = zero_based(row, col) {
                    worksheet.write_formula(r, c, formula.as_str())?;
                }
            }
        }

        if index == 0 {
            if let Some((_, c)) = zero_based(1, target_col) {
                worksheet.set_column_width(c, 16)?;
            }
        }
    }

    Ok(workbook)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u32,
    value: &CellValue,
    formula: Option<&String>,
    format: Option<&Format>,
    date_format: &Format,
) -> Result<(), XlsxError> {
    let Some((r, c)) = zero_based(row, col) else {
        return Ok(());
    };

    if let Some(formula) = formula {
        let formula = Formula::new(formula).set_result(value.display_text());
        match format {
            Some(format) => worksheet.write_formula_with_format(r, c, formula, format)?,
            None => worksheet.write_formula(r, c, formula)?,
        };
        return Ok(());
    }

    match (value, format) {
        (CellValue::Empty, _) => {}
        (CellValue::Text(s), Some(format)) => {
            worksheet.write_string_with_format(r, c, s, format)?;
        }
        (CellValue::Text(s), None) => {
            worksheet.write_string(r, c, s)?;
        }
        (CellValue::Number(n), Some(format)) => {
            worksheet.write_number_with_format(r, c, *n, format)?;
        }
        (CellValue::Number(n), None) => {
            worksheet.write_number(r, c, *n)?;
        }
        (CellValue::Bool(b), _) => {
            worksheet.write_boolean(r, c, *b)?;
        }
        (CellValue::DateTime(serial), _) => {
            worksheet.write_number_with_format(r, c, *serial, date_format)?;
        }
        (CellValue::Error(e), _) => {
            worksheet.write_string(r, c, e)?;
        }
    }

    Ok(())
}

/// 1-based sheet coordinates to rust_xlsxwriter's 0-based ones
fn zero_based(row: u32, col: u32) -> Option<(u32, u16)> {
    if row == 0 || col == 0 || col > MAX_XLSX_COLUMN {
        return None;
    }
    Some((row - 1, u16::try_from(col - 1).ok()?))
}

fn save_workbook(workbook: &mut Workbook, path: &Utf8Path) -> Result<(), ExportError> {
    workbook.save(path).map_err(|source| match &source {
        XlsxError::IoError(e) if is_file_in_use(e) => ExportError::FileInUse(path.to_path_buf()),
        _ => ExportError::Save {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Only Windows reports another process holding the file; a plain permission error
/// (read-only folder, ACLs) stays a [`ExportError::Save`].
fn is_file_in_use(error: &io::Error) -> bool {
    cfg!(windows) && is_lock_error_code(error.raw_os_error())
}

fn is_lock_error_code(code: Option<i32>) -> bool {
    matches!(code, Some(SHARING_VIOLATION | LOCK_VIOLATION))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, u32)]) -> ColumnMap {
        entries
            .iter()
            .map(|(label, col)| (label.to_string(), *col))
            .collect()
    }

    #[test]
    fn test_target_prefers_total_column() {
        let columns = map(&[("ITEM", 1), ("Price(RMB)", 2), ("TOTAL", 6)]);
        assert_eq!(resolve_target_column(Some(6), &columns, &ColumnLabels::default()), 6);
    }

    #[test]
    fn test_target_after_price_column() {
        let columns = map(&[("ITEM", 1), ("Price(RMB)", 4), ("Ctn", 5)]);
        assert_eq!(resolve_target_column(None, &columns, &ColumnLabels::default()), 5);
    }

    #[test]
    fn test_target_appended_without_price_column() {
        let columns = map(&[("ITEM", 1), ("Ctn", 3)]);
        assert_eq!(resolve_target_column(None, &columns, &ColumnLabels::default()), 4);
        assert_eq!(
            resolve_target_column(None, &ColumnMap::new(), &ColumnLabels::default()),
            1
        );
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(1_700_000_000), "CostSheet_1700000000.xlsx");
    }

    #[test]
    fn test_header_label_uses_currency() {
        let options = ExportOptions::from_config(&UserConfig::default());
        assert_eq!(options.header_label(), "Unit Cost (DZD)");
    }

    #[test]
    fn test_zero_based_conversion() {
        assert_eq!(zero_based(1, 1), Some((0, 0)));
        assert_eq!(zero_based(0, 1), None);
        assert_eq!(zero_based(1, MAX_XLSX_COLUMN + 1), None);
    }

    #[test]
    fn test_file_in_use_detection() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(!is_file_in_use(&denied));
        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert!(!is_file_in_use(&missing));

        assert!(is_lock_error_code(Some(32)));
        assert!(is_lock_error_code(Some(33)));
        assert!(!is_lock_error_code(Some(5)));
        assert!(!is_lock_error_code(None));
    }

    #[cfg(windows)]
    #[test]
    fn test_sharing_violation_is_file_in_use() {
        assert!(is_file_in_use(&io::Error::from_raw_os_error(32)));
        // ERROR_ACCESS_DENIED
        assert!(!is_file_in_use(&io::Error::from_raw_os_error(5)));
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_is_a_save_error() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        let result = save_workbook(&mut workbook, &dir.join("locked.xlsx"));

        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
        // Root ignores directory permissions, so only check the mapping when it failed
        if let Err(error) = result {
            assert!(matches!(error, ExportError::Save { .. }), "got {:?}", error);
        }
    }
}
