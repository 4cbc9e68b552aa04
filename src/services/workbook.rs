//! Spreadsheet access built on `calamine`.
//!
//! Sheets are loaded into a [`CellGrid`] addressed with 1-based `(row, column)`
//! coordinates, matching the numbers a user sees in a spreadsheet application. The
//! cost engine only ever works on a `CellGrid`, so tests can build one in memory.

use calamine::{Data, Reader, open_workbook_auto};
use camino::Utf8Path;
use std::collections::BTreeMap;
use thiserror::Error;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A single cell value, reduced to what the importer and exporter care about.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date number
    DateTime(f64),
    /// Error literal such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    /// Blank cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display text used for header labels and names
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) | CellValue::DateTime(n) => format_number(*n),
            CellValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Error(e.to_string()),
        }
    }
}

/// Integers without a trailing `.0`, everything else as-is
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Rectangular-ish grid of cells with 1-based addressing.
///
/// Rows may have different lengths; anything outside the stored area reads as
/// [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellGrid {
    rows: Vec<Vec<CellValue>>,
}

impl CellGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid where `rows[0]` is sheet row 1.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Cell at 1-based `(row, col)`
    pub fn get(&self, row: u32, col: u32) -> &CellValue {
        if row == 0 || col == 0 {
            return &EMPTY_CELL;
        }
        self.rows
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Cells of a 1-based row (empty slice when out of range)
    pub fn row(&self, row: u32) -> &[CellValue] {
        if row == 0 {
            return &[];
        }
        self.rows
            .get(row as usize - 1)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of the last stored row
    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest row length
    pub fn column_count(&self) -> u32 {
        self.rows.iter().map(Vec::len).max().unwrap_or(0) as u32
    }

    pub fn set(&mut self, row: u32, col: u32, value: CellValue) {
        if row == 0 || col == 0 {
            return;
        }
        let (r, c) = (row as usize - 1, col as usize - 1);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, CellValue::Empty);
        }
        cells[c] = value;
    }

    /// Iterate non-blank cells as `(row, col, value)`, 1-based
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> {
        self.rows.iter().enumerate().flat_map(|(r, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, value)| !matches!(value, CellValue::Empty))
                .map(move |(c, value)| (r as u32 + 1, c as u32 + 1, value))
        })
    }
}

/// One worksheet: values plus any formula text, keyed by 1-based `(row, col)`.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub name: String,
    pub cells: CellGrid,
    pub formulas: BTreeMap<(u32, u32), String>,
}

/// Errors raised while reading a spreadsheet file
#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Failed to open spreadsheet {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Spreadsheet {0} contains no sheets")]
    NoSheets(String),

    #[error("Failed to read sheet '{name}': {source}")]
    Sheet {
        name: String,
        #[source]
        source: calamine::Error,
    },
}

/// Read only the first worksheet (the priced sheet). Formulas are not loaded.
pub fn read_first_sheet(path: &Utf8Path) -> Result<SheetData, WorkbookError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| WorkbookError::Open {
        path: path.to_string(),
        source,
    })?;

    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| WorkbookError::NoSheets(path.to_string()))?;

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| WorkbookError::Sheet {
            name: name.clone(),
            source,
        })?;

    tracing::debug!(
        "Read sheet '{}' from {} ({}x{})",
        name,
        path,
        range.height(),
        range.width()
    );

    Ok(SheetData {
        name,
        cells: grid_from_range(&range),
        formulas: BTreeMap::new(),
    })
}

/// Read every worksheet with values and formulas, in workbook order.
pub fn read_all_sheets(path: &Utf8Path) -> Result<Vec<SheetData>, WorkbookError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| WorkbookError::Open {
        path: path.to_string(),
        source,
    })?;

    let names = workbook.sheet_names().to_vec();
    if names.is_empty() {
        return Err(WorkbookError::NoSheets(path.to_string()));
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|source| WorkbookError::Sheet {
                name: name.clone(),
                source,
            })?;

        let mut formulas = BTreeMap::new();
        // Formula parts are optional; sheets without them still copy their values
        match workbook.worksheet_formula(&name) {
            Ok(formula_range) => {
                let (start_row, start_col) = formula_range.start().unwrap_or((0, 0));
                for (r, c, formula) in formula_range.cells() {
                    if formula.is_empty() {
                        continue;
                    }
                    let row = start_row + r as u32 + 1;
                    let col = start_col + c as u32 + 1;
                    formulas.insert((row, col), formula.clone());
                }
            }
            Err(e) => tracing::debug!("No formulas read for sheet '{}': {}", name, e),
        }

        sheets.push(SheetData {
            cells: grid_from_range(&range),
            formulas,
            name,
        });
    }

    Ok(sheets)
}

/// Place a calamine range at its absolute position in a 1-based grid
fn grid_from_range(range: &calamine::Range<Data>) -> CellGrid {
    let mut grid = CellGrid::new();
    let Some((start_row, start_col)) = range.start() else {
        return grid;
    };

    for (r, row) in range.rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if matches!(cell, Data::Empty) {
                continue;
            }
            grid.set(
                start_row + r as u32 + 1,
                start_col + c as u32 + 1,
                CellValue::from(cell),
            );
        }
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_addressing_is_one_based() {
        let grid = CellGrid::from_rows(vec![
            vec![CellValue::Text("ITEM".into()), CellValue::Number(2.0)],
            vec![CellValue::Empty],
        ]);

        assert_eq!(grid.get(1, 1), &CellValue::Text("ITEM".into()));
        assert_eq!(grid.get(1, 2), &CellValue::Number(2.0));
        assert_eq!(grid.get(0, 1), &CellValue::Empty);
        assert_eq!(grid.get(5, 5), &CellValue::Empty);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.column_count(), 2);
    }

    #[test]
    fn test_set_grows_grid() {
        let mut grid = CellGrid::new();
        grid.set(3, 4, CellValue::Bool(true));

        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.get(3, 4), &CellValue::Bool(true));
        assert!(grid.row(2).is_empty());
        assert_eq!(grid.cells().count(), 1);
    }

    #[test]
    fn test_display_text() {
        assert_eq!(CellValue::Number(12.0).display_text(), "12");
        assert_eq!(CellValue::Number(0.5).display_text(), "0.5");
        assert_eq!(CellValue::Text("  Ctn ".into()).display_text(), "Ctn");
        assert!(CellValue::Text("   ".into()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_from_calamine_data() {
        assert_eq!(CellValue::from(&Data::Int(4)), CellValue::Number(4.0));
        assert_eq!(
            CellValue::from(&Data::String("x".into())),
            CellValue::Text("x".into())
        );
        assert_eq!(CellValue::from(&Data::Empty), CellValue::Empty);
    }
}
