//! Landed cost calculation.
//!
//! For each data row the unit price is converted into the destination currency and a
//! share of the freight is added:
//!
//! ```text
//! shipping_per_carton = cbm * shipping_rate
//! shipping_per_unit   = shipping_per_carton / units_per_carton
//! unit_cost           = source_price * exchange_rate + shipping_per_unit
//! total_line_cost     = unit_cost * cartons * units_per_carton
//! ```
//!
//! The arithmetic runs on [`Decimal`] so that both results round to 2 decimals, half away
//! from zero, on the decimal value the sheet shows (`1.005 -> 1.01`). Rows that cannot be
//! priced are reported as [`SkippedRow`]s; they never abort the import.

use crate::models::{LineItem, RateConfig, SkipReason, SkippedRow};
use crate::services::header::ColumnLayout;
use crate::services::workbook::{CellGrid, CellValue};
use rust_decimal::{Decimal, RoundingStrategy};

/// Name used when neither name column has a value
pub const UNKNOWN_ITEM_NAME: &str = "Unknown";

/// Output of one pricing pass over a sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub items: Vec<LineItem>,
    pub skipped: Vec<SkippedRow>,
    /// Sum of `total_line_cost` over `items`, rounded to 2 dp
    pub grand_total: f64,
}

/// Cost figures for one line, already rounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub unit_cost: f64,
    pub total_line_cost: f64,
}

/// Numeric inputs of one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInputs {
    pub source_price: f64,
    pub cartons: f64,
    pub units_per_carton: f64,
    pub volume_cbm: f64,
}

/// Round to 2 decimals, ties away from zero (`0.125 -> 0.13`, `1.005 -> 1.01`).
///
/// Values outside the decimal range (and NaN) are returned unchanged.
pub fn round_currency(value: f64) -> f64 {
    to_decimal(value).and_then(to_money).unwrap_or(value)
}

/// Price a single line.
///
/// Fails with [`SkipReason::ZeroCartons`] or [`SkipReason::ZeroUnitsPerCarton`] when the
/// line has nothing to price or freight cannot be spread over its units, and with
/// [`SkipReason::OutOfRange`] when the figures overflow the decimal range.
pub fn landed_cost(inputs: &LineInputs, rates: &RateConfig) -> Result<CostBreakdown, SkipReason> {
    if inputs.cartons == 0.0 {
        return Err(SkipReason::ZeroCartons);
    }
    if inputs.units_per_carton == 0.0 {
        return Err(SkipReason::ZeroUnitsPerCarton);
    }

    let (unit_cost, total_line_cost) =
        decimal_costs(inputs, rates).ok_or(SkipReason::OutOfRange)?;

    Ok(CostBreakdown {
        unit_cost: to_money(unit_cost).ok_or(SkipReason::OutOfRange)?,
        total_line_cost: to_money(total_line_cost).ok_or(SkipReason::OutOfRange)?,
    })
}

/// Unrounded unit and line cost
fn decimal_costs(inputs: &LineInputs, rates: &RateConfig) -> Option<(Decimal, Decimal)> {
    let price = to_decimal(inputs.source_price)?;
    let cartons = to_decimal(inputs.cartons)?;
    let units_per_carton = to_decimal(inputs.units_per_carton)?;
    let volume = to_decimal(inputs.volume_cbm)?;

    let shipping_per_carton = volume.checked_mul(to_decimal(rates.shipping_rate())?)?;
    let shipping_per_unit = shipping_per_carton.checked_div(units_per_carton)?;
    let base_cost = price.checked_mul(to_decimal(rates.exchange_rate())?)?;
    let unit_cost = base_cost.checked_add(shipping_per_unit)?;
    let total_line_cost = unit_cost
        .checked_mul(cartons)?
        .checked_mul(units_per_carton)?;

    Some((unit_cost, total_line_cost))
}

/// Decimal value of `value` as written in the sheet.
///
/// `Display` for `f64` prints the shortest digits that read back as the same float, so
/// `1.005` becomes `1.005` rather than `1.00499999999999989...`.
fn to_decimal(value: f64) -> Option<Decimal> {
    value.to_string().parse().ok()
}

/// Round to cents and return the nearest `f64`
fn to_money(value: Decimal) -> Option<f64> {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_string()
        .parse()
        .ok()
}

/// Price every row below the header.
///
/// Fully blank rows are ignored without a report entry.
pub fn compute_costs(
    grid: &CellGrid,
    header_row: u32,
    layout: &ColumnLayout,
    rates: &RateConfig,
) -> ImportReport {
    let mut report = ImportReport::default();

    for row in header_row.saturating_add(1)..=grid.row_count() {
        if grid.row(row).iter().all(CellValue::is_blank) {
            continue;
        }

        match price_row(grid, row, layout, rates) {
            Ok(item) => report.items.push(item),
            Err(reason) => {
                tracing::debug!("Skipping row {}: {}", row, reason);
                report.skipped.push(SkippedRow {
                    row_index: row,
                    reason,
                });
            }
        }
    }

    report.grand_total = grand_total(&report.items);

    tracing::info!(
        "Priced {} rows ({} skipped), grand total {:.2}",
        report.items.len(),
        report.skipped.len(),
        report.grand_total
    );

    report
}

/// Rounded sum of the line totals, added up in decimal
fn grand_total(items: &[LineItem]) -> f64 {
    let sum = items
        .iter()
        .filter_map(|item| to_decimal(item.total_line_cost))
        .fold(Decimal::ZERO, Decimal::saturating_add);
    to_money(sum).unwrap_or_default()
}

fn price_row(
    grid: &CellGrid,
    row: u32,
    layout: &ColumnLayout,
    rates: &RateConfig,
) -> Result<LineItem, SkipReason> {
    let inputs = LineInputs {
        source_price: read_number(grid, row, layout.price, 0.0)?,
        cartons: read_number(grid, row, layout.cartons, 0.0)?,
        units_per_carton: read_number(grid, row, layout.units_per_carton, 1.0)?,
        volume_cbm: read_number(grid, row, layout.volume, 0.0)?,
    };

    let cost = landed_cost(&inputs, rates)?;

    Ok(LineItem {
        row_index: row,
        name: item_name(grid, row, layout),
        unit_cost: cost.unit_cost,
        total_line_cost: cost.total_line_cost,
        source_price: inputs.source_price,
        quantity: (inputs.cartons * inputs.units_per_carton).max(0.0) as u64,
        cartons: inputs.cartons,
        units_per_carton: inputs.units_per_carton,
        volume_cbm: inputs.volume_cbm,
    })
}

/// Read a numeric cell; a missing column or blank cell yields `default`.
fn read_number(
    grid: &CellGrid,
    row: u32,
    col: Option<u32>,
    default: f64,
) -> Result<f64, SkipReason> {
    let Some(col) = col else {
        return Ok(default);
    };

    let cell = grid.get(row, col);
    coerce_number(cell, default).ok_or_else(|| SkipReason::InvalidNumber {
        column: column_letter(col),
        value: cell.display_text(),
    })
}

/// Best-effort numeric coercion of a cell
pub fn coerce_number(cell: &CellValue, default: f64) -> Option<f64> {
    match cell {
        CellValue::Empty => Some(default),
        CellValue::Text(s) if s.trim().is_empty() => Some(default),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::Number(_) | CellValue::DateTime(_) | CellValue::Error(_) => None,
    }
}

fn item_name(grid: &CellGrid, row: u32, layout: &ColumnLayout) -> String {
    [layout.item, layout.alt_name]
        .into_iter()
        .flatten()
        .map(|col| grid.get(row, col).display_text())
        .find(|name| !name.is_empty() && name != "None")
        .unwrap_or_else(|| UNKNOWN_ITEM_NAME.to_string())
}

/// Spreadsheet column letter for a 1-based column (1 = A, 27 = AA)
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    result
}
