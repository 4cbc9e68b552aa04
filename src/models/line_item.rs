use std::fmt;

/// One priced row of the supplier sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// 1-based row in the source sheet
    pub row_index: u32,
    pub name: String,
    /// Landed cost of one unit, rounded to 2 dp
    pub unit_cost: f64,
    /// `unit_cost * cartons * units_per_carton`, rounded to 2 dp
    pub total_line_cost: f64,
    /// Unit price in the source currency
    pub source_price: f64,
    /// Total units on the line (cartons × units per carton)
    pub quantity: u64,
    pub cartons: f64,
    pub units_per_carton: f64,
    pub volume_cbm: f64,
}

/// Why a row below the header produced no line item
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    ZeroCartons,
    ZeroUnitsPerCarton,
    InvalidNumber { column: String, value: String },
    /// The figures exceed what the cost arithmetic can represent
    OutOfRange,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ZeroCartons => write!(f, "carton count is zero"),
            SkipReason::ZeroUnitsPerCarton => write!(f, "units per carton is zero"),
            SkipReason::InvalidNumber { column, value } => {
                write!(f, "'{}' in column {} is not a number", value, column)
            }
            SkipReason::OutOfRange => write!(f, "values are too large to price"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row_index: u32,
    pub reason: SkipReason,
}
