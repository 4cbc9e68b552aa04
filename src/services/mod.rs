//! Services module - Pure business logic for pricing supplier sheets.
//!
//! Everything here is framework-agnostic: no Slint, no global state. Inputs are explicit
//! parameters (a [`RateConfig`](crate::models::RateConfig) is passed to every pricing
//! call) and outputs are plain values.
//!
//! # Components
//!
//! - [`workbook`]: Loads sheets through `calamine` into a 1-based [`CellGrid`]
//! - [`header`]: Finds the header row and maps labels to columns ([`ColumnLayout`])
//! - [`costing`]: The landed cost calculator and the per-row pricing pass
//! - [`import`]: Composes the three above into [`import_sheet`]
//! - [`export`]: Writes the annotated copy with `rust_xlsxwriter` ([`export_session`])
//!
//! # Pipeline
//!
//! ```text
//! read_first_sheet -> locate_header -> compute_costs -> SessionState -> export_session
//! ```
//!
//! Import and export run synchronously on the caller's thread. A failure in either aborts
//! the whole operation; a row that cannot be priced is reported as a
//! [`SkippedRow`](crate::models::SkippedRow) and the pass continues.

pub mod costing;
pub mod export;
pub mod header;
pub mod import;
pub mod workbook;

pub use costing::{ImportReport, compute_costs, landed_cost, round_currency};
pub use export::{ExportError, ExportOptions, export_session, resolve_target_column};
pub use header::{ColumnLayout, HEADER_SCAN_LIMIT, HeaderInfo, locate_header};
pub use import::{ImportError, ImportOptions, import_sheet};
pub use workbook::{CellGrid, CellValue, SheetData, WorkbookError};
