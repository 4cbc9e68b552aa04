//! Data models for the CostSheet application.
//!
//! - [`AppState`]: The central state container (rates, current session, last export)
//! - [`RateConfig`]: Validated exchange and shipping rates fed to the cost calculator
//! - [`LineItem`] / [`SkippedRow`]: Per-row outcomes of an import
//! - [`SessionState`]: Everything produced by one import, consumed by the exporter and the UI
//! - [`UserConfig`]: Startup defaults loaded from `CostSheet Config.yaml`
//!
//! # Architecture Note
//!
//! `AppState` is wrapped in `Arc<RwLock<>>` by [`StateManager`](crate::state::StateManager).
//! A `SessionState` is never edited in place; each import replaces it.

pub mod app_state;
pub mod config;
pub mod line_item;
pub mod rates;
pub mod session;

pub use app_state::AppState;
pub use config::{
    ColumnLabels, ExportSettings, ImportSettings, LoggingSettings, RateSettings, UserConfig,
};
pub use line_item::{LineItem, SkipReason, SkippedRow};
pub use rates::{RateConfig, RateError};
pub use session::{ColumnMap, SessionState};
