// GUI Controller - Bridges Slint UI with Rust State Management
//
// This module contains the GuiController which coordinates between:
// - Slint UI (MainWindow)
// - StateManager (application state)
// - The import and export services
//
// Import and export run synchronously inside the Slint callbacks. A background thread
// forwards StateChange events back onto the event loop.

use crate::config::ConfigManager;
use crate::models::{AppState, LineItem, RateConfig, SkippedRow, UserConfig};
use crate::services::{ExportOptions, ImportOptions, export_session, import_sheet};
use crate::state::{StateChange, StateManager};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use slint::{ModelRc, SharedString, VecModel};
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;

// Include the generated Slint code
slint::include_modules!();

const PAGE_RESULTS: i32 = 1;

/// File types offered by the import picker
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// GUI Controller that wires up the Slint UI with application state and logic
///
/// This is the main coordinator for the GUI layer. It:
/// - Sets up Slint callbacks that call the import/export services
/// - Subscribes to StateManager events and updates the UI accordingly
/// - Handles file browser dialogs using the `rfd` crate
///
/// # Example
/// ```ignore
/// let state_manager = Arc::new(StateManager::new());
/// let config_manager = Arc::new(ConfigManager::new("CostSheet Data")?);
/// let user_config = config_manager.load_user_config()?;
///
/// let controller = GuiController::new(state_manager, config_manager, user_config)?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController {
    /// The Slint UI window
    ui: MainWindow,

    /// Shared state manager
    _state_manager: Arc<StateManager>,
}

impl GuiController {
    /// Create a new GUI controller
    ///
    /// # Arguments
    /// * `state_manager` - Shared application state manager
    /// * `config_manager` - Writes the YAML file on "Save as Defaults"
    /// * `user_config` - The configuration loaded at startup (labels, export folder)
    pub fn new(
        state_manager: Arc<StateManager>,
        config_manager: Arc<ConfigManager>,
        user_config: UserConfig,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;

        ui.set_app_version(crate::VERSION.into());
        Self::sync_ui_with_state(&ui, &state_manager.snapshot());

        let user_config = Arc::new(Mutex::new(user_config));
        Self::setup_callbacks(&ui, &state_manager, &config_manager, &user_config);
        Self::setup_state_subscription(&ui, &state_manager);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            _state_manager: state_manager,
        })
    }

    /// Run the GUI (blocks until window is closed)
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        self.ui.run()
    }

    /// Push the whole state into the UI.
    ///
    /// Called at startup and whenever a state event arrives; the state is small
    /// enough that partial updates aren't worth the bookkeeping.
    fn sync_ui_with_state(ui: &MainWindow, state: &AppState) {
        ui.set_currency(state.currency.as_str().into());
        ui.set_exchange_rate_text(format_rate(state.rates.exchange_rate()).into());
        ui.set_shipping_rate_text(format_rate(state.rates.shipping_rate()).into());

        ui.set_has_data(state.has_data());
        ui.set_item_count(to_ui_int(state.item_count()));
        ui.set_skipped_count(to_ui_int(state.skipped_count()));
        ui.set_grand_total(format_money(state.grand_total()).into());
        ui.set_last_export_path(
            state
                .last_export_path
                .as_ref()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default()
                .into(),
        );

        match &state.session {
            Some(session) => {
                ui.set_source_file(session.source_file_name().into());
                ui.set_total_units(to_ui_int(session.total_units()));
                ui.set_line_items(line_item_model(&session.items));
                ui.set_skipped_rows(skipped_row_model(&session.skipped));
            }
            None => {
                ui.set_source_file(SharedString::new());
                ui.set_total_units(0);
                ui.set_line_items(line_item_model(&[]));
                ui.set_skipped_rows(skipped_row_model(&[]));
            }
        }

        ui.set_status_message(status_message(state).into());

        tracing::debug!("UI synchronized with state");
    }

    /// Set up Slint UI callbacks
    fn setup_callbacks(
        ui: &MainWindow,
        state_manager: &Arc<StateManager>,
        config_manager: &Arc<ConfigManager>,
        user_config: &Arc<Mutex<UserConfig>>,
    ) {
        let state = Arc::clone(state_manager);
        let config = Arc::clone(user_config);
        let ui_weak = ui.as_weak();

        // Import: pick a file, then price it with the current rates
        ui.on_import_sheet(move || {
            tracing::debug!("Import button clicked");

            if let Some(path) = Self::show_file_picker(
                "Select Supplier Price Sheet",
                vec![("Spreadsheets", WORKBOOK_EXTENSIONS)],
            ) {
                let options = ImportOptions::from(&*lock(&config));
                Self::run_import(&ui_weak, &state, &path, &options);
            }
        });

        let state = Arc::clone(state_manager);
        let config = Arc::clone(user_config);
        let ui_weak = ui.as_weak();

        // Re-import: same file, current rates
        ui.on_reimport_sheet(move || {
            let Some(path) = state.read(|s| s.source_path().cloned()) else {
                tracing::debug!("Re-import requested without a session");
                return;
            };

            tracing::info!("Re-importing {}", path);
            let options = ImportOptions::from(&*lock(&config));
            Self::run_import(&ui_weak, &state, &path, &options);
        });

        let state = Arc::clone(state_manager);
        let config = Arc::clone(user_config);
        let ui_weak = ui.as_weak();

        ui.on_export_sheet(move || {
            tracing::info!("Export button clicked");

            let Some(session) = state.read(|s| s.session.clone()) else {
                Self::show_error_dialog(
                    &ui_weak,
                    "Nothing to Export",
                    "Import a price sheet first.",
                    "",
                );
                return;
            };

            let mut options = ExportOptions::from_config(&lock(&config));
            options.currency = state.read(|s| s.currency.clone());

            match export_session(&session, &options) {
                Ok(path) => {
                    state.record_export(path.clone());
                    Self::show_message_dialog(
                        &ui_weak,
                        "Export Complete",
                        format!("Saved {} line items to:\n{}", session.items.len(), path),
                    );
                }
                Err(e) => {
                    state.record_failure("Export", e.to_string());
                    Self::show_error_dialog(
                        &ui_weak,
                        "Export Failed",
                        e.to_string(),
                        format!("{:?}", e),
                    );
                }
            }
        });

        let state = Arc::clone(state_manager);

        ui.on_clear_session(move || {
            tracing::info!("Clear button clicked");
            state.clear_session();
        });

        let state = Arc::clone(state_manager);
        let ui_weak = ui.as_weak();

        // Apply: validate the text fields and replace the rates in memory
        ui.on_apply_rates(move || {
            let Some(ui) = ui_weak.upgrade() else {
                return;
            };

            match Self::apply_rates_from_form(&ui, &state) {
                Ok(rates) => {
                    ui.set_settings_error(SharedString::new());
                    state.update(|s| {
                        s.status_message = format!(
                            "Rates applied: {} / {}",
                            format_rate(rates.exchange_rate()),
                            format_rate(rates.shipping_rate())
                        );
                    });
                }
                Err(message) => {
                    tracing::warn!("Rejected rates: {}", message);
                    ui.set_settings_error(message.into());
                }
            }
        });

        let state = Arc::clone(state_manager);
        let config = Arc::clone(user_config);
        let config_manager = Arc::clone(config_manager);
        let ui_weak = ui.as_weak();

        // Save as defaults: apply, then persist the rates to the YAML file
        ui.on_save_defaults(move || {
            let Some(ui) = ui_weak.upgrade() else {
                return;
            };

            let rates = match Self::apply_rates_from_form(&ui, &state) {
                Ok(rates) => rates,
                Err(message) => {
                    ui.set_settings_error(message.into());
                    return;
                }
            };
            ui.set_settings_error(SharedString::new());

            let mut config = lock(&config);
            config.rates.exchange_rate = rates.exchange_rate();
            config.rates.shipping_rate = rates.shipping_rate();

            match config_manager.save_user_config(&config) {
                Ok(()) => {
                    state.update(|s| {
                        s.status_message = format!(
                            "Defaults saved to {}",
                            config_manager.user_config_path()
                        );
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to save defaults: {:?}", e);
                    Self::show_error_dialog(
                        &ui_weak,
                        "Save Failed",
                        "The settings file could not be written.",
                        format!("{:?}", e),
                    );
                }
            }
        });

        let ui_weak = ui.as_weak();

        ui.on_error_dialog_dismissed(move || {
            tracing::debug!("Error dialog dismissed");
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_show_error_dialog(false);
            }
        });

        let ui_weak = ui.as_weak();

        ui.on_message_dialog_dismissed(move || {
            tracing::debug!("Message dialog dismissed");
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_show_message_dialog(false);
            }
        });

        let ui_weak = ui.as_weak();

        ui.on_show_about(move || {
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_show_about_dialog(true);
            }
        });

        let ui_weak = ui.as_weak();

        ui.on_about_dialog_dismissed(move || {
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_show_about_dialog(false);
            }
        });

        tracing::debug!("UI callbacks configured");
    }

    /// Subscribe to state changes and update UI accordingly
    ///
    /// This spawns a background thread that listens for state change events and
    /// hands a fresh snapshot to the Slint event loop.
    fn setup_state_subscription(ui: &MainWindow, state_manager: &Arc<StateManager>) {
        let ui_weak = ui.as_weak();
        let state_manager = Arc::clone(state_manager);
        let mut rx = state_manager.subscribe();

        std::thread::spawn(move || {
            tracing::debug!("State subscription thread started");

            loop {
                match rx.blocking_recv() {
                    Ok(change) => {
                        tracing::trace!("State change received: {:?}", change);

                        if let StateChange::OperationFailed { operation, message } = &change {
                            tracing::debug!("{} failure forwarded to UI: {}", operation, message);
                        }

                        let snapshot = state_manager.snapshot();
                        let jump_to_results = matches!(
                            change,
                            StateChange::SessionLoaded { items, .. } if items > 0
                        );

                        let posted = ui_weak.upgrade_in_event_loop(move |ui| {
                            Self::sync_ui_with_state(&ui, &snapshot);
                            if jump_to_results {
                                ui.set_current_page(PAGE_RESULTS);
                            }
                        });

                        if posted.is_err() {
                            tracing::debug!("Event loop gone, stopping state subscription");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // A later event carries a full snapshot anyway
                        tracing::warn!("State subscription lagged by {} events", skipped);
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("State channel closed");
                        break;
                    }
                }
            }
        });
    }

    /// Import `path` with the rates in force right now and store the session
    fn run_import(
        ui_weak: &slint::Weak<MainWindow>,
        state: &StateManager,
        path: &Utf8Path,
        options: &ImportOptions,
    ) {
        let rates = state.read(|s| s.rates);

        match import_sheet(path, &rates, options) {
            Ok(session) => {
                let empty = session.is_empty();
                let skipped = session.skipped.len();
                state.load_session(session);

                if empty {
                    Self::show_message_dialog(
                        ui_weak,
                        "No Priced Rows",
                        format!(
                            "The header was found but no row could be priced ({} skipped).",
                            skipped
                        ),
                    );
                }
            }
            Err(e) => {
                state.record_failure("Import", e.to_string());
                Self::show_error_dialog(ui_weak, "Import Failed", e.to_string(), path.as_str());
            }
        }
    }

    /// Parse the settings form and push valid rates into the state
    fn apply_rates_from_form(ui: &MainWindow, state: &StateManager) -> Result<RateConfig, String> {
        let rates = RateConfig::parse(&ui.get_exchange_rate_text(), &ui.get_shipping_rate_text())
            .map_err(|e| e.to_string())?;
        state.set_rates(rates);
        Ok(rates)
    }

    /// Show an error dialog with the given title, message, and details
    fn show_error_dialog(
        ui_weak: &slint::Weak<MainWindow>,
        title: impl Into<SharedString>,
        message: impl Into<SharedString>,
        details: impl Into<SharedString>,
    ) {
        if let Some(ui) = ui_weak.upgrade() {
            ui.set_error_title(title.into());
            ui.set_error_message(message.into());
            ui.set_error_details(details.into());
            ui.set_show_error_dialog(true);
        }
    }

    /// Show an informational message dialog
    fn show_message_dialog(
        ui_weak: &slint::Weak<MainWindow>,
        title: impl Into<SharedString>,
        message: impl Into<SharedString>,
    ) {
        if let Some(ui) = ui_weak.upgrade() {
            ui.set_message_title(title.into());
            ui.set_message_text(message.into());
            ui.set_show_message_dialog(true);
        }
    }

    /// Show a native file picker dialog
    ///
    /// Returns `None` when the dialog is cancelled or the path isn't valid UTF-8.
    fn show_file_picker(title: &str, filters: Vec<(&str, &[&str])>) -> Option<Utf8PathBuf> {
        use rfd::FileDialog;

        let mut dialog = FileDialog::new().set_title(title);

        for (name, extensions) in filters {
            dialog = dialog.add_filter(name, extensions);
        }

        dialog.pick_file().and_then(|path| {
            Utf8PathBuf::try_from(path)
                .map_err(|e| {
                    tracing::error!("Failed to convert path to UTF-8: {}", e);
                    e
                })
                .ok()
        })
    }
}

fn lock(config: &Mutex<UserConfig>) -> std::sync::MutexGuard<'_, UserConfig> {
    config.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_ui_int<T: TryInto<i32>>(value: T) -> i32 {
    value.try_into().unwrap_or(i32::MAX)
}

fn line_item_model(items: &[LineItem]) -> ModelRc<LineItemRow> {
    let rows: Vec<LineItemRow> = items.iter().map(line_item_row).collect();
    ModelRc::from(Rc::new(VecModel::from(rows)))
}

fn skipped_row_model(skipped: &[SkippedRow]) -> ModelRc<SkippedRowEntry> {
    let rows: Vec<SkippedRowEntry> = skipped
        .iter()
        .map(|row| SkippedRowEntry {
            row: to_ui_int(row.row_index),
            reason: row.reason.to_string().into(),
        })
        .collect();
    ModelRc::from(Rc::new(VecModel::from(rows)))
}

fn line_item_row(item: &LineItem) -> LineItemRow {
    LineItemRow {
        row: to_ui_int(item.row_index),
        name: item.name.as_str().into(),
        unit_cost: format_money(item.unit_cost).into(),
        total: format_money(item.total_line_cost).into(),
        price: format_money(item.source_price).into(),
        quantity: to_ui_int(item.quantity),
        cartons: format_rate(item.cartons).into(),
        volume: format_rate(item.volume_cbm).into(),
    }
}

/// Two decimals with thousands separators, e.g. `1,234,567.89`
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

/// Shortest form that parses back to the same value (`36`, `0.25`)
pub fn format_rate(value: f64) -> String {
    format!("{}", value)
}

/// Status line for a state snapshot. An explicit message from the last action wins.
pub fn status_message(state: &AppState) -> String {
    if !state.status_message.is_empty() {
        return state.status_message.clone();
    }

    match &state.session {
        Some(session) => format!(
            "{}: {} items, total {} {}",
            session.source_file_name(),
            session.items.len(),
            format_money(session.grand_total),
            state.currency
        ),
        None => "Import a supplier price sheet to begin".to_string(),
    }
}
