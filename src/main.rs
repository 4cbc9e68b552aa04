//! CostSheet - Landed cost calculator for supplier price sheets
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! This binary crate provides the Slint GUI frontend. It initializes:
//! - Configuration loading ([`ConfigManager`])
//! - Logging infrastructure (daily file rotation + optional console output)
//! - State management ([`StateManager`])
//! - GUI controller ([`GuiController`])
//!
//! Imports and exports run on the Slint event loop thread. The only other thread is
//! the state listener that forwards change events back to the window.
//!
//! # Execution Flow
//!
//! 1. Load `CostSheet Data/CostSheet Config.yaml` (defaults when absent)
//! 2. Initialize logging → `<log_dir>/costsheet.<date>`
//! 3. Create StateManager and seed it with the configured rates
//! 4. Create GuiController and run the event loop until the window closes

use anyhow::Result;
use costsheet::ui::GuiController;
use costsheet::{APP_NAME, ConfigManager, StateManager, VERSION};
use std::sync::Arc;

/// Directory holding the YAML settings file, relative to the working directory
const CONFIG_DIR: &str = "CostSheet Data";

fn main() -> Result<()> {
    // Config first: it decides where logs go
    let config_manager = Arc::new(ConfigManager::new(CONFIG_DIR)?);
    let user_config = config_manager.load_user_config()?;

    let _log_guard = costsheet::logging::init_from_settings(&user_config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let state_manager = Arc::new(StateManager::new());
    state_manager.load_from_user_config(&user_config);
    tracing::info!("State manager initialized");

    let gui_controller = GuiController::new(state_manager, config_manager, user_config)?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the window is closed
    let result = gui_controller.run();

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
