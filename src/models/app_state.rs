use crate::models::{RateConfig, RateSettings, SessionState};
use camino::Utf8PathBuf;

/// Single source of truth for all application state.
///
/// Holds the rates used for the next import, the current import session and the
/// outcome of the last export.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`].
/// Never mutate it directly - always go through the manager so change events are emitted:
/// - [`read()`](crate::state::StateManager::read) for read-only access
/// - [`update()`](crate::state::StateManager::update) for mutations with automatic change events
#[derive(Clone, Debug)]
pub struct AppState {
    // Settings
    pub rates: RateConfig,
    pub currency: String,

    // Current import
    pub session: Option<SessionState>,

    // Last outcomes
    pub last_export_path: Option<Utf8PathBuf>,
    pub status_message: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            rates: RateConfig::default(),
            currency: RateSettings::default().currency,
            session: None,
            last_export_path: None,
            status_message: String::new(),
        }
    }
}

impl AppState {
    pub fn has_data(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn item_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.items.len())
    }

    pub fn skipped_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.skipped.len())
    }

    pub fn grand_total(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.grand_total)
    }

    pub fn source_path(&self) -> Option<&Utf8PathBuf> {
        self.session.as_ref().map(|s| &s.source_path)
    }
}
