// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for GUI updates.

use crate::models::{AppState, RateConfig, RateError, SessionState};
use camino::Utf8PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events are emitted to notify interested parties (primarily the GUI)
/// about state changes without requiring them to poll the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Exchange or shipping rate changed
    RatesChanged {
        exchange_rate: f64,
        shipping_rate: f64,
    },

    /// A new import replaced the session
    SessionLoaded {
        items: usize,
        skipped: usize,
        grand_total: f64,
    },

    /// The session was discarded
    SessionCleared,

    /// An export finished
    ExportCompleted {
        path: Utf8PathBuf,
    },

    /// An import or export failed as a whole
    OperationFailed {
        operation: String,
        message: String,
    },

    /// Status line text changed
    StatusChanged {
        message: String,
    },
}

/// Thread-safe state manager with event emission
///
/// This is the central state management component that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Validates rate updates before they reach the state
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// The rates held here are the explicit context for pricing: callers read them at the
/// moment they start an import and pass them to
/// [`import_sheet`](crate::services::import_sheet). Changing them never touches a
/// session that already exists.
pub struct StateManager {
    /// The application state protected by RwLock for thread-safe access
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Get a read-only snapshot of the current state
    pub fn snapshot(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let has_data = state_manager.read(|state| state.has_data());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, diffs the two and broadcasts
    /// one event per detected change.
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        drop(state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.rates != new.rates {
            changes.push(StateChange::RatesChanged {
                exchange_rate: new.rates.exchange_rate(),
                shipping_rate: new.rates.shipping_rate(),
            });
        }

        if old.session != new.session {
            match &new.session {
                Some(session) => changes.push(StateChange::SessionLoaded {
                    items: session.items.len(),
                    skipped: session.skipped.len(),
                    grand_total: session.grand_total,
                }),
                None => changes.push(StateChange::SessionCleared),
            }
        }

        if old.last_export_path != new.last_export_path {
            if let Some(path) = &new.last_export_path {
                changes.push(StateChange::ExportCompleted { path: path.clone() });
            }
        }

        if old.status_message != new.status_message {
            changes.push(StateChange::StatusChanged {
                message: new.status_message.clone(),
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Replace the rates used by subsequent imports
    pub fn set_rates(&self, rates: RateConfig) -> Vec<StateChange> {
        self.update(|state| {
            state.rates = rates;
        })
    }

    /// Validate and apply new rates.
    ///
    /// On error the state is left untouched and nothing is emitted.
    pub fn update_rates(
        &self,
        exchange_rate: f64,
        shipping_rate: f64,
    ) -> Result<Vec<StateChange>, RateError> {
        let rates = RateConfig::new(exchange_rate, shipping_rate)?;
        tracing::info!(
            "Rates updated: exchange_rate={}, shipping_rate={}",
            exchange_rate,
            shipping_rate
        );
        Ok(self.set_rates(rates))
    }

    /// Replace the session wholesale after a successful import.
    ///
    /// Always emits [`StateChange::SessionLoaded`], even when a re-import produced the
    /// same session as before.
    pub fn load_session(&self, session: SessionState) -> Vec<StateChange> {
        let status = format!(
            "Loaded {}: {} items, {} skipped",
            session.source_file_name(),
            session.items.len(),
            session.skipped.len()
        );
        let loaded = StateChange::SessionLoaded {
            items: session.items.len(),
            skipped: session.skipped.len(),
            grand_total: session.grand_total,
        };

        let mut changes = self.update(|state| {
            state.session = Some(session);
            state.last_export_path = None;
            state.status_message = status;
        });

        if !changes.contains(&loaded) {
            let _ = self.state_tx.send(loaded.clone());
            changes.push(loaded);
        }

        changes
    }

    /// Drop the current session
    pub fn clear_session(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.session = None;
            state.last_export_path = None;
            state.status_message = "Session cleared".to_string();
        })
    }

    /// Record a finished export
    pub fn record_export(&self, path: Utf8PathBuf) -> Vec<StateChange> {
        let status = format!("Exported to {}", path);
        self.update(|state| {
            state.last_export_path = Some(path);
            state.status_message = status;
        })
    }

    /// Record a batch-fatal failure. The session is left as it was.
    pub fn record_failure(&self, operation: &str, message: String) -> Vec<StateChange> {
        tracing::error!("{} failed: {}", operation, message);

        let mut changes = self.update(|state| {
            state.status_message = format!("{} failed", operation);
        });

        let failure = StateChange::OperationFailed {
            operation: operation.to_string(),
            message,
        };
        let _ = self.state_tx.send(failure.clone());
        changes.push(failure);

        changes
    }

    /// Load startup rates and currency from the user configuration
    ///
    /// Invalid rates in the file are logged and the built-in defaults kept.
    pub fn load_from_user_config(&self, user_config: &crate::models::UserConfig) -> Vec<StateChange> {
        let rates = match RateConfig::try_from(&user_config.rates) {
            Ok(rates) => rates,
            Err(e) => {
                tracing::warn!("Ignoring configured rates: {}", e);
                RateConfig::default()
            }
        };

        self.update(|state| {
            state.rates = rates;
            state.currency = user_config.rates.currency.clone();

            tracing::info!(
                "Loaded user config: exchange_rate={}, shipping_rate={}, currency={}",
                state.rates.exchange_rate(),
                state.rates.shipping_rate(),
                state.currency
            );
        })
    }

    /// Get an Arc reference to the state for use in other threads
    pub fn state_arc(&self) -> Arc<RwLock<AppState>> {
        Arc::clone(&self.state)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
