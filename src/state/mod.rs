// State management module
//
// StateManager wraps AppState with thread-safe access using Arc<RwLock<T>>
// and emits change events for whoever is presenting the state.

use crate::models::{AppState, Operation};
use crate::services::LoadedAccounts;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The account list was (re)loaded
    AccountsLoaded {
        count: usize,
        userdata_found: bool,
    },

    /// The connectivity probe finished
    ConnectivityChecked {
        online: bool,
    },

    /// Selected account changed
    AccountSelected {
        account_id: Option<String>,
    },

    /// A long-running operation has started
    OperationStarted {
        operation: Operation,
    },

    /// A long-running operation has finished
    OperationFinished {
        operation: Operation,
        success: bool,
        message: String,
    },
}

/// Thread-safe state manager with event emission
///
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Admits at most one running [`Operation`] at a time
///
/// Background tasks never hold the lock across I/O. They hand their results
/// back to the caller, which applies them here in one
/// [`update()`](Self::update).
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 100 event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Clone of the current state, safe to use without holding locks
    pub fn snapshot(&self) -> AppState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let busy = state_manager.read(|state| state.is_busy());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, then broadcasts whatever
    /// [`detect_changes`](Self::detect_changes) finds.
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = self.detect_changes(&old_state, &state);

        for change in &changes {
            // OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(&self, old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if new.accounts_loaded
            && (!old.accounts_loaded
                || old.accounts != new.accounts
                || old.userdata_root != new.userdata_root)
        {
            changes.push(StateChange::AccountsLoaded {
                count: new.accounts.len(),
                userdata_found: new.userdata_root.is_some(),
            });
        }

        if old.online != new.online {
            if let Some(online) = new.online {
                changes.push(StateChange::ConnectivityChecked { online });
            }
        }

        if old.selected_account != new.selected_account {
            changes.push(StateChange::AccountSelected {
                account_id: new.selected_account.clone(),
            });
        }

        match (old.current_operation, new.current_operation) {
            (None, Some(operation)) => {
                changes.push(StateChange::OperationStarted { operation });
            }
            (Some(operation), None) => {
                changes.push(StateChange::OperationFinished {
                    operation,
                    success: new.last_error.is_none(),
                    message: new.status_message.clone(),
                });
            }
            _ => {}
        }

        changes
    }

    // Convenience methods for common state updates

    /// Claim the single operation slot.
    ///
    /// Returns false, and changes nothing, if another operation is running.
    pub fn try_begin_operation(&self, operation: Operation) -> bool {
        let mut started = false;
        self.update(|state| {
            if state.current_operation.is_some() {
                return;
            }
            state.current_operation = Some(operation);
            state.last_error = None;
            state.status_message = format!("Running {}...", operation.label());
            started = true;
        });

        if !started {
            tracing::warn!(
                "Cannot start {}: another operation is in progress",
                operation.label()
            );
        }
        started
    }

    /// Release the operation slot with the operation's outcome.
    ///
    /// `Ok` carries the status message, `Err` the error message.
    pub fn finish_operation(&self, outcome: Result<String, String>) -> Vec<StateChange> {
        self.update(|state| {
            let Some(operation) = state.current_operation.take() else {
                return;
            };

            match outcome {
                Ok(message) => {
                    match operation {
                        Operation::Import => state.imports_completed += 1,
                        Operation::Export => state.exports_completed += 1,
                        Operation::LoadAccounts => {}
                    }
                    state.status_message = message;
                    state.last_error = None;
                }
                Err(error) => {
                    state.status_message = format!("{} failed", operation.label());
                    state.last_error = Some(error);
                }
            }
        })
    }

    /// Replace the account list with a finished load.
    pub fn set_accounts(&self, loaded: LoadedAccounts) -> Vec<StateChange> {
        self.update(|state| {
            state.userdata_root = loaded.userdata_root;
            state.accounts = loaded.accounts;
            state.accounts_loaded = true;

            // drop a selection that no longer exists
            if let Some(id) = state.selected_account.as_deref() {
                if state.find_account(id).is_none() {
                    state.selected_account = None;
                }
            }
        })
    }

    pub fn set_online(&self, online: bool) -> Vec<StateChange> {
        self.update(|state| state.online = Some(online))
    }

    /// Select an account by id; unknown ids clear the selection.
    pub fn select_account(&self, account_id: Option<&str>) -> Vec<StateChange> {
        self.update(|state| {
            state.selected_account = account_id
                .filter(|id| state.find_account(id).is_some())
                .map(str::to_string);
        })
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Cloneable for sharing across tasks
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
