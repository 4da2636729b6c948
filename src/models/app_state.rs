use crate::models::AccountRecord;

/// Kind of long-running user action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    LoadAccounts,
    Import,
    Export,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::LoadAccounts => "load accounts",
            Operation::Import => "import",
            Operation::Export => "export",
        }
    }
}

/// Single source of truth for all application state.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`].
/// Workers never write it directly: their results travel back to the owning
/// thread, which applies them through
/// [`update()`](crate::state::StateManager::update).
#[derive(Clone, Debug, Default)]
pub struct AppState {
    // Discovery results
    pub userdata_root: Option<camino::Utf8PathBuf>,
    pub accounts: Vec<AccountRecord>,
    pub accounts_loaded: bool,

    // Connectivity probe result; None until checked
    pub online: Option<bool>,

    // Selection
    pub selected_account: Option<String>,

    // Runtime state
    pub current_operation: Option<Operation>,
    pub status_message: String,
    pub last_error: Option<String>,

    // Totals for this session
    pub imports_completed: usize,
    pub exports_completed: usize,
}

impl AppState {
    pub fn is_busy(&self) -> bool {
        self.current_operation.is_some()
    }

    pub fn find_account(&self, id: &str) -> Option<&AccountRecord> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Accounts a config can be imported from: everything except the target.
    pub fn import_sources_for(&self, target_id: &str) -> Vec<&AccountRecord> {
        self.accounts.iter().filter(|a| a.id != target_id).collect()
    }

    /// Summary line for an empty or populated account list.
    pub fn accounts_summary(&self) -> String {
        if self.userdata_root.is_none() {
            "Steam folder not found".to_string()
        } else if self.accounts.is_empty() {
            "No accounts found".to_string()
        } else {
            format!("{} account(s) found", self.accounts.len())
        }
    }
}
