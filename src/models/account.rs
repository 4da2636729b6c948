use camino::Utf8PathBuf;
use serde::Serialize;

/// An account directory accepted by discovery.
///
/// Produced once on the discovery thread and never mutated. Display name and
/// avatar arrive later as an [`AccountEnrichment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAccount {
    /// Numeric Steam account id (the `userdata` folder name).
    pub id: String,

    /// The per-game folder holding `cfg`, `local/cfg` and `remote/cfg`.
    pub config_root: Utf8PathBuf,

    /// The account's `localconfig.vdf`.
    pub save_file: Utf8PathBuf,
}

/// Result of the per-account background work (save file + avatar download).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEnrichment {
    pub id: String,
    pub display_name: String,
    pub avatar_path: Option<Utf8PathBuf>,
}

/// Fully loaded account as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub id: String,
    pub display_name: String,
    pub avatar_path: Option<Utf8PathBuf>,
    pub root_path: Utf8PathBuf,
}

impl AccountRecord {
    /// Merge a discovery record with its enrichment result.
    ///
    /// A missing enrichment (the worker failed) falls back to `"User {id}"`
    /// with no avatar.
    pub fn merge(account: DiscoveredAccount, enrichment: Option<AccountEnrichment>) -> Self {
        let (display_name, avatar_path) = match enrichment {
            Some(e) => (e.display_name, e.avatar_path),
            None => (fallback_display_name(&account.id), None),
        };

        Self {
            id: account.id,
            display_name,
            avatar_path,
            root_path: account.config_root,
        }
    }
}

/// Name shown when the save file has nothing better.
pub fn fallback_display_name(account_id: &str) -> String {
    format!("User {}", account_id)
}
