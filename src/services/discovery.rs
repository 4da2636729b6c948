//! Account discovery: which Steam accounts on this machine have Dota 2 configs.
//!
//! Layout walked:
//!
//! ```text
//! <userdata root>/<numeric id>/570/{cfg,local/cfg,remote/cfg}
//! <userdata root>/<numeric id>/config/localconfig.vdf
//! ```
//!
//! Nothing here is an error to the caller. Rejected folders are logged and
//! skipped; a missing root or an empty result are both displayable states.

use crate::models::{BridgeSettings, DiscoveredAccount};
use crate::services::bundle::BundleLayout;
use crate::services::save_file::validate_save_file;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Outcome of a discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// The `userdata` directory used, or `None` if no candidate exists.
    pub userdata_root: Option<Utf8PathBuf>,

    /// Accepted accounts, in numeric id order.
    pub accounts: Vec<DiscoveredAccount>,
}

/// First candidate that exists as a directory.
pub fn find_userdata_root(candidates: &[Utf8PathBuf]) -> Option<Utf8PathBuf> {
    let found = candidates.iter().find(|p| p.is_dir()).cloned();
    match &found {
        Some(root) => tracing::info!("Using Steam userdata at {}", root),
        None => tracing::warn!("Steam userdata path not found (tried {} candidates)", candidates.len()),
    }
    found
}

fn is_account_id(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

/// Check one `userdata/<id>` folder; `None` means rejected (already logged).
pub fn inspect_account(
    account_dir: &Utf8Path,
    account_id: &str,
    settings: &BridgeSettings,
    layout: &BundleLayout,
) -> Option<DiscoveredAccount> {
    let config_root = account_dir.join(&settings.game_app_id);
    if !config_root.is_dir() {
        tracing::debug!("No game folder for {}. Skipping.", account_id);
        return None;
    }

    if !layout.is_present(&config_root) {
        tracing::info!("No config files found for {}. Skipping.", account_id);
        return None;
    }

    let save_file = account_dir.join(&settings.save_file);
    if let Err(e) = validate_save_file(&save_file) {
        tracing::info!("Unusable save file for {}: {}. Skipping.", account_id, e);
        return None;
    }

    Some(DiscoveredAccount {
        id: account_id.to_string(),
        config_root,
        save_file,
    })
}

/// Enumerate accounts under an explicit `userdata` root.
pub fn discover_in(root: &Utf8Path, settings: &BridgeSettings) -> Vec<DiscoveredAccount> {
    let layout = BundleLayout::from_settings(settings);

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Error accessing Steam userdata {}: {}", root, e);
            return Vec::new();
        }
    };

    let mut accounts: Vec<DiscoveredAccount> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !is_account_id(&name) {
                return None;
            }
            inspect_account(&root.join(&name), &name, settings, &layout)
        })
        .collect();

    // numeric order for digit strings
    accounts.sort_by(|a, b| a.id.len().cmp(&b.id.len()).then_with(|| a.id.cmp(&b.id)));

    tracing::info!("Discovered {} account(s) in {}", accounts.len(), root);
    accounts
}

/// Locate the `userdata` root and enumerate its accounts.
pub fn discover_accounts(settings: &BridgeSettings) -> Discovery {
    let Some(root) = find_userdata_root(&settings.steam_userdata_paths) else {
        return Discovery::default();
    };

    let accounts = discover_in(&root, settings);
    Discovery {
        userdata_root: Some(root),
        accounts,
    }
}
