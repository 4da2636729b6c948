use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dota 2's Steam app id; names the per-game folder inside each account.
pub const DOTA_APP_ID: &str = "570";

/// Avatar URL template; `{hash}` is replaced by the account's avatar hash.
pub const DEFAULT_AVATAR_URL_TEMPLATE: &str =
    "https://avatars.cloudflare.steamstatic.com/{hash}_full.jpg";

/// User configuration from ConfigBridge Settings.yaml
///
/// Wraps the settings section so the YAML file keeps a single top-level key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "ConfigBridge_Settings", default)]
    pub settings: BridgeSettings,
}

/// Every path and constant the discovery, transfer and avatar services need.
///
/// Passed explicitly into the services instead of living in globals, so tests
/// can point discovery at a synthetic Steam tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Candidate Steam `userdata` roots, tried in order.
    pub steam_userdata_paths: Vec<Utf8PathBuf>,

    /// Per-game folder name inside an account directory.
    pub game_app_id: String,

    /// Save file location relative to the account directory.
    pub save_file: Utf8PathBuf,

    /// Conventional config subdirectories relative to the game folder.
    pub config_subdirs: Vec<Utf8PathBuf>,

    /// Where downloaded avatars are cached, relative to the working directory.
    pub avatar_dir: Utf8PathBuf,

    pub avatar_url_template: String,
    pub avatar_timeout_secs: u64,

    pub connectivity_url: String,
    pub connectivity_timeout_secs: u64,

    pub log_dir: Utf8PathBuf,
    pub debug_mode: bool,

    /// Parent for archive extraction and export staging directories.
    /// The system temporary directory when unset.
    pub temp_dir: Option<Utf8PathBuf>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            steam_userdata_paths: default_userdata_candidates(),
            game_app_id: DOTA_APP_ID.to_string(),
            save_file: Utf8PathBuf::from("config/localconfig.vdf"),
            config_subdirs: vec![
                Utf8PathBuf::from("cfg"),
                Utf8PathBuf::from("local/cfg"),
                Utf8PathBuf::from("remote/cfg"),
            ],
            avatar_dir: Utf8PathBuf::from("avatars"),
            avatar_url_template: DEFAULT_AVATAR_URL_TEMPLATE.to_string(),
            avatar_timeout_secs: 5,
            connectivity_url: "http://google.com".to_string(),
            connectivity_timeout_secs: 3,
            log_dir: Utf8PathBuf::from("logs"),
            debug_mode: false,
            temp_dir: None,
        }
    }
}

impl BridgeSettings {
    /// Settings rooted at a single user-data directory. Used by tests and the
    /// `--userdata` flag.
    pub fn with_userdata_root<P: AsRef<Utf8Path>>(root: P) -> Self {
        Self {
            steam_userdata_paths: vec![root.as_ref().to_path_buf()],
            ..Self::default()
        }
    }

    pub fn avatar_timeout(&self) -> Duration {
        Duration::from_secs(self.avatar_timeout_secs)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs)
    }

    /// Build the download URL for an avatar hash, or `None` for an empty hash.
    pub fn avatar_url(&self, avatar_hash: &str) -> Option<String> {
        if avatar_hash.is_empty() {
            return None;
        }
        Some(self.avatar_url_template.replace("{hash}", avatar_hash))
    }
}

/// Ordered Steam `userdata` candidates for the current machine.
///
/// The Windows install locations come first, then the home-relative ones.
pub fn default_userdata_candidates() -> Vec<Utf8PathBuf> {
    let mut candidates = vec![
        Utf8PathBuf::from("C:/Program Files (x86)/Steam/userdata"),
        Utf8PathBuf::from("C:/Program Files/Steam/userdata"),
        Utf8PathBuf::from("D:/Steam/userdata"),
    ];

    if let Some(home) = dirs::home_dir().and_then(|h| Utf8PathBuf::from_path_buf(h).ok()) {
        candidates.push(home.join("Steam/userdata"));
        candidates.push(home.join(".steam/steam/userdata"));
        candidates.push(home.join(".local/share/Steam/userdata"));
        candidates.push(home.join("Library/Application Support/Steam/userdata"));
    }

    candidates
}
