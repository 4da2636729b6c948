//! Save-file reader: display name and avatar hash from `localconfig.vdf`.
//!
//! The file layout the reader relies on:
//!
//! ```text
//! "UserLocalConfigStore"
//! {
//!     "friends"
//!     {
//!         "PersonaName"   "<store-wide name>"
//!         "<account id>"
//!         {
//!             "Name"          "<name>"
//!             "avatar"        "<avatar hash>"
//!             "NameHistory"   { "0" "<most recent>" "1" "<older>" }
//!         }
//!     }
//! }
//! ```
//!
//! [`read_profile`] never fails: every problem is logged and answered with
//! the `"User {id}"` fallback and no avatar.

use crate::models::fallback_display_name;
use crate::services::keyvalues::{self, KeyValuesError, KvObject, KvValue, lookup};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Top-level section holding per-user data.
pub const STORE_SECTION: &str = "UserLocalConfigStore";

/// Section inside [`STORE_SECTION`] with one entry per account id.
pub const FRIENDS_SECTION: &str = "friends";

/// What the save file tells us about one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProfile {
    pub display_name: String,
    pub avatar_id: Option<String>,
}

impl AccountProfile {
    pub fn fallback(account_id: &str) -> Self {
        Self {
            display_name: fallback_display_name(account_id),
            avatar_id: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SaveFileError {
    #[error("Save file not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("Failed to read save file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse save file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: KeyValuesError,
    },

    #[error("Section \"{section}\" missing from {path}")]
    MissingSection {
        path: Utf8PathBuf,
        section: &'static str,
    },
}

/// One step of the display-name fallback chain.
///
/// Each resolver sees the `friends` section and the account's own entry (if
/// any) and either produces a name or passes.
pub struct NameResolver {
    pub name: &'static str,
    pub resolve: fn(friends: &KvObject, entry: Option<&KvObject>) -> Option<String>,
}

/// Display-name resolvers in precedence order.
pub const NAME_RESOLVERS: &[NameResolver] = &[
    NameResolver {
        name: "store-wide PersonaName",
        resolve: store_persona_name,
    },
    NameResolver {
        name: "account Name",
        resolve: entry_name,
    },
    NameResolver {
        name: "account NameHistory",
        resolve: entry_name_history,
    },
];

fn non_empty(value: Option<&KvValue>) -> Option<String> {
    value
        .and_then(KvValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn store_persona_name(friends: &KvObject, _entry: Option<&KvObject>) -> Option<String> {
    non_empty(lookup(friends, "PersonaName"))
}

fn entry_name(_friends: &KvObject, entry: Option<&KvObject>) -> Option<String> {
    non_empty(lookup(entry?, "Name"))
}

fn entry_name_history(_friends: &KvObject, entry: Option<&KvObject>) -> Option<String> {
    let history = lookup(entry?, "NameHistory")?;
    let first = match history {
        KvValue::Object(map) => map.values().next(),
        KvValue::Sequence(items) => items.first(),
        KvValue::Str(_) => Some(history),
    };
    non_empty(first)
}

/// Run the resolver chain for `account_id`, falling back to `"User {id}"`.
pub fn resolve_display_name(friends: &KvObject, account_id: &str) -> String {
    let entry = lookup(friends, account_id).and_then(KvValue::as_object);

    for resolver in NAME_RESOLVERS {
        if let Some(name) = (resolver.resolve)(friends, entry) {
            tracing::debug!("Display name for {} from {}", account_id, resolver.name);
            return name;
        }
    }

    fallback_display_name(account_id)
}

/// The account entry's avatar hash, if present and non-empty.
pub fn resolve_avatar_id(friends: &KvObject, account_id: &str) -> Option<String> {
    let entry = lookup(friends, account_id).and_then(KvValue::as_object)?;
    non_empty(lookup(entry, "avatar"))
}

/// Read and parse a save file.
pub fn load_save_file(path: &Utf8Path) -> Result<KvObject, SaveFileError> {
    if !path.is_file() {
        return Err(SaveFileError::NotFound(path.to_path_buf()));
    }

    let contents = fs::read(path).map_err(|source| SaveFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Steam writes UTF-8; tolerate stray bytes in names rather than reject the file
    let text = String::from_utf8_lossy(&contents);

    keyvalues::parse(&text).map_err(|source| SaveFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `UserLocalConfigStore.friends` of a parsed save file.
pub fn friends_section<'a>(root: &'a KvObject, path: &Utf8Path) -> Result<&'a KvObject, SaveFileError> {
    let store = lookup(root, STORE_SECTION)
        .and_then(KvValue::as_object)
        .ok_or_else(|| SaveFileError::MissingSection {
            path: path.to_path_buf(),
            section: STORE_SECTION,
        })?;

    lookup(store, FRIENDS_SECTION)
        .and_then(KvValue::as_object)
        .ok_or_else(|| SaveFileError::MissingSection {
            path: path.to_path_buf(),
            section: FRIENDS_SECTION,
        })
}

/// Check that a save file parses and names at least the user section.
pub fn validate_save_file(path: &Utf8Path) -> Result<(), SaveFileError> {
    let root = load_save_file(path)?;
    friends_section(&root, path)?;
    Ok(())
}

/// Like [`read_profile`] but reports why the save file could not be used.
pub fn try_read_profile(path: &Utf8Path, account_id: &str) -> Result<AccountProfile, SaveFileError> {
    let root = load_save_file(path)?;
    let friends = friends_section(&root, path)?;

    Ok(AccountProfile {
        display_name: resolve_display_name(friends, account_id),
        avatar_id: resolve_avatar_id(friends, account_id),
    })
}

/// Display name and avatar id for `account_id`; never fails.
pub fn read_profile(path: &Utf8Path, account_id: &str) -> AccountProfile {
    match try_read_profile(path, account_id) {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!("Using fallback profile for {}: {}", account_id, e);
            AccountProfile::fallback(account_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn friends(doc: &str) -> KvObject {
        let root = keyvalues::parse(doc).unwrap();
        friends_section(&root, Utf8Path::new("test.vdf"))
            .unwrap()
            .clone()
    }

    #[test]
    fn test_store_wide_name_wins() {
        let f = friends(
            r#""UserLocalConfigStore" { "friends" {
                "PersonaName" "Override"
                "42" { "Name" "Own" "NameHistory" { "0" "Old" } }
            } }"#,
        );
        assert_eq!(resolve_display_name(&f, "42"), "Override");
    }

    #[test]
    fn test_entry_name_when_no_override() {
        let f = friends(r#""UserLocalConfigStore" { "friends" { "42" { "Name" "Own" } } }"#);
        assert_eq!(resolve_display_name(&f, "42"), "Own");
    }

    #[test]
    fn test_empty_override_is_skipped() {
        let f = friends(
            r#""UserLocalConfigStore" { "friends" { "PersonaName" "" "42" { "name" "Own" } } }"#,
        );
        assert_eq!(resolve_display_name(&f, "42"), "Own");
    }

    #[test]
    fn test_name_history_mapping() {
        let f = friends(
            r#""UserLocalConfigStore" { "friends" {
                "42" { "NameHistory" { "0" "Newest" "1" "Older" } }
            } }"#,
        );
        assert_eq!(resolve_display_name(&f, "42"), "Newest");
    }

    #[test]
    fn test_name_history_sequence() {
        let f = friends(
            r#""UserLocalConfigStore" { "friends" {
                "42" { "NameHistory" "Newest" "NameHistory" "Older" }
            } }"#,
        );
        assert_eq!(resolve_display_name(&f, "42"), "Newest");
    }

    #[test]
    fn test_fallback_name() {
        let f = friends(r#""UserLocalConfigStore" { "friends" { "42" { "avatar" "abc" } } }"#);
        assert_eq!(resolve_display_name(&f, "42"), "User 42");
        assert_eq!(resolve_display_name(&f, "7"), "User 7");
    }

    #[test]
    fn test_repeated_friends_section() {
        let f = friends(
            r#""UserLocalConfigStore" {
                "friends" { "PersonaName" "Override" }
                "friends" { "42" { "Name" "Own" } }
            }"#,
        );
        assert_eq!(resolve_display_name(&f, "42"), "Override");
        assert!(f.contains_key("42"));
    }

    #[test]
    fn test_repeated_account_entry() {
        let f = friends(
            r#""UserLocalConfigStore" { "friends" {
                "42" { "avatar" "abc" }
                "42" { "Name" "Own" }
            } }"#,
        );
        assert_eq!(resolve_display_name(&f, "42"), "Own");
        assert_eq!(resolve_avatar_id(&f, "42").as_deref(), Some("abc"));
    }

    #[test]
    fn test_avatar_id() {
        let f = friends(
            r#""UserLocalConfigStore" { "friends" { "42" { "avatar" "abc" } "7" { "avatar" "" } } }"#,
        );
        assert_eq!(resolve_avatar_id(&f, "42").as_deref(), Some("abc"));
        assert_eq!(resolve_avatar_id(&f, "7"), None);
        assert_eq!(resolve_avatar_id(&f, "99"), None);
    }

    #[test]
    fn test_read_profile_missing_file() {
        let profile = read_profile(Utf8Path::new("/definitely/not/here.vdf"), "42");
        assert_eq!(profile, AccountProfile::fallback("42"));
    }

    #[test]
    fn test_read_profile_parse_error_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "\"UserLocalConfigStore\" {{ \"friends\" {{").unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();

        assert!(matches!(
            try_read_profile(path, "42"),
            Err(SaveFileError::Parse { .. })
        ));
        assert_eq!(read_profile(path, "42"), AccountProfile::fallback("42"));
    }

    #[test]
    fn test_missing_section() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "\"SomethingElse\" {{ }}").unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();

        assert!(matches!(
            validate_save_file(path),
            Err(SaveFileError::MissingSection { section: STORE_SECTION, .. })
        ));
    }

    #[test]
    fn test_read_profile_success() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "\"UserLocalConfigStore\"\n{{\n\"friends\"\n{{\n\"42\"\n{{\n\"Name\" \"Carl\"\n\"avatar\" \"fe01\"\n}}\n}}\n}}\n"
        )
        .unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();

        let profile = read_profile(path, "42");
        assert_eq!(profile.display_name, "Carl");
        assert_eq!(profile.avatar_id.as_deref(), Some("fe01"));
    }
}
