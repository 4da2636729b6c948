//! Property tests for display-name resolution
//!
//! These tests verify, over generated save files:
//! - The store-wide PersonaName always wins
//! - The first NameHistory entry is used, in either representation
//! - Entries with no name fields fall back to "User {id}"

use camino::Utf8Path;
use configbridge::services::keyvalues;
use configbridge::services::save_file::{friends_section, resolve_display_name};
use proptest::prelude::*;

fn account_id() -> impl Strategy<Value = String> {
    "[1-9][0-9]{0,9}"
}

fn name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_][A-Za-z0-9_ ]{0,15}"
}

fn resolve(doc: &str, id: &str) -> String {
    let root = keyvalues::parse(doc).unwrap();
    let friends = friends_section(&root, Utf8Path::new("generated.vdf")).unwrap();
    resolve_display_name(friends, id)
}

fn history_as_mapping(names: &[String]) -> String {
    let body: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, n)| format!("\"{}\" \"{}\"", i, n))
        .collect();
    format!("\"NameHistory\" {{ {} }}", body.join(" "))
}

fn history_as_sequence(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"NameHistory\" \"{}\"", n))
        .collect::<Vec<_>>()
        .join("\n")
}

fn document(id: &str, persona: Option<&str>, entry: &str) -> String {
    let persona = persona
        .map(|p| format!("\"PersonaName\" \"{}\"", p))
        .unwrap_or_default();
    format!(
        "\"UserLocalConfigStore\"\n{{\n\"friends\"\n{{\n{}\n\"{}\"\n{{\n{}\n}}\n}}\n}}\n",
        persona, id, entry
    )
}

proptest! {
    #[test]
    fn test_override_wins(
        id in account_id(),
        persona in name(),
        own in proptest::option::of(name()),
        history in proptest::collection::vec(name(), 0..4),
    ) {
        let mut entry = own.map(|n| format!("\"Name\" \"{}\"", n)).unwrap_or_default();
        if !history.is_empty() {
            entry.push('\n');
            entry.push_str(&history_as_mapping(&history));
        }

        prop_assert_eq!(resolve(&document(&id, Some(&persona), &entry), &id), persona);
    }

    #[test]
    fn test_history_first_entry(
        id in account_id(),
        history in proptest::collection::vec(name(), 1..5),
        as_mapping in any::<bool>(),
    ) {
        let entry = if as_mapping {
            history_as_mapping(&history)
        } else {
            history_as_sequence(&history)
        };

        prop_assert_eq!(resolve(&document(&id, None, &entry), &id), history[0].clone());
    }

    #[test]
    fn test_fallback_without_names(
        id in account_id(),
        avatar in proptest::option::of("[0-9a-f]{40}"),
    ) {
        let entry = avatar.map(|a| format!("\"avatar\" \"{}\"", a)).unwrap_or_default();

        prop_assert_eq!(
            resolve(&document(&id, None, &entry), &id),
            format!("User {}", id)
        );
    }
}
