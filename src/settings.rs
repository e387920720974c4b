//! Explicit settings updates: feature toggles and replacement rules.
//! Edits are format-preserving so hand-written comments survive.

use std::path::Path;

use crate::config::{Feature, NAMESPACE, Settings};
use crate::error::Error;
use crate::types::ReplacementRule;

/// Flip a feature toggle and persist it. Returns the new state.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the settings file can't be parsed,
/// `Error::TomlDe` if it has invalid values, or `Error::Io` if writing fails.
pub fn toggle_feature(path: &Path, feature: Feature) -> Result<bool, Error> {
    let (content, mut doc) = read_settings_doc(path)?;
    let current = Settings::parse(&content)?;
    let enabled = !feature.is_enabled(current.feature_toggles);

    ensure_table(&mut doc, "featureToggles");
    doc[NAMESPACE]["featureToggles"][feature.key()] = toml_edit::value(enabled);

    std::fs::write(path, doc.to_string())?;
    tracing::info!(feature = feature.key(), enabled, "feature toggled");
    return Ok(enabled);
}

/// Overwrite one replacement rule slot and persist the whole rule list.
///
/// Only the first `quickReplaceStringsCount` slots are editable, capped by
/// the number of existing rules (an empty list still exposes slot 0).
/// A list migrated from the legacy namespace is written to the current one.
///
/// # Errors
///
/// Returns `Error::ReplacementSlotOutOfRange` for a slot outside the window,
/// `Error::ParseFailed`/`Error::TomlDe` for an unreadable settings file,
/// or `Error::Io` if writing fails.
pub fn set_replacement_rule(path: &Path, slot: usize, rule: ReplacementRule) -> Result<(), Error> {
    let (content, mut doc) = read_settings_doc(path)?;
    let settings = Settings::parse(&content)?;

    let editable = settings.quick_replace_count.min(settings.replacement_rules.len().max(1));
    if slot >= editable {
        return Err(Error::ReplacementSlotOutOfRange { max: editable, slot });
    }

    let mut rules = settings.replacement_rules;

    match rules.get_mut(slot) {
        Some(existing) => *existing = rule,
        None => rules.push(rule),
    }

    ensure_namespace(&mut doc);
    doc[NAMESPACE]["replacementStrings"] = toml_edit::Item::ArrayOfTables(rules_to_tables(&rules));

    std::fs::write(path, doc.to_string())?;
    if let Some(written) = rules.get(slot) {
        tracing::info!(slot, find = %written.find, replace = %written.replace, "replacement rule updated");
    }
    return Ok(());
}

/// Parse the settings file into a format-preserving document.
/// Returns an empty document if the file doesn't exist.
///
/// # Errors
///
/// Returns `Error::Io` on read failure or `Error::ParseFailed` on parse failure.
fn read_settings_doc(path: &Path) -> Result<(String, toml_edit::DocumentMut), Error> {
    let content = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return Error::ParseFailed {
            file: path.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    return Ok((content, doc));
}

/// Create the `[ado-pipeline-navigator]` table if it doesn't exist.
fn ensure_namespace(doc: &mut toml_edit::DocumentMut) {
    if !doc.contains_key(NAMESPACE) {
        doc[NAMESPACE] = toml_edit::Item::Table(toml_edit::Table::new());
    }
}

/// Create `[ado-pipeline-navigator.<name>]` if it doesn't exist.
fn ensure_table(doc: &mut toml_edit::DocumentMut, name: &str) {
    ensure_namespace(doc);
    let has_table = doc[NAMESPACE].as_table_like().is_some_and(|t| return t.contains_key(name));
    if !has_table {
        doc[NAMESPACE][name] = toml_edit::Item::Table(toml_edit::Table::new());
    }
}

/// Rules as `[[replacementStrings]]` tables.
fn rules_to_tables(rules: &[ReplacementRule]) -> toml_edit::ArrayOfTables {
    let mut tables = toml_edit::ArrayOfTables::new();
    for rule in rules {
        let mut table = toml_edit::Table::new();
        table["find"] = toml_edit::value(rule.find.as_str());
        table["replace"] = toml_edit::value(rule.replace.as_str());
        tables.push(table);
    }
    return tables;
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    reason = "tests"
)]
mod tests {
    use super::*;

    fn rule(find: &str, replace: &str) -> ReplacementRule {
        return ReplacementRule { find: find.to_owned(), replace: replace.to_owned() };
    }

    #[test]
    fn toggle_flips_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pipenav.toml");

        assert!(toggle_feature(&path, Feature::InternetFetch).unwrap());
        assert!(Settings::load(&path).unwrap().feature_toggles.internet_fetch);

        assert!(!toggle_feature(&path, Feature::InternetFetch).unwrap());
        assert!(!Settings::load(&path).unwrap().feature_toggles.internet_fetch);

        assert!(!toggle_feature(&path, Feature::ReplaceStrings).unwrap());
        assert!(!Settings::load(&path).unwrap().feature_toggles.replace_strings);
    }

    #[test]
    fn toggle_preserves_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pipenav.toml");
        std::fs::write(&path, "# team settings\n[ado-pipeline-navigator]\nquickReplaceStringsCount = 2\n").unwrap();

        toggle_feature(&path, Feature::ReplaceStrings).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# team settings"), "{written}");
        assert_eq!(Settings::load(&path).unwrap().quick_replace_count, 2);
    }

    #[test]
    fn set_rule_fills_placeholder_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pipenav.toml");

        set_replacement_rule(&path, 0, rule("repo/", "")).unwrap();
        assert_eq!(Settings::load(&path).unwrap().replacement_rules, [rule("repo/", "")]);
    }

    #[test]
    fn slot_outside_quick_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pipenav.toml");

        let result = set_replacement_rule(&path, 1, rule("a", "b"));
        assert!(matches!(result, Err(Error::ReplacementSlotOutOfRange { max: 1, slot: 1 })));
    }

    #[test]
    fn second_slot_editable_with_larger_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pipenav.toml");
        std::fs::write(
            &path,
            "[ado-pipeline-navigator]\nquickReplaceStringsCount = 2\n\n\
             [[ado-pipeline-navigator.replacementStrings]]\nfind = \"a\"\nreplace = \"b\"\n\n\
             [[ado-pipeline-navigator.replacementStrings]]\nfind = \"c\"\nreplace = \"d\"\n",
        )
        .unwrap();

        set_replacement_rule(&path, 1, rule("x", "y")).unwrap();
        let rules = Settings::load(&path).unwrap().replacement_rules;
        assert_eq!(rules, [rule("a", "b"), rule("x", "y")]);
    }

    #[test]
    fn legacy_rules_migrate_on_first_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pipenav.toml");
        std::fs::write(&path, "[adopipeline]\npathReplacements = [{ find = \"old\", replace = \"new\" }]\n").unwrap();

        set_replacement_rule(&path, 0, rule("older", "newer")).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[[ado-pipeline-navigator.replacementStrings]]"), "{written}");
        assert_eq!(Settings::load(&path).unwrap().replacement_rules, [rule("older", "newer")]);
    }

    #[test]
    fn unwritable_settings_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir/.pipenav.toml");

        let result = set_replacement_rule(&path, 0, rule("a", "b"));
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!path.exists());
    }
}
