use std::path::Path;

use crate::error::Error;
use crate::types::{FeatureToggles, ReplacementRule};

/// Settings file looked up in the first workspace root.
pub const SETTINGS_FILE: &str = ".pipenav.toml";

/// Table holding the current settings.
pub const NAMESPACE: &str = "ado-pipeline-navigator";

/// Table holding pre-rename settings, read only for migration.
pub const LEGACY_NAMESPACE: &str = "adopipeline";

/// Hover shows these top-level keys of a resolved template when unset.
const DEFAULT_HOVER_KEYWORDS: [&str; 4] = ["parameters", "stages", "jobs", "steps"];

/// A named feature toggle as it appears in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Network fetch of task documentation on hover.
    InternetFetch,
    /// Replacement rules applied to paths before lookup.
    ReplaceStrings,
}

impl Feature {
    /// Every feature, in display order.
    pub const ALL: [Self; 2] = [Self::InternetFetch, Self::ReplaceStrings];

    /// Key under `featureToggles`.
    pub const fn key(self) -> &'static str {
        return match self {
            Self::InternetFetch => "InternetFetch",
            Self::ReplaceStrings => "ReplaceStrings",
        };
    }

    /// Look up a feature by key, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFeature` when no feature has this key.
    pub fn parse(name: &str) -> Result<Self, Error> {
        return Self::ALL
            .into_iter()
            .find(|f| return f.key().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownFeature { name: name.to_owned() });
    }

    /// Current state of this feature in a toggle set.
    pub const fn is_enabled(self, toggles: FeatureToggles) -> bool {
        return match self {
            Self::InternetFetch => toggles.internet_fetch,
            Self::ReplaceStrings => toggles.replace_strings,
        };
    }
}

/// Effective settings with every default filled in. Loaded once per
/// command and passed by reference, so a concurrent edit of the settings
/// file never changes a resolution already in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Feature switches.
    pub feature_toggles: FeatureToggles,
    /// Top-level keys shown when hovering a resolved file.
    pub hover_keywords: Vec<String>,
    /// How many leading replacement rules the `replace` command may edit.
    pub quick_replace_count: usize,
    /// Ordered replacement rules.
    pub replacement_rules: Vec<ReplacementRule>,
}

/// Raw TOML structure for `.pipenav.toml`.
#[derive(Default, serde::Deserialize)]
struct SettingsFile {
    /// Current namespace.
    #[serde(default, rename = "ado-pipeline-navigator")]
    current: NavigatorTable,
    /// Legacy namespace, read for replacement rules only.
    #[serde(default, rename = "adopipeline")]
    legacy: LegacyTable,
}

/// `[ado-pipeline-navigator]`.
#[derive(Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigatorTable {
    /// `[ado-pipeline-navigator.featureToggles]`.
    feature_toggles: Option<FeatureToggleTable>,
    /// Top-level template keys shown on hover.
    keywords_to_display_on_hover: Option<Vec<String>>,
    /// Editable rule slots.
    quick_replace_strings_count: Option<usize>,
    /// Ordered replacement rules.
    replacement_strings: Option<Vec<ReplacementRule>>,
}

/// Feature switches; absent keys take their defaults.
#[derive(Default, serde::Deserialize)]
struct FeatureToggleTable {
    /// `InternetFetch`.
    #[serde(rename = "InternetFetch")]
    internet_fetch: Option<bool>,
    /// `ReplaceStrings`.
    #[serde(rename = "ReplaceStrings")]
    replace_strings: Option<bool>,
}

/// `[adopipeline]`.
#[derive(Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTable {
    /// Replacement rules under their old key.
    path_replacements: Option<Vec<ReplacementRule>>,
}

impl Default for Settings {
    fn default() -> Self {
        return Self::from_file(SettingsFile::default());
    }
}

impl Settings {
    /// Load settings from a TOML file.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a settings file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: SettingsFile = toml::from_str(content)?;
        return Ok(Self::from_file(raw));
    }

    /// The rules path resolution should apply: empty when replacement is off.
    pub fn active_replacements(&self) -> &[ReplacementRule] {
        if self.feature_toggles.replace_strings {
            return &self.replacement_rules;
        }
        return &[];
    }

    /// Fill every absent value with its default.
    fn from_file(raw: SettingsFile) -> Self {
        let toggles = raw.current.feature_toggles.unwrap_or_default();
        let defaults = FeatureToggles::default();

        if raw.current.replacement_strings.is_none() && raw.legacy.path_replacements.is_some() {
            tracing::warn!("reading replacement rules from legacy `[{LEGACY_NAMESPACE}] pathReplacements`");
        }

        return Self {
            feature_toggles: FeatureToggles {
                internet_fetch: toggles.internet_fetch.unwrap_or(defaults.internet_fetch),
                replace_strings: toggles.replace_strings.unwrap_or(defaults.replace_strings),
            },
            hover_keywords: raw.current.keywords_to_display_on_hover.unwrap_or_else(|| {
                return DEFAULT_HOVER_KEYWORDS.iter().map(|k| return (*k).to_owned()).collect();
            }),
            quick_replace_count: raw.current.quick_replace_strings_count.unwrap_or(1),
            replacement_rules: load_replacement_rules(
                raw.current.replacement_strings,
                raw.legacy.path_replacements,
            ),
        };
    }
}

/// Pick the replacement rules: the current list, else the legacy list,
/// else a single empty placeholder rule for the `replace` command to fill.
pub fn load_replacement_rules(
    current: Option<Vec<ReplacementRule>>,
    legacy: Option<Vec<ReplacementRule>>,
) -> Vec<ReplacementRule> {
    return current.or(legacy).unwrap_or_else(|| vec![ReplacementRule::default()]);
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
    fn defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(settings.feature_toggles.replace_strings);
        assert!(!settings.feature_toggles.internet_fetch);
        assert_eq!(settings.hover_keywords, ["parameters", "stages", "jobs", "steps"]);
        assert_eq!(settings.quick_replace_count, 1);
        assert_eq!(settings.replacement_rules, [ReplacementRule::default()]);
    }

    #[test]
    fn reads_namespaced_values() {
        let settings = Settings::parse(
            r#"
[ado-pipeline-navigator]
keywordsToDisplayOnHover = ["parameters"]
quickReplaceStringsCount = 3

[ado-pipeline-navigator.featureToggles]
InternetFetch = true

[[ado-pipeline-navigator.replacementStrings]]
find = "repo/"
replace = ""
"#,
        )
        .unwrap();
        assert!(settings.feature_toggles.internet_fetch);
        assert!(settings.feature_toggles.replace_strings);
        assert_eq!(settings.hover_keywords, ["parameters"]);
        assert_eq!(settings.quick_replace_count, 3);
        assert_eq!(settings.replacement_rules, [rule("repo/", "")]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let result = Settings::parse("[ado-pipeline-navigator\nbroken");
        assert!(matches!(result, Err(Error::TomlDe(_))));
    }

    #[test]
    fn legacy_rules_used_when_current_absent() {
        let settings = Settings::parse(
            r#"
[adopipeline]
pathReplacements = [{ find = "old", replace = "new" }]
"#,
        )
        .unwrap();
        assert_eq!(settings.replacement_rules, [rule("old", "new")]);
    }

    #[test]
    fn current_rules_shadow_legacy() {
        let rules = load_replacement_rules(Some(vec![rule("a", "b")]), Some(vec![rule("c", "d")]));
        assert_eq!(rules, [rule("a", "b")]);
        assert!(load_replacement_rules(Some(Vec::new()), Some(vec![rule("c", "d")])).is_empty());
    }

    #[test]
    fn disabled_replacement_has_no_active_rules() {
        let mut settings = Settings::default();
        settings.replacement_rules = vec![rule("a", "b")];
        assert_eq!(settings.active_replacements(), [rule("a", "b")]);
        settings.feature_toggles.replace_strings = false;
        assert!(settings.active_replacements().is_empty());
    }

    #[test]
    fn feature_names_parse_case_insensitively() {
        assert_eq!(Feature::parse("internetfetch").unwrap(), Feature::InternetFetch);
        assert_eq!(Feature::parse("ReplaceStrings").unwrap(), Feature::ReplaceStrings);
        assert!(matches!(Feature::parse("Telemetry"), Err(Error::UnknownFeature { .. })));
    }
}
