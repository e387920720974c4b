//! `pipenav info`: a reference page followed by the effective settings.

use serde::Serialize;

use crate::commands::Context;
use crate::config::{Feature, Settings};
use crate::error::Error;
use crate::types::ReplacementRule;

/// Output the pipenav reference page with the effective settings.
///
/// # Errors
///
/// Returns settings errors when the settings file is malformed.
pub fn run(ctx: &Context, json: bool) -> Result<(), Error> {
    let state = gather_state(ctx)?;

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
    return Ok(());
}

// ── State gathering ───────────────────────────────────────────────────

/// Effective configuration seen by this invocation.
struct CurrentState {
    /// Workspace roots as displayed.
    roots: Vec<String>,
    /// Loaded settings, defaults when the file is absent.
    settings: Settings,
    /// Whether the settings file exists.
    settings_found: bool,
    /// Settings file location as displayed.
    settings_path: String,
}

/// Load settings and collect the roots for display.
///
/// # Errors
///
/// Returns settings errors when the settings file is malformed.
fn gather_state(ctx: &Context) -> Result<CurrentState, Error> {
    return Ok(CurrentState {
        roots: ctx.roots.iter().map(|r| return r.display().to_string()).collect(),
        settings: Settings::load(&ctx.settings_path)?,
        settings_found: ctx.settings_path.exists(),
        settings_path: ctx.settings_path.display().to_string(),
    });
}

// ── Markdown output ───────────────────────────────────────────────────

/// Print the reference page and current state as markdown.
fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

/// Static part of the reference page.
fn print_markdown_header(version: &str) {
    print!(
        "\
# pipenav {version}

Navigate `file:`, `template:` and `task:` references in Azure Pipelines
YAML: resolve template paths across sibling repositories and link tasks
to their documentation.

## Reference Syntax

    - template: steps/build.yml@templates     template in a sibling checkout
    - template: ./local.yml                   relative to the document
    # file: scripts/deploy.sh                 file mention in a comment
    - task: AzureFileCopy@4                   task documentation link

## Commands

    pipenav scan <file> [--json]              List every reference and its resolution
    pipenav links <file> [--json]             Underline ranges and link targets
    pipenav definition <file> <line>          Where go-to-definition leads
    pipenav hover <file> <line>               Hover markdown for a line
    pipenav toggle <feature>                  Flip InternetFetch or ReplaceStrings
    pipenav replace <find> <replace> [--slot N]
                                              Set a path replacement rule
    pipenav watch <file>                      Reprint links on every change

## Path Lookup Order

1. `./` targets: next to the document
2. workspace root of the document
3. each direct subdirectory of that root, by name

## Settings (.pipenav.toml)

    [ado-pipeline-navigator]
    keywordsToDisplayOnHover = [\"parameters\", \"stages\", \"jobs\", \"steps\"]
    quickReplaceStringsCount = 1

    [ado-pipeline-navigator.featureToggles]
    InternetFetch = false
    ReplaceStrings = true

    [[ado-pipeline-navigator.replacementStrings]]
    find = \"templates-repo/\"
    replace = \"\"

## Current State

"
    );
}

/// Settings path, roots, features, hover keys and rules.
fn print_markdown_state(state: &CurrentState) {
    let found = if state.settings_found { "found" } else { "not found, using defaults" };
    println!("Settings:   {} ({found})", state.settings_path);
    println!("Roots:      {}", state.roots.join(", "));

    let toggles = Feature::ALL
        .iter()
        .map(|f| {
            let on = if f.is_enabled(state.settings.feature_toggles) { "on" } else { "off" };
            return format!("{}={on}", f.key());
        })
        .collect::<Vec<_>>()
        .join(", ");
    println!("Features:   {toggles}");
    println!("Hover keys: {}", state.settings.hover_keywords.join(", "));

    let rules = state
        .settings
        .replacement_rules
        .iter()
        .filter(|r| return !r.find.is_empty())
        .map(|r| return format!("`{}` -> `{}`", r.find, r.replace))
        .collect::<Vec<_>>();
    if rules.is_empty() {
        println!("Rules:      (none)");
    } else {
        println!("Rules:      {}", rules.join(", "));
    }
}

/// Exit code table.
fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success |
| 1    | Nothing at the requested line |
| 3    | Runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

/// Top-level `info --json` document.
#[derive(Serialize)]
struct InfoJson {
    /// Effective settings.
    current_state: StateJson,
    /// Process exit codes and their meaning.
    exit_codes: Vec<ExitCodeInfo>,
    /// Document extensions the scanner accepts.
    supported_extensions: Vec<&'static str>,
    /// Crate version.
    version: &'static str,
}

/// One exit code row.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// Process exit status.
    code: u8,
    /// When it is returned.
    meaning: &'static str,
}

/// JSON form of [`CurrentState`].
#[derive(Serialize)]
struct StateJson {
    /// Every feature with its state.
    feature_toggles: Vec<FeatureJson>,
    /// Top-level keys shown in template hovers.
    hover_keywords: Vec<String>,
    /// Configured number of editable rule slots.
    quick_replace_count: usize,
    /// Rules in application order.
    replacement_rules: Vec<ReplacementRule>,
    /// Workspace roots.
    roots: Vec<String>,
    /// Whether the settings file exists.
    settings_found: bool,
    /// Settings file location.
    settings_path: String,
}

/// A feature toggle and its state.
#[derive(Serialize)]
struct FeatureJson {
    /// Current value.
    enabled: bool,
    /// Settings key, e.g. `InternetFetch`.
    name: &'static str,
}

/// Print the JSON form of the reference page.
fn print_json(state: &CurrentState) {
    let settings = &state.settings;
    let info = InfoJson {
        current_state: StateJson {
            feature_toggles: Feature::ALL
                .iter()
                .map(|f| return FeatureJson {
                    enabled: f.is_enabled(settings.feature_toggles),
                    name: f.key(),
                })
                .collect(),
            hover_keywords: settings.hover_keywords.clone(),
            quick_replace_count: settings.quick_replace_count,
            replacement_rules: settings.replacement_rules.clone(),
            roots: state.roots.clone(),
            settings_found: state.settings_found,
            settings_path: state.settings_path.clone(),
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Success" },
            ExitCodeInfo { code: 1, meaning: "Nothing at the requested line" },
            ExitCodeInfo { code: 3, meaning: "Runtime error" },
        ],
        supported_extensions: vec![".yml", ".yaml", ".md", ".markdown", ".txt"],
        version: env!("CARGO_PKG_VERSION"),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
