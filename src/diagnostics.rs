use crate::config::Feature;
use crate::error::Error;

/// ANSI bold on.
const BOLD: &str = "\x1b[1m";
/// ANSI attributes off.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened,
/// and how to fix it when there is a fix.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::DocumentNotFound { path } => format!("\
# Error: Document Not Found

`{}` does not exist.
", path.display()),

        Error::Fetch { url, reason } => format!("\
# Error: Fetch Failed

Could not fetch `{url}`: {reason}

## Fix

Check network access, or turn documentation fetch off:

    pipenav toggle InternetFetch
"),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),

        Error::LineOutOfRange { path, line, count } => format!("\
# Error: Line Out Of Range

`{}` has {count} lines; line {line} was requested.

Lines are numbered from 1.
", path.display()),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::ReplacementSlotOutOfRange { slot, max } => render_slot_out_of_range(*slot, *max),

        Error::SyntaxBlockMissing { url } => format!("\
# Error: No Syntax Section

`{url}` has no `#syntax` section with a code block.
"),

        Error::TomlDe(e) => format!("\
# Error: Invalid Settings

{e}
"),

        Error::UnknownFeature { name } => render_unknown_feature(name),

        Error::UnsupportedLanguage { ext } => format!("\
# Error: Unsupported Document

`.{ext}` files are not scanned for pipeline references.

## Supported extensions

- `.yml`, `.yaml` (YAML, Azure Pipelines)
- `.md`, `.markdown` (Markdown)
- `.txt` (plain text)
"),

        Error::WatchFailed { reason } => format!("\
# Error: Watch Failed

{reason}
"),
    };
}

/// Slot errors point at `quickReplaceStringsCount`.
fn render_slot_out_of_range(slot: usize, max: usize) -> String {
    return format!("\
# Error: Replacement Slot Out Of Range

Slot {slot} is not editable; slots 0..{max} are.

## Fix

Raise `quickReplaceStringsCount` in `.pipenav.toml`:

    [ado-pipeline-navigator]
    quickReplaceStringsCount = {}
", slot.saturating_add(1));
}

/// List the feature names that do exist.
fn render_unknown_feature(name: &str) -> String {
    let known = Feature::ALL
        .iter()
        .map(|f| return format!("- `{}`", f.key()))
        .collect::<Vec<_>>()
        .join("\n");

    return format!("\
# Error: Unknown Feature

No feature named `{name}`.

## Available features

{known}
");
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

    #[test]
    fn unknown_feature_lists_choices() {
        let md = render_error(&Error::UnknownFeature { name: "Telemetry".to_owned() });
        assert!(md.starts_with("# Error: Unknown Feature"));
        assert!(md.contains("- `InternetFetch`\n- `ReplaceStrings`"));
    }

    #[test]
    fn slot_error_suggests_count() {
        let md = render_error(&Error::ReplacementSlotOutOfRange { max: 1, slot: 2 });
        assert!(md.contains("quickReplaceStringsCount = 3"), "{md}");
    }
}
