//! Per-line recognition of `file:`, `template:` and `task:` references.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{ColumnSpan, RawReference, ReferenceKind};

/// Marker prefix, keyword, separator, then the target up to a `#` comment
/// or line end. The prefix must end in a space right before the keyword.
#[allow(clippy::expect_used, reason = "pattern is a literal")]
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"([-# ]{1,}[ ]{1,}(template|file|task)[ ]{0,}[: ]{1,})([^#\r\n]+)")
        .expect("valid regex");
});

/// Match one line against the reference pattern.
///
/// The pattern is evaluated once, so a line yields at most one reference.
/// Returns `None` when nothing matches or the target is blank.
pub fn match_line(line: &str, line_number: usize) -> Option<RawReference> {
    let cap = REFERENCE_PATTERN.captures(line)?;
    let kind = ReferenceKind::from_keyword(cap.get(2)?.as_str())?;
    let target = cap.get(3)?;

    let raw_target = target.as_str().trim();
    if raw_target.is_empty() {
        return None;
    }

    let leading = target.as_str().len().saturating_sub(target.as_str().trim_start().len());
    let start_byte = target.start().saturating_add(leading);
    let end_byte = start_byte.saturating_add(raw_target.len());

    return Some(RawReference {
        kind,
        line_number,
        raw_target: raw_target.to_owned(),
        span: ColumnSpan {
            start: byte_to_column(line, start_byte),
            end: byte_to_column(line, end_byte),
        },
    });
}

/// Convert a byte offset on a line to a character column.
fn byte_to_column(line: &str, byte: usize) -> usize {
    return line.get(..byte).map_or(0, |prefix| return prefix.chars().count());
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
    fn template_with_version_suffix() {
        let line = "  - template: steps/build.yml@refs/heads/main";
        let reference = match_line(line, 3).unwrap();
        assert_eq!(reference.kind, ReferenceKind::Template);
        assert_eq!(reference.raw_target, "steps/build.yml@refs/heads/main");
        assert_eq!(reference.line_number, 3);
        assert_eq!(reference.span, ColumnSpan { start: 14, end: 45 });
    }

    #[test]
    fn task_and_file_keywords() {
        let task = match_line("  - task: AzureFileCopy@4", 0).unwrap();
        assert_eq!(task.kind, ReferenceKind::Task);
        assert_eq!(task.raw_target, "AzureFileCopy@4");

        let file = match_line("    file: scripts/run.sh", 0).unwrap();
        assert_eq!(file.kind, ReferenceKind::File);
        assert_eq!(file.raw_target, "scripts/run.sh");
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert!(match_line("  - File: a.yml", 0).is_none());
        assert!(match_line("  - TEMPLATE: a.yml", 0).is_none());
        assert!(match_line("  - Task: Bash@3", 0).is_none());
    }

    #[test]
    fn trailing_comment_is_excluded() {
        let reference = match_line("- template: a/b.yml   # shared steps", 0).unwrap();
        assert_eq!(reference.raw_target, "a/b.yml");
        assert_eq!(reference.span, ColumnSpan { start: 12, end: 19 });
    }

    #[test]
    fn requires_space_before_keyword() {
        assert!(match_line("template: a.yml", 0).is_none());
        assert!(match_line("  -template: a.yml", 0).is_none());
        assert!(match_line("  mytemplate: a.yml", 0).is_none());
    }

    #[test]
    fn plural_keys_do_not_match() {
        assert!(match_line("  files: a.yml", 0).is_none());
        assert!(match_line("  tasks: []", 0).is_none());
    }

    #[test]
    fn blank_target_is_no_match() {
        assert!(match_line("  - template:    ", 0).is_none());
        assert!(match_line("  - template: # nothing", 0).is_none());
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        let reference = match_line("# é - file: ü.yml", 0).unwrap();
        assert_eq!(reference.raw_target, "ü.yml");
        assert_eq!(reference.span, ColumnSpan { start: 12, end: 17 });
    }

    #[test]
    fn only_first_reference_on_a_line() {
        let reference = match_line("  - template: a.yml - template: b.yml", 0).unwrap();
        assert_eq!(reference.raw_target, "a.yml - template: b.yml");
    }
}
