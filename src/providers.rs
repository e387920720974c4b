//! Presentation sinks fed by the reference index: underline decorations,
//! clickable links, go-to-definition targets, and hover text.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::config::Settings;
use crate::docs::DocumentationSource;
use crate::types::{ColumnSpan, IndexedReference, ReferenceKind, Resolution, ResolvedFileReference, TaskDocumentationRef};

/// Hover text for a task when fetching is off.
const INTERNET_FETCH_DISABLED: &str = "`InternetFetch` feature is disabled. \
Enable it to fetch task documentation\n\n`pipenav toggle InternetFetch`";

/// Appended to a file miss when rules were not applied.
const REPLACE_STRINGS_DISABLED: &str = " `ReplaceStrings` feature is disabled. \
Enable it to replace strings in file path\n\n`pipenav toggle ReplaceStrings`";

/// An underlined range on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    /// Reference kind, for styling.
    pub kind: ReferenceKind,
    /// Zero-based line.
    pub line: usize,
    /// Columns to underline.
    pub span: ColumnSpan,
}

/// A clickable range with an external target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    /// Zero-based line.
    pub line: usize,
    /// Clickable columns.
    pub span: ColumnSpan,
    /// URL opened on click.
    pub target: String,
}

/// Where go-to-definition leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DefinitionTarget {
    /// A task's documentation page.
    External {
        /// Documentation URL.
        url: String,
    },
    /// A position in a file on disk.
    Location {
        /// Zero-based column.
        column: usize,
        /// Zero-based line.
        line: usize,
        /// Absolute file path.
        path: PathBuf,
    },
}

/// Markdown hover text anchored to a reference span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverResult {
    /// Markdown body.
    pub contents: String,
    /// Zero-based line.
    pub line: usize,
    /// Hovered columns.
    pub span: ColumnSpan,
}

/// Every indexed reference gets an underline.
pub fn decorations(index: &[IndexedReference]) -> Vec<Decoration> {
    return index
        .iter()
        .map(|entry| return Decoration {
            kind: entry.reference.kind,
            line: entry.reference.line_number,
            span: entry.reference.span,
        })
        .collect();
}

/// Only versioned tasks link out; files are reached through go-to-definition.
pub fn document_links(index: &[IndexedReference]) -> Vec<DocumentLink> {
    return index
        .iter()
        .filter_map(|entry| {
            let Resolution::Task(task) = &entry.resolution else {
                return None;
            };
            return Some(DocumentLink {
                line: entry.reference.line_number,
                span: entry.reference.span,
                target: task.documentation_url.clone()?,
            });
        })
        .collect();
}

/// Go-to-definition target for one reference. Files open at their start,
/// even when missing, so the user sees which path was tried.
pub fn definition(entry: &IndexedReference) -> Option<DefinitionTarget> {
    return match &entry.resolution {
        Resolution::File(file) => Some(DefinitionTarget::Location {
            column: 0,
            line: 0,
            path: file.resolved_path.clone()?,
        }),
        Resolution::Task(task) => task
            .documentation_url
            .clone()
            .map(|url| return DefinitionTarget::External { url }),
    };
}

/// Hover text for one reference. Tasks without a version have none.
/// `source` is consulted only for tasks, and only when internet fetch is on.
pub fn hover(entry: &IndexedReference, settings: &Settings, source: &dyn DocumentationSource) -> Option<HoverResult> {
    let contents = match &entry.resolution {
        Resolution::File(file) => file_hover(file, settings)?,
        Resolution::Task(task) => task_hover(task, settings, source)?,
    };
    return Some(HoverResult {
        contents,
        line: entry.reference.line_number,
        span: entry.reference.span,
    });
}

/// Keyword subset of a found template, or a not-found notice.
fn file_hover(file: &ResolvedFileReference, settings: &Settings) -> Option<String> {
    let path = file.resolved_path.as_deref()?;
    let mut text = format!("[{}]({})", path.display(), file_uri(path));

    if file.found {
        match hover_keyword_yaml(path, &settings.hover_keywords) {
            Some(yaml) => text.push_str(&format!("\n```yaml\n{yaml}\n```")),
            None => text.push_str("\n\nparameters not found"),
        }
        return Some(text);
    }

    text.push_str("\n\nFile not found.");
    if !settings.feature_toggles.replace_strings {
        text.push_str(REPLACE_STRINGS_DISABLED);
    }
    return Some(text);
}

/// Fetched syntax block, or why there is none.
fn task_hover(task: &TaskDocumentationRef, settings: &Settings, source: &dyn DocumentationSource) -> Option<String> {
    let url = task.documentation_url.as_deref()?;
    if !settings.feature_toggles.internet_fetch {
        return Some(INTERNET_FETCH_DISABLED.to_owned());
    }

    return Some(match source.fetch_syntax(url) {
        Ok(usage) => format!("**Task Documentation:** [Learn more]({url})\n\n```yaml\n{usage}\n```"),
        Err(e) => {
            tracing::warn!(url, error = %e, "task documentation fetch failed");
            format!("Error fetching task documentation: {e}")
        },
    });
}

/// Re-serialize the hover keywords that have content, in keyword order.
/// `None` when the file can't be read or parsed, or no keyword has content.
fn hover_keyword_yaml(path: &Path, keywords: &[String]) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let Value::Mapping(top) = serde_yaml::from_str::<Value>(&content).ok()? else {
        return None;
    };

    let mut shown = Mapping::new();
    for keyword in keywords {
        let Some(value) = top.get(keyword.as_str()) else {
            continue;
        };
        if has_content(value) {
            shown.insert(Value::String(keyword.clone()), value.clone());
        }
    }

    if shown.is_empty() {
        return None;
    }
    let yaml = serde_yaml::to_string(&Value::Mapping(shown)).ok()?;
    return Some(yaml.trim_end().to_owned());
}

/// Mappings, sequences and strings count when non-empty; scalars never do.
fn has_content(value: &Value) -> bool {
    return match value {
        Value::Mapping(m) => !m.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Tagged(tagged) => has_content(&tagged.value),
        Value::Bool(_) | Value::Null | Value::Number(_) => false,
    };
}

/// `file://` URI for a path, falling back to its display form.
fn file_uri(path: &Path) -> String {
    return url::Url::from_file_path(path).map_or_else(|()| return path.display().to_string(), |u| return u.to_string());
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
    use std::cell::Cell;

    use super::*;
    use crate::error::Error;
    use crate::types::RawReference;

    /// Counts calls and answers with a canned result.
    struct FakeSource {
        calls: Cell<usize>,
        fail: bool,
    }

    impl FakeSource {
        fn new(fail: bool) -> Self {
            return Self { calls: Cell::new(0), fail };
        }
    }

    impl DocumentationSource for FakeSource {
        fn fetch_syntax(&self, url: &str) -> Result<String, Error> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(Error::Fetch { reason: "HTTP 503 Service Unavailable".to_owned(), url: url.to_owned() });
            }
            return Ok("- task: Bash@3\n  inputs:\n    targetType: 'inline'".to_owned());
        }
    }

    fn entry(kind: ReferenceKind, raw_target: &str, resolution: Resolution) -> IndexedReference {
        return IndexedReference {
            reference: RawReference {
                kind,
                line_number: 4,
                raw_target: raw_target.to_owned(),
                span: ColumnSpan { start: 10, end: 20 },
            },
            resolution,
        };
    }

    fn task_entry(raw_target: &str) -> IndexedReference {
        return entry(ReferenceKind::Task, raw_target, Resolution::Task(crate::task::resolve_task(raw_target)));
    }

    fn file_entry(path: &Path, found: bool) -> IndexedReference {
        let resolved = ResolvedFileReference {
            found,
            raw_target: "t.yml".to_owned(),
            resolved_path: Some(path.to_path_buf()),
        };
        return entry(ReferenceKind::Template, "t.yml", Resolution::File(resolved));
    }

    #[test]
    fn disabled_fetch_shows_notice_without_network() {
        let source = FakeSource::new(false);
        let result = hover(&task_entry("Bash@3"), &Settings::default(), &source).unwrap();
        assert!(result.contents.contains("`InternetFetch` feature is disabled"), "{}", result.contents);
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn enabled_fetch_renders_usage() {
        let source = FakeSource::new(false);
        let mut settings = Settings::default();
        settings.feature_toggles.internet_fetch = true;

        let result = hover(&task_entry("Bash@3"), &settings, &source).unwrap();
        assert!(result.contents.starts_with("**Task Documentation:** [Learn more](https://learn.microsoft.com/"));
        assert!(result.contents.contains("```yaml\n- task: Bash@3"));
        assert_eq!(source.calls.get(), 1);
        assert_eq!(result.line, 4);
    }

    #[test]
    fn fetch_failure_is_inline_text() {
        let source = FakeSource::new(true);
        let mut settings = Settings::default();
        settings.feature_toggles.internet_fetch = true;

        let result = hover(&task_entry("Bash@3"), &settings, &source).unwrap();
        assert!(result.contents.starts_with("Error fetching task documentation: fetch failed"), "{}", result.contents);
    }

    #[test]
    fn unversioned_task_has_no_hover_or_link() {
        let source = FakeSource::new(false);
        let unversioned = task_entry("customStep");
        assert!(hover(&unversioned, &Settings::default(), &source).is_none());
        assert!(definition(&unversioned).is_none());
        assert!(document_links(&[unversioned]).is_empty());
    }

    #[test]
    fn found_file_shows_requested_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        std::fs::write(&path, "parameters:\n  - name: env\n    default: dev\nsteps:\n  - script: echo\njobs: []\nvariables:\n  a: b\n").unwrap();

        let result = hover(&file_entry(&path, true), &Settings::default(), &FakeSource::new(false)).unwrap();
        assert!(result.contents.starts_with(&format!("[{}](file://", path.display())), "{}", result.contents);
        assert!(result.contents.contains("```yaml\nparameters:"), "{}", result.contents);
        assert!(result.contents.contains("steps:"));
        assert!(!result.contents.contains("jobs"));
        assert!(!result.contents.contains("variables"));
        let parameters_at = result.contents.find("parameters:").unwrap();
        let steps_at = result.contents.find("steps:").unwrap();
        assert!(parameters_at < steps_at);
    }

    #[test]
    fn unparsable_file_reports_parameters_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        std::fs::write(&path, "parameters: [unclosed\n").unwrap();

        let result = hover(&file_entry(&path, true), &Settings::default(), &FakeSource::new(false)).unwrap();
        assert!(result.contents.ends_with("\n\nparameters not found"), "{}", result.contents);
    }

    #[test]
    fn file_without_keywords_reports_parameters_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        std::fs::write(&path, "variables:\n  a: b\n").unwrap();

        let result = hover(&file_entry(&path, true), &Settings::default(), &FakeSource::new(false)).unwrap();
        assert!(result.contents.ends_with("parameters not found"));
    }

    #[test]
    fn missing_file_mentions_replace_toggle_only_when_off() {
        let path = Path::new("/nonexistent/t.yml");
        let mut settings = Settings::default();

        let on = hover(&file_entry(path, false), &settings, &FakeSource::new(false)).unwrap();
        assert!(on.contents.ends_with("\n\nFile not found."), "{}", on.contents);

        settings.feature_toggles.replace_strings = false;
        let off = hover(&file_entry(path, false), &settings, &FakeSource::new(false)).unwrap();
        assert!(off.contents.contains("File not found. `ReplaceStrings` feature is disabled"), "{}", off.contents);
    }

    #[test]
    fn definition_targets() {
        let path = Path::new("/nonexistent/t.yml");
        assert_eq!(
            definition(&file_entry(path, false)),
            Some(DefinitionTarget::Location { column: 0, line: 0, path: path.to_path_buf() })
        );

        let Some(DefinitionTarget::External { url }) = definition(&task_entry("AzureFileCopy@4")) else {
            panic!("expected external target");
        };
        assert!(url.ends_with("azure-file-copy-v4?view=azure-devops"));
    }

    #[test]
    fn every_reference_decorated_only_tasks_linked() {
        let path = Path::new("/nonexistent/t.yml");
        let index = [file_entry(path, false), task_entry("Bash@3")];
        assert_eq!(decorations(&index).len(), 2);

        let links = document_links(&index);
        assert_eq!(links.len(), 1);
        assert!(links[0].target.ends_with("bash-v3?view=azure-devops"));
        assert_eq!(links[0].span, ColumnSpan { start: 10, end: 20 });
    }
}
