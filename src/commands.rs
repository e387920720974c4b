//! CLI commands for pipenav: scan, links, definition, hover, toggle, replace.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::config::{Feature, Settings};
use crate::docs::HttpDocumentationSource;
use crate::document::{Document, Workspace};
use crate::error::Error;
use crate::language;
use crate::providers::{self, Decoration, DefinitionTarget, DocumentLink};
use crate::scanner;
use crate::settings;
use crate::types::{IndexedReference, ReplacementRule, Resolution};

/// Where a command finds its workspace and settings.
pub struct Context {
    /// Workspace roots, in command-line order.
    pub roots: Vec<PathBuf>,
    /// Settings file read (and, for updates, written).
    pub settings_path: PathBuf,
}

/// One document opened against the workspace with a settings snapshot.
pub struct Session {
    /// The scanned document.
    pub document: Document,
    /// Effective settings for this run.
    pub settings: Settings,
    /// Workspace roots.
    pub workspace: Workspace,
}

/// `links --json` output.
#[derive(Serialize)]
struct LinksJson {
    /// Underlined ranges.
    decorations: Vec<Decoration>,
    /// Clickable task links.
    links: Vec<DocumentLink>,
}

impl Context {
    /// Open `file` and load a settings snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedLanguage` for non-pipeline documents,
    /// `Error::DocumentNotFound` if `file` is missing, or settings errors.
    pub fn open(&self, file: &Path) -> Result<Session, Error> {
        let language = language::language_for_path(file)?;
        let document = Document::open(file)?;
        tracing::debug!(document = %document.path().display(), ?language, "opened document");
        let workspace = Workspace::new(&self.roots)?;
        let settings = Settings::load(&self.settings_path)?;
        return Ok(Session { document, settings, workspace });
    }
}

impl Session {
    /// Resolve the reference on a one-based line, if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::LineOutOfRange` if `line` is zero or past the end.
    fn reference_at(&self, line: usize) -> Result<Option<IndexedReference>, Error> {
        let count = self.document.line_count();
        if line == 0 || line > count {
            return Err(Error::LineOutOfRange {
                count,
                line,
                path: self.document.path().to_path_buf(),
            });
        }
        return Ok(scanner::reference_at_line(
            &self.document,
            &self.workspace,
            &self.settings,
            line.saturating_sub(1),
        ));
    }
}

/// Print the full reference index of a document.
///
/// # Errors
///
/// Returns errors from opening the document or loading settings.
pub fn scan(ctx: &Context, file: &Path, json: bool) -> Result<ExitCode, Error> {
    let session = ctx.open(file)?;
    let index = scanner::build_index(&session.document, &session.workspace, &session.settings);

    if json {
        print_json(&index);
        return Ok(ExitCode::SUCCESS);
    }

    for entry in &index {
        let reference = &entry.reference;
        println!(
            "{}:{}-{} {} {} -> {}",
            reference.line_number.saturating_add(1),
            reference.span.start,
            reference.span.end,
            reference.kind.keyword(),
            reference.raw_target,
            describe_resolution(&entry.resolution),
        );
    }

    let total = index.len();
    println!("{total} references");
    return Ok(ExitCode::SUCCESS);
}

/// Print decoration ranges and link targets.
///
/// # Errors
///
/// Returns errors from opening the document or loading settings.
pub fn links(ctx: &Context, file: &Path, json: bool) -> Result<ExitCode, Error> {
    let session = ctx.open(file)?;
    print_links(&session, json);
    return Ok(ExitCode::SUCCESS);
}

/// Print the go-to-definition target on a line: `path:1:1` or a URL.
///
/// # Errors
///
/// Returns `Error::LineOutOfRange` or errors from opening the document.
pub fn definition(ctx: &Context, file: &Path, line: usize) -> Result<ExitCode, Error> {
    let session = ctx.open(file)?;
    let Some(target) = session.reference_at(line)?.as_ref().and_then(providers::definition) else {
        eprintln!("no definition at line {line}");
        return Ok(ExitCode::from(1));
    };

    match target {
        DefinitionTarget::External { url } => println!("{url}"),
        DefinitionTarget::Location { column, line: target_line, path } => {
            println!(
                "{}:{}:{}",
                path.display(),
                target_line.saturating_add(1),
                column.saturating_add(1),
            );
        },
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print the hover markdown for a line.
///
/// # Errors
///
/// Returns `Error::LineOutOfRange` or errors from opening the document.
/// Fetch failures are part of the hover text, not errors.
pub fn hover(ctx: &Context, file: &Path, line: usize, json: bool) -> Result<ExitCode, Error> {
    let session = ctx.open(file)?;
    let Some(entry) = session.reference_at(line)? else {
        eprintln!("no reference at line {line}");
        return Ok(ExitCode::from(1));
    };

    let source = HttpDocumentationSource::default();
    let Some(result) = providers::hover(&entry, &session.settings, &source) else {
        eprintln!("nothing to show for `{}`", entry.reference.raw_target);
        return Ok(ExitCode::from(1));
    };

    if json {
        print_json(&result);
    } else {
        println!("{}", result.contents);
    }
    return Ok(ExitCode::SUCCESS);
}

/// Flip a feature toggle in the settings file.
///
/// # Errors
///
/// Returns `Error::UnknownFeature` or settings read/write errors.
pub fn toggle(ctx: &Context, name: &str) -> Result<ExitCode, Error> {
    let feature = Feature::parse(name)?;
    let enabled = settings::toggle_feature(&ctx.settings_path, feature)?;
    let state = if enabled { "enabled" } else { "disabled" };
    println!("{} {state} in {}", feature.key(), ctx.settings_path.display());
    return Ok(ExitCode::SUCCESS);
}

/// Write one replacement rule slot.
///
/// # Errors
///
/// Returns `Error::ReplacementSlotOutOfRange` or settings read/write errors.
pub fn replace(ctx: &Context, find: &str, replace: &str, slot: usize) -> Result<ExitCode, Error> {
    let rule = ReplacementRule {
        find: find.to_owned(),
        replace: replace.to_owned(),
    };
    settings::set_replacement_rule(&ctx.settings_path, slot, rule)?;
    println!("slot {slot}: `{find}` -> `{replace}` in {}", ctx.settings_path.display());
    return Ok(ExitCode::SUCCESS);
}

/// Rescan a session's document and print its decorations and links.
pub fn print_links(session: &Session, json: bool) {
    let index = scanner::build_index(&session.document, &session.workspace, &session.settings);
    let decorations = providers::decorations(&index);
    let links = providers::document_links(&index);

    if json {
        print_json(&LinksJson { decorations, links });
        return;
    }

    for decoration in &decorations {
        println!(
            "DECOR  {}:{}-{} {}",
            decoration.line.saturating_add(1),
            decoration.span.start,
            decoration.span.end,
            decoration.kind.keyword(),
        );
    }
    for link in &links {
        println!(
            "LINK   {}:{}-{} {}",
            link.line.saturating_add(1),
            link.span.start,
            link.span.end,
            link.target,
        );
    }
    return;
}

/// One-word-ish summary of where a reference leads, for text output.
fn describe_resolution(resolution: &Resolution) -> String {
    return match resolution {
        Resolution::File(file) => match (&file.resolved_path, file.found) {
            (Some(path), true) => path.display().to_string(),
            (Some(path), false) => format!("not found ({})", path.display()),
            (None, _) => "not found".to_owned(),
        },
        Resolution::Task(task) => task
            .documentation_url
            .clone()
            .unwrap_or_else(|| "no documentation".to_owned()),
    };
}

/// Pretty-print a value as JSON on stdout.
fn print_json<T: Serialize>(value: &T) {
    // Plain structs of strings, numbers and paths always serialize.
    let json = serde_json::to_string_pretty(value).unwrap_or_default();
    println!("{json}");
    return;
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
    use crate::types::{ResolvedFileReference, TaskDocumentationRef};

    fn session(text: &str) -> Session {
        return Session {
            document: Document::from_text("/ws/main.yml", text),
            settings: Settings::default(),
            workspace: Workspace::new(&[PathBuf::from("/ws")]).unwrap(),
        };
    }

    #[test]
    fn line_arguments_are_one_based() {
        let s = session("steps:\n  - task: Bash@3\n");
        assert!(s.reference_at(2).unwrap().is_some());
        assert!(s.reference_at(1).unwrap().is_none());
    }

    #[test]
    fn line_zero_and_past_end_rejected() {
        let s = session("steps:\n");
        assert!(matches!(s.reference_at(0), Err(Error::LineOutOfRange { line: 0, count: 1, .. })));
        assert!(matches!(s.reference_at(2), Err(Error::LineOutOfRange { line: 2, .. })));
    }

    #[test]
    fn resolution_descriptions() {
        let missing = Resolution::File(ResolvedFileReference {
            found: false,
            raw_target: "a.yml".to_owned(),
            resolved_path: Some(PathBuf::from("/ws/a.yml")),
        });
        assert_eq!(describe_resolution(&missing), "not found (/ws/a.yml)");

        let custom = Resolution::Task(TaskDocumentationRef {
            documentation_url: None,
            task_name: "custom".to_owned(),
            version: String::new(),
        });
        assert_eq!(describe_resolution(&custom), "no documentation");
    }
}
