use crate::config::Settings;
use crate::document::{Document, Workspace};
use crate::matcher;
use crate::resolver;
use crate::task;
use crate::types::{IndexedReference, RawReference, ReferenceKind, ReplacementRule, Resolution};

/// Scan a document line by line and resolve every reference found.
///
/// Output is in ascending line order with at most one entry per line. The
/// active replacement rules are read from `settings` once, up front; the
/// scan keeps no state between calls, so an unchanged document under
/// unchanged settings always yields the same index.
pub fn build_index(document: &Document, workspace: &Workspace, settings: &Settings) -> Vec<IndexedReference> {
    let rules = settings.active_replacements();

    let index: Vec<IndexedReference> = document
        .lines()
        .enumerate()
        .filter_map(|(line_number, line)| return matcher::match_line(line, line_number))
        .map(|reference| {
            let resolution = resolve_reference(&reference, document, workspace, rules);
            tracing::debug!(
                line = reference.line_number,
                kind = reference.kind.keyword(),
                raw_target = %reference.raw_target,
                "matched reference"
            );
            return IndexedReference { reference, resolution };
        })
        .collect();

    tracing::debug!(document = %document.path().display(), references = index.len(), "scanned document");
    return index;
}

/// Match and resolve the reference on a single line, if any.
pub fn reference_at_line(
    document: &Document,
    workspace: &Workspace,
    settings: &Settings,
    line_number: usize,
) -> Option<IndexedReference> {
    let reference = matcher::match_line(document.line(line_number)?, line_number)?;
    let resolution = resolve_reference(&reference, document, workspace, settings.active_replacements());
    return Some(IndexedReference { reference, resolution });
}

/// Send file/template targets to the path resolver and tasks to the task resolver.
fn resolve_reference(
    reference: &RawReference,
    document: &Document,
    workspace: &Workspace,
    rules: &[ReplacementRule],
) -> Resolution {
    return match reference.kind {
        ReferenceKind::File | ReferenceKind::Template => Resolution::File(resolver::resolve_file_reference(
            &reference.raw_target,
            document.path(),
            workspace,
            rules,
        )),
        ReferenceKind::Task => Resolution::Task(task::resolve_task(&reference.raw_target)),
    };
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
    use std::path::{Path, PathBuf};

    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "parameters: []\n").unwrap();
    }

    const PIPELINE: &str = "\
trigger: none
steps:
  - template: steps/build.yml@refs/heads/main
  - task: AzureFileCopy@4
  - script: echo hi
  - task: customStep
  - template: ./local.yml # sibling
";

    #[test]
    fn index_is_ordered_and_classified() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("shared/steps/build.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();
        let document = Document::from_text(root.join("pipelines/main.yml"), PIPELINE);

        let index = build_index(&document, &workspace, &Settings::default());
        let lines: Vec<usize> = index.iter().map(|e| e.reference.line_number).collect();
        assert_eq!(lines, [2, 3, 5, 6]);

        let Resolution::File(build) = &index[0].resolution else { panic!("expected file resolution") };
        assert!(build.found);
        assert_eq!(build.resolved_path, Some(root.join("shared/steps/build.yml")));

        let Resolution::Task(copy) = &index[1].resolution else { panic!("expected task resolution") };
        assert!(copy.documentation_url.as_deref().unwrap().ends_with("azure-file-copy-v4?view=azure-devops"));

        let Resolution::Task(custom) = &index[2].resolution else { panic!("expected task resolution") };
        assert_eq!(custom.documentation_url, None);

        let Resolution::File(local) = &index[3].resolution else { panic!("expected file resolution") };
        assert!(!local.found);
        assert_eq!(index[3].reference.raw_target, "./local.yml");
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn flush(&mut self) -> std::io::Result<()> {
            return Ok(());
        }

        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            return Ok(buf.len());
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            return self.clone();
        }
    }

    #[test]
    fn every_match_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let workspace = Workspace::new(&[root.clone()]).unwrap();
        let document = Document::from_text(root.join("pipelines/main.yml"), PIPELINE);

        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(log.clone())
            .finish();
        let index = tracing::subscriber::with_default(subscriber, || {
            return build_index(&document, &workspace, &Settings::default());
        });

        let text = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.matches("matched reference").count(), index.len());
        assert!(text.contains("raw_target=AzureFileCopy@4"), "{text}");
        assert!(text.contains("line=6"), "{text}");
        assert_eq!(text.matches("scanned document").count(), 1);
    }

    #[test]
    fn rescan_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("shared/steps/build.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();
        let document = Document::from_text(root.join("pipelines/main.yml"), PIPELINE);
        let settings = Settings::default();

        assert_eq!(build_index(&document, &workspace, &settings), build_index(&document, &workspace, &settings));
    }

    #[test]
    fn disabled_replacement_matches_empty_rule_set() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("templates/build.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();
        let document = Document::from_text(root.join("main.yml"), "  - template: /repo/templates/build.yml@self\n");

        let mut with_rules = Settings::default();
        with_rules.replacement_rules = vec![ReplacementRule { find: "/repo/".to_owned(), replace: String::new() }];
        let enabled = build_index(&document, &workspace, &with_rules);
        let Resolution::File(hit) = &enabled[0].resolution else { panic!("expected file resolution") };
        assert!(hit.found);

        let mut disabled = with_rules.clone();
        disabled.feature_toggles.replace_strings = false;
        let mut empty = Settings::default();
        empty.replacement_rules = Vec::new();
        assert_eq!(build_index(&document, &workspace, &disabled), build_index(&document, &workspace, &empty));
    }

    #[test]
    fn single_line_lookup() {
        let workspace = Workspace::new(&[PathBuf::from("/nonexistent-root")]).unwrap();
        let document = Document::from_text("/nonexistent-root/main.yml", PIPELINE);
        let settings = Settings::default();

        let entry = reference_at_line(&document, &workspace, &settings, 3).unwrap();
        assert_eq!(entry.reference.kind, ReferenceKind::Task);
        assert!(reference_at_line(&document, &workspace, &settings, 4).is_none());
        assert!(reference_at_line(&document, &workspace, &settings, 99).is_none());
    }
}
