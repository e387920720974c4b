//! Layered filesystem resolution for `file:` and `template:` targets.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::document::{Workspace, normalize_path};
use crate::types::{ReplacementRule, ResolvedFileReference};

/// Resolve a raw file/template target to a location on disk.
///
/// Search order, first hit wins:
/// 1. `./` or `../` targets relative to the document's directory.
/// 2. Relative to the workspace root containing the document.
/// 3. Under each immediate subdirectory of every workspace root.
///
/// `rules` is the active replacement set: callers pass an empty slice when
/// string replacement is disabled. A miss carries the tier-2 candidate.
pub fn resolve_file_reference(
    raw_target: &str,
    document_path: &Path,
    workspace: &Workspace,
    rules: &[ReplacementRule],
) -> ResolvedFileReference {
    let lookup = strip_version_qualifier(raw_target);
    let rewritten = apply_replacements(lookup, rules);
    let document_dir = document_path.parent().unwrap_or_else(|| Path::new(""));

    if rewritten.starts_with("./") || rewritten.starts_with("../") {
        let candidate = normalize_path(&document_dir.join(&rewritten));
        if exists(&candidate) {
            tracing::debug!(lookup = %rewritten, path = %candidate.display(), "resolved relative to document");
            return found(raw_target, candidate);
        }
    }

    // A leading separator means "from the repository root", never filesystem root.
    let root_relative = rewritten.trim_start_matches(['/', '\\']);
    let root = workspace.root_for(document_path).unwrap_or(document_dir);
    let root_candidate = normalize_path(&root.join(root_relative));
    if exists(&root_candidate) {
        tracing::debug!(lookup = %rewritten, path = %root_candidate.display(), "resolved relative to workspace root");
        return found(raw_target, root_candidate);
    }

    if let Some(candidate) = find_in_root_subdirectories(workspace.roots(), root_relative) {
        tracing::debug!(lookup = %rewritten, path = %candidate.display(), "resolved in workspace subdirectory");
        return found(raw_target, candidate);
    }

    tracing::debug!(lookup = %rewritten, "no search tier matched");
    return ResolvedFileReference {
        found: false,
        raw_target: raw_target.to_owned(),
        resolved_path: Some(root_candidate),
    };
}

/// Keep the text before the first `@`; the rest is a ref qualifier.
pub fn strip_version_qualifier(raw_target: &str) -> &str {
    return raw_target.split_once('@').map_or(raw_target, |(path, _)| return path);
}

/// Apply each rule in order as a first-occurrence literal substitution.
/// An empty `find` matches at the start, so its `replace` becomes a prefix.
pub fn apply_replacements(path: &str, rules: &[ReplacementRule]) -> String {
    let mut current = path.to_owned();
    for rule in rules {
        current = current.replacen(rule.find.as_str(), &rule.replace, 1);
    }
    return current;
}

/// First `root/<subdir>/relative` that exists, roots in order and
/// subdirectories sorted by name.
fn find_in_root_subdirectories(roots: &[PathBuf], relative: &str) -> Option<PathBuf> {
    for root in roots {
        let subdirectories = WalkDir::new(root)
            .follow_links(true)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_dir());

        for subdirectory in subdirectories {
            let candidate = normalize_path(&subdirectory.path().join(relative));
            if exists(&candidate) {
                return Some(candidate);
            }
        }
    }
    return None;
}

/// Existence check that folds every I/O failure into "not found".
fn exists(path: &Path) -> bool {
    return path.try_exists().unwrap_or(false);
}

/// A hit at `path`.
fn found(raw_target: &str, path: PathBuf) -> ResolvedFileReference {
    return ResolvedFileReference {
        found: true,
        raw_target: raw_target.to_owned(),
        resolved_path: Some(path),
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
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "steps: []\n").unwrap();
    }

    fn rule(find: &str, replace: &str) -> ReplacementRule {
        return ReplacementRule { find: find.to_owned(), replace: replace.to_owned() };
    }

    #[test]
    fn replacement_is_first_occurrence_literal() {
        assert_eq!(apply_replacements("src/src/a.yml", &[rule("src", "lib")]), "lib/src/a.yml");
        assert_eq!(apply_replacements("a.*/b.yml", &[rule(".*", "x")]), "ax/b.yml");
    }

    #[test]
    fn replacement_rules_apply_in_order() {
        let rules = [rule("a", "b"), rule("b", "c")];
        assert_eq!(apply_replacements("a/b.yml", &rules), "c/b.yml");
    }

    #[test]
    fn empty_find_prefixes_path() {
        assert_eq!(apply_replacements("build.yml", &[rule("", "templates/")]), "templates/build.yml");
        assert_eq!(apply_replacements("build.yml", &[ReplacementRule::default()]), "build.yml");
    }

    #[test]
    fn version_suffix_is_discarded() {
        assert_eq!(strip_version_qualifier("./templates/build.yml@main"), "./templates/build.yml");
        assert_eq!(strip_version_qualifier("a.yml@b@c"), "a.yml");
        assert_eq!(strip_version_qualifier("a.yml"), "a.yml");
    }

    #[test]
    fn dot_relative_resolves_from_document_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("pipelines/templates/build.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();
        let document = root.join("pipelines/main.yml");

        let result = resolve_file_reference("./templates/build.yml@main", &document, &workspace, &[]);
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(root.join("pipelines/templates/build.yml")));
        assert_eq!(result.raw_target, "./templates/build.yml@main");
    }

    #[test]
    fn parent_relative_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("shared/a.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let result = resolve_file_reference("../shared/a.yml", &root.join("pipelines/main.yml"), &workspace, &[]);
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(root.join("shared/a.yml")));
    }

    #[test]
    fn root_relative_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("templates/deploy.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let result = resolve_file_reference("templates/deploy.yml", &root.join("pipelines/main.yml"), &workspace, &[]);
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(root.join("templates/deploy.yml")));
    }

    #[test]
    fn leading_slash_is_root_relative() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("templates/deploy.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let result = resolve_file_reference("/templates/deploy.yml", &root.join("pipelines/main.yml"), &workspace, &[]);
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(root.join("templates/deploy.yml")));
    }

    #[test]
    fn sibling_subdirectory_scan() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("pipelines/main.yml"));
        touch(&root.join("shared/steps/build.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let result = resolve_file_reference(
            "steps/build.yml@refs/heads/main",
            &root.join("pipelines/main.yml"),
            &workspace,
            &[],
        );
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(root.join("shared/steps/build.yml")));
    }

    #[test]
    fn subdirectory_tie_break_is_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("zeta/t.yml"));
        touch(&root.join("alpha/t.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let result = resolve_file_reference("t.yml", &root.join("main.yml"), &workspace, &[]);
        assert_eq!(result.resolved_path, Some(root.join("alpha/t.yml")));
    }

    #[test]
    fn miss_reports_root_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let result = resolve_file_reference("./missing.yml", &root.join("pipelines/main.yml"), &workspace, &[]);
        assert!(!result.found);
        assert_eq!(result.resolved_path, Some(root.join("missing.yml")));
    }

    #[test]
    fn replacement_applies_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("templates/build.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();
        let document = root.join("main.yml");

        let rules = [rule("/templates-repo/", "")];
        let result = resolve_file_reference("/templates-repo/templates/build.yml@templates", &document, &workspace, &rules);
        assert!(result.found);

        let disabled = resolve_file_reference("/templates-repo/templates/build.yml@templates", &document, &workspace, &[]);
        assert!(!disabled.found);
    }

    #[test]
    fn repeated_resolution_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("shared/x.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();
        let document = root.join("main.yml");

        let first = resolve_file_reference("x.yml", &document, &workspace, &[]);
        let second = resolve_file_reference("x.yml", &document, &workspace, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn prefix_rule_redirects_into_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("templates/build.yml"));
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let rules = [rule("", "templates/")];
        let result = resolve_file_reference("build.yml@self", &root.join("main.yml"), &workspace, &rules);
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(root.join("templates/build.yml")));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_sibling_checkout_is_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        touch(&checkout.path().join("steps/s.yml"));
        let root = dir.path().to_path_buf();
        std::os::unix::fs::symlink(checkout.path(), root.join("templates-repo")).unwrap();
        let workspace = Workspace::new(&[root.clone()]).unwrap();

        let result = resolve_file_reference("steps/s.yml", &root.join("main.yml"), &workspace, &[]);
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(root.join("templates-repo/steps/s.yml")));
    }

    #[test]
    fn tier3_scans_roots_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&second.path().join("shared/steps/deploy.yml"));
        let workspace = Workspace::new(&[first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();
        let document = first.path().join("pipelines/main.yml");

        let result = resolve_file_reference("steps/deploy.yml", &document, &workspace, &[]);
        assert!(result.found);
        assert_eq!(result.resolved_path, Some(second.path().join("shared/steps/deploy.yml")));

        touch(&first.path().join("zz/steps/deploy.yml"));
        let result = resolve_file_reference("steps/deploy.yml", &document, &workspace, &[]);
        assert_eq!(result.resolved_path, Some(first.path().join("zz/steps/deploy.yml")));
    }
}
