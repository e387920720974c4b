//! Document and workspace access for the scan loop.

use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// A pipeline-definition document held as lines.
#[derive(Debug, Clone)]
pub struct Document {
    /// Text split on line breaks, terminators removed.
    lines: Vec<String>,
    /// Absolute location.
    path: PathBuf,
}

impl Document {
    /// Build a document from in-memory text.
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        return Self {
            lines: text.lines().map(str::to_owned).collect(),
            path: path.into(),
        };
    }

    /// Read a document from disk. The stored path is absolute.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentNotFound` if the file is missing,
    /// or `Error::Io` for other read failures.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let text = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::DocumentNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(t) => t,
        };
        let absolute = normalize_path(&std::path::absolute(path)?);
        return Ok(Self::from_text(absolute, &text));
    }

    /// Text of one line, or `None` past the end.
    pub fn line(&self, index: usize) -> Option<&str> {
        return self.lines.get(index).map(String::as_str);
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        return self.lines.len();
    }

    /// Lines in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        return self.lines.iter().map(String::as_str);
    }

    /// Absolute path of the document.
    pub fn path(&self) -> &Path {
        return &self.path;
    }
}

/// The set of top-level folders that make up the open project.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Absolute root folders in configured order.
    roots: Vec<PathBuf>,
}

impl Workspace {
    /// Create a workspace from root folders, kept in the given order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a relative root cannot be made absolute.
    pub fn new(roots: &[PathBuf]) -> Result<Self, Error> {
        let roots = roots
            .iter()
            .map(|r| return std::path::absolute(r).map(|abs| return normalize_path(&abs)))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Self { roots });
    }

    /// The deepest root that contains `path`, if any.
    pub fn root_for(&self, path: &Path) -> Option<&Path> {
        return self
            .roots
            .iter()
            .filter(|root| return path.starts_with(root))
            .max_by_key(|root| return root.components().count())
            .map(PathBuf::as_path);
    }

    /// Roots in enumeration order.
    pub fn roots(&self) -> &[PathBuf] {
        return &self.roots;
    }
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// `..` pops a normal component, is dropped at the root, and is kept otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => match components.last() {
            Some(Component::Normal(_)) => {
                components.pop();
            },
            Some(Component::RootDir | Component::Prefix(_)) => {},
            _ => components.push(component),
        },
        other => components.push(other),
    }
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
    fn normalizes_dot_segments() {
        assert_eq!(normalize_path(Path::new("/repo/a/./b/../c.yml")), PathBuf::from("/repo/a/c.yml"));
        assert_eq!(normalize_path(Path::new("../x/../y")), PathBuf::from("../y"));
        assert_eq!(normalize_path(Path::new("/../etc")), PathBuf::from("/etc"));
    }

    #[test]
    fn deepest_root_wins() {
        let workspace = Workspace::new(&[PathBuf::from("/repo"), PathBuf::from("/repo/nested")]).unwrap();
        let root = workspace.root_for(Path::new("/repo/nested/pipelines/a.yml"));
        assert_eq!(root, Some(Path::new("/repo/nested")));
        assert_eq!(workspace.root_for(Path::new("/elsewhere/a.yml")), None);
    }

    #[test]
    fn root_prefix_is_component_wise() {
        let workspace = Workspace::new(&[PathBuf::from("/repo")]).unwrap();
        assert_eq!(workspace.root_for(Path::new("/repository/a.yml")), None);
    }

    #[test]
    fn document_lines() {
        let document = Document::from_text("/repo/a.yml", "steps:\n  - task: Bash@3\n");
        assert_eq!(document.line_count(), 2);
        assert_eq!(document.line(1), Some("  - task: Bash@3"));
        assert_eq!(document.line(2), None);
    }
}
