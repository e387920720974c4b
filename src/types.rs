//! Core domain types for pipeline references, resolutions, and settings values.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which marker keyword introduced a reference. File and template share
/// path resolution; task resolves to a documentation address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// `file:` include.
    File,
    /// `task:` with an optional `@version`.
    Task,
    /// `template:` include.
    Template,
}

impl ReferenceKind {
    /// Map a marker keyword to its kind. Keywords are lowercase only.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        return match keyword {
            "file" => Some(Self::File),
            "task" => Some(Self::Task),
            "template" => Some(Self::Template),
            _ => None,
        };
    }

    /// The keyword as written in the document.
    pub const fn keyword(self) -> &'static str {
        return match self {
            Self::File => "file",
            Self::Task => "task",
            Self::Template => "template",
        };
    }
}

/// Zero-based character columns on a single line, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpan {
    /// Column one past the last character of the target.
    pub end: usize,
    /// Column of the first character of the trimmed target.
    pub start: usize,
}

/// A recognized reference on one line, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawReference {
    /// Marker keyword kind.
    pub kind: ReferenceKind,
    /// Zero-based line index in the document.
    pub line_number: usize,
    /// Target text with surrounding whitespace trimmed, `@` suffix included.
    pub raw_target: String,
    /// Where the trimmed target sits on the line.
    pub span: ColumnSpan,
}

/// A literal find/replace pair applied to raw path text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    /// Literal text to look for (first occurrence only).
    pub find: String,
    /// Literal text substituted in its place.
    pub replace: String,
}

/// Outcome of path resolution for a file or template reference.
/// A miss still carries the best-effort path for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFileReference {
    /// Whether the path exists on disk.
    pub found: bool,
    /// Raw target as written, including any `@` qualifier.
    pub raw_target: String,
    /// Absolute location found, or the best-effort candidate on a miss.
    pub resolved_path: Option<PathBuf>,
}

/// Documentation address for a `task:` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDocumentationRef {
    /// `None` when the target has no `@`; such tasks are not linkable.
    pub documentation_url: Option<String>,
    /// Task name as written, e.g. `AzureFileCopy`.
    pub task_name: String,
    /// Everything after the first `@`, unvalidated.
    pub version: String,
}

/// Process-wide feature switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureToggles {
    /// Allow hover to fetch task documentation over the network.
    pub internet_fetch: bool,
    /// Apply replacement rules before path lookup.
    pub replace_strings: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        return Self {
            internet_fetch: false,
            replace_strings: true,
        };
    }
}

/// Resolution result attached to an indexed reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Resolution {
    /// File or template path lookup.
    File(ResolvedFileReference),
    /// Task documentation address.
    Task(TaskDocumentationRef),
}

/// One entry of the reference index: the match and what it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedReference {
    /// The matched reference.
    pub reference: RawReference,
    /// Its resolution under the settings snapshot of the scan.
    pub resolution: Resolution,
}
