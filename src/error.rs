//! Crate-level error types for pipenav diagnostics.
use std::path::PathBuf;

/// Errors raised by the host layer: document and settings I/O, settings
/// updates, and documentation fetch. Reference matching and resolution
/// never produce these; their failures are result values.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document to scan does not exist on disk.
    #[error("document not found: {}", path.display())]
    DocumentNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Documentation request failed at the transport or HTTP level.
    #[error("fetch failed: {url}: {reason}")]
    Fetch {
        /// Description of the failure.
        reason: String,
        /// Documentation URL that was requested.
        url: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A requested line index is past the end of the document.
    #[error("line {line} out of range: {} has {count} lines", path.display())]
    LineOutOfRange {
        /// Number of lines in the document.
        count: usize,
        /// One-based line number that was requested.
        line: usize,
        /// Document that was queried.
        path: PathBuf,
    },

    /// Settings file exists but cannot be parsed for editing.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A replacement slot beyond the quick-replace window was requested.
    #[error("replacement slot {slot} out of range (editable slots: {max})")]
    ReplacementSlotOutOfRange {
        /// Number of editable slots.
        max: usize,
        /// Zero-based slot that was requested.
        slot: usize,
    },

    /// The documentation page has no syntax code block.
    #[error("no syntax section in {url}")]
    SyntaxBlockMissing {
        /// Documentation URL that was scraped.
        url: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No feature toggle with this name exists.
    #[error("unknown feature: `{name}`")]
    UnknownFeature {
        /// Feature name as given.
        name: String,
    },

    /// The document's extension is not a pipeline-definition language.
    #[error("unsupported document type: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description of the watcher failure.
        reason: String,
    },
}
