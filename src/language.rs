//! Document language detection by file extension.
use std::path::Path;

use crate::error::Error;

/// Document types that may carry pipeline references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentLanguage {
    /// Markdown docs that quote pipeline snippets.
    Markdown,
    /// Plain text notes.
    PlainText,
    /// YAML, including Azure Pipelines definitions.
    Yaml,
}

/// Map a file extension to its document language.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for unknown extensions.
pub fn language_for_path(path: &Path) -> Result<DocumentLanguage, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext.to_ascii_lowercase().as_str() {
        "md" | "markdown" => Ok(DocumentLanguage::Markdown),
        "txt" => Ok(DocumentLanguage::PlainText),
        "yaml" | "yml" => Ok(DocumentLanguage::Yaml),
        _ => Err(Error::UnsupportedLanguage {
            ext: ext.to_owned(),
        }),
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

    #[test]
    fn pipeline_extensions() {
        assert_eq!(language_for_path(Path::new("azure-pipelines.yml")).unwrap(), DocumentLanguage::Yaml);
        assert_eq!(language_for_path(Path::new("ci/build.YAML")).unwrap(), DocumentLanguage::Yaml);
        assert_eq!(language_for_path(Path::new("README.md")).unwrap(), DocumentLanguage::Markdown);
        assert_eq!(language_for_path(Path::new("notes.txt")).unwrap(), DocumentLanguage::PlainText);
    }

    #[test]
    fn other_extensions_rejected() {
        let err = language_for_path(Path::new("main.rs")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { ext } if ext == "rs"));
    }
}
