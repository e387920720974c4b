//! Task name mangling into versioned documentation addresses.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::TaskDocumentationRef;

/// Task reference pages, keyed by `{kebab-name}-v{version}`.
const DOCUMENTATION_URL_TEMPLATE: &str =
    "https://learn.microsoft.com/en-us/azure/devops/pipelines/tasks/reference/{0}?view=azure-devops";

/// A lowercase letter followed by an uppercase letter.
#[allow(clippy::expect_used, reason = "pattern is a literal")]
static CASE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"([a-z])([A-Z])").expect("valid regex");
});

/// Resolve a `task:` target such as `AzureFileCopy@4`.
///
/// Without an `@` the target is not a versioned task and carries no URL.
/// Only the first `@` separates name from version; the version is never validated.
pub fn resolve_task(raw_target: &str) -> TaskDocumentationRef {
    let Some((task_name, version)) = raw_target.split_once('@') else {
        return TaskDocumentationRef {
            documentation_url: None,
            task_name: raw_target.to_owned(),
            version: String::new(),
        };
    };

    let identifier = documentation_identifier(task_name, version);
    return TaskDocumentationRef {
        documentation_url: Some(DOCUMENTATION_URL_TEMPLATE.replace("{0}", &identifier)),
        task_name: task_name.to_owned(),
        version: version.to_owned(),
    };
}

/// `AzureFileCopy` + `4` -> `azure-file-copy-v4`.
fn documentation_identifier(task_name: &str, version: &str) -> String {
    let kebab = CASE_BOUNDARY.replace_all(task_name, "${1}-${2}").to_lowercase();
    return format!("{kebab}-v{version}");
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
    fn camel_case_name_becomes_kebab() {
        let task = resolve_task("AzureFileCopy@4");
        let url = task.documentation_url.unwrap();
        assert!(url.ends_with("azure-file-copy-v4?view=azure-devops"), "{url}");
        assert_eq!(task.task_name, "AzureFileCopy");
        assert_eq!(task.version, "4");
    }

    #[test]
    fn no_version_marker_is_not_linkable() {
        let task = resolve_task("noVersionHere");
        assert_eq!(task.documentation_url, None);
        assert_eq!(task.task_name, "noVersionHere");
    }

    #[test]
    fn only_first_at_separates() {
        let task = resolve_task("Bash@3@beta");
        assert_eq!(task.version, "3@beta");
        assert!(task.documentation_url.unwrap().ends_with("/bash-v3@beta?view=azure-devops"));
    }

    #[test]
    fn consecutive_capitals_split_once() {
        assert_eq!(documentation_identifier("PublishTestResults", "2"), "publish-test-results-v2");
        assert_eq!(documentation_identifier("DotNetCoreCLI", "2"), "dot-net-core-cli-v2");
        assert_eq!(documentation_identifier("npm", "1"), "npm-v1");
    }

    #[test]
    fn same_input_same_url() {
        assert_eq!(resolve_task("Docker@2"), resolve_task("Docker@2"));
    }
}
