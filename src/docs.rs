//! Remote task documentation: fetch a reference page and pull out its
//! YAML syntax block.

use std::cell::OnceCell;
use std::sync::LazyLock;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::error::Error;

/// Upper bound on a single documentation request.
const FETCH_TIMEOUT_SECS: u64 = 10;

/// The `#syntax` heading on a task reference page.
#[allow(clippy::expect_used, reason = "selector is a literal")]
static SYNTAX_ANCHOR: LazyLock<Selector> = LazyLock::new(|| {
    return Selector::parse("#syntax").expect("valid selector");
});

/// A code block inside a sibling `div`.
#[allow(clippy::expect_used, reason = "selector is a literal")]
static PRE_CODE: LazyLock<Selector> = LazyLock::new(|| {
    return Selector::parse("pre > code").expect("valid selector");
});

/// Where hover gets task usage text from. The hover provider only calls
/// this when internet fetch is enabled.
pub trait DocumentationSource {
    /// Fetch the syntax snippet published at `url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` on transport or HTTP failure, or
    /// `Error::SyntaxBlockMissing` if the page has no syntax block.
    fn fetch_syntax(&self, url: &str) -> Result<String, Error>;
}

/// Blocking HTTP client for the public task reference pages.
/// The client is built on the first fetch, so file hovers never need it.
#[derive(Default)]
pub struct HttpDocumentationSource {
    /// Lazily built request client.
    client: OnceCell<reqwest::blocking::Client>,
}

impl HttpDocumentationSource {
    /// The shared client, built with a request timeout on first use.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` if the TLS backend cannot be initialized.
    fn client(&self, url: &str) -> Result<&reqwest::blocking::Client, Error> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(concat!("pipenav/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                return Error::Fetch {
                    reason: e.to_string(),
                    url: url.to_owned(),
                };
            })?;
        return Ok(self.client.get_or_init(|| return client));
    }
}

impl DocumentationSource for HttpDocumentationSource {
    fn fetch_syntax(&self, url: &str) -> Result<String, Error> {
        let fetch_error = |reason: String| {
            return Error::Fetch {
                reason,
                url: url.to_owned(),
            };
        };

        tracing::debug!(url, "fetching task documentation");
        let response = self.client(url)?.get(url).send().map_err(|e| return fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let body = response.text().map_err(|e| return fetch_error(e.to_string()))?;
        return extract_syntax_block(&body).ok_or_else(|| Error::SyntaxBlockMissing { url: url.to_owned() });
    }
}

/// Find the element with id `syntax`, then the first `pre > code` inside
/// one of its following sibling `div`s. Returns the trimmed code text.
pub fn extract_syntax_block(html: &str) -> Option<String> {
    let page = Html::parse_document(html);
    let anchor = page.select(&SYNTAX_ANCHOR).next()?;

    return anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| return sibling.value().name() == "div")
        .find_map(|sibling| return sibling.select(&PRE_CODE).next())
        .map(|code| return code.text().collect::<String>().trim().to_owned());
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

    const PAGE: &str = r#"<html><body>
<h2 id="overview">Overview</h2>
<div><pre><code>not this one</code></pre></div>
<h2 id="syntax">Syntax</h2>
<p>Intro paragraph.</p>
<div class="tabGroup"><section><pre><code class="lang-yaml">
# Bash v3
- task: Bash@3
  inputs:
    targetType: 'filePath' # 'filePath' | 'inline'.
    filePath: # string. Required when targetType = filePath.
</code></pre></section></div>
<div><pre><code>later block</code></pre></div>
</body></html>"#;

    #[test]
    fn takes_first_code_block_after_syntax_anchor() {
        let usage = extract_syntax_block(PAGE).unwrap();
        assert!(usage.starts_with("# Bash v3"), "{usage}");
        assert!(usage.contains("targetType: 'filePath' # 'filePath' | 'inline'."));
        assert!(!usage.contains("later block"));
    }

    #[test]
    fn decodes_entities() {
        let page = r#"<h2 id="syntax">Syntax</h2><div><pre><code>a &lt;b&gt; &amp; c</code></pre></div>"#;
        assert_eq!(extract_syntax_block(page).unwrap(), "a <b> & c");
    }

    #[test]
    fn code_must_be_direct_child_of_pre() {
        let page = r#"<h2 id="syntax">Syntax</h2><div><pre><span><code>x</code></span></pre></div>"#;
        assert_eq!(extract_syntax_block(page), None);
    }

    #[test]
    fn missing_anchor_yields_none() {
        assert_eq!(extract_syntax_block("<div><pre><code>x</code></pre></div>"), None);
    }

    #[test]
    fn client_waits_for_first_fetch() {
        let source = HttpDocumentationSource::default();
        assert!(source.client.get().is_none());
    }
}
