//! HTML → [`ArticleRecord`] extraction.
//!
//! Strategies are tried in order; the first whose signature matches the page
//! extracts it. The readability strategy matches everything and comes last.
mod blocks;
mod furniture;
mod page;
mod readability;
mod substack;

use courier_core::ArticleRecord;
use courier_logging::courier_debug;

pub use page::Page;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("page is not parseable HTML")]
    UnparseableHtml,
    #[error("no article content left after removing page furniture")]
    EmptyBody,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Wrap embedded images in a link to their original URL.
    pub preserve_image_links: bool,
}

type ExtractFn = fn(&Page, &ExtractOptions) -> Result<ArticleRecord, ExtractionError>;

/// A named signature predicate paired with its extraction function.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub matches: fn(&Page) -> bool,
    pub extract: ExtractFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

pub const SUBSTACK: Strategy = Strategy {
    name: "substack",
    matches: substack::matches,
    extract: substack::extract,
};

pub const READABILITY: Strategy = Strategy {
    name: "readability",
    matches: matches_any,
    extract: readability::extract,
};

fn matches_any(_: &Page) -> bool {
    true
}

pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        html: &str,
        source_url: &str,
        options: &ExtractOptions,
    ) -> Result<ArticleRecord, ExtractionError>;
}

#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    strategies: Vec<Strategy>,
}

impl Default for ArticleExtractor {
    fn default() -> Self {
        Self {
            strategies: vec![SUBSTACK, READABILITY],
        }
    }
}

impl ArticleExtractor {
    /// Custom strategy list. [`READABILITY`] is appended when missing so every
    /// page has a fallback.
    pub fn with_strategies(mut strategies: Vec<Strategy>) -> Self {
        if !strategies.iter().any(|s| s.name == READABILITY.name) {
            strategies.push(READABILITY);
        }
        Self { strategies }
    }

    pub fn detect(&self, page: &Page) -> &Strategy {
        self.strategies
            .iter()
            .find(|strategy| (strategy.matches)(page))
            .unwrap_or(&READABILITY)
    }
}

impl Extractor for ArticleExtractor {
    fn extract(
        &self,
        html: &str,
        source_url: &str,
        options: &ExtractOptions,
    ) -> Result<ArticleRecord, ExtractionError> {
        if html.trim().is_empty() || !html.contains('<') {
            return Err(ExtractionError::UnparseableHtml);
        }
        let page = Page::parse(html, source_url);
        let strategy = self.detect(&page);
        courier_debug!("Extracting {} with the {} strategy", source_url, strategy.name);

        let record = (strategy.extract)(&page, options)?;
        courier_debug!(
            "Extracted '{}': {} blocks, {} images",
            record.title,
            record.body.len(),
            record.images.len()
        );
        Ok(record)
    }
}

/// Name of the strategy that would handle `html`.
pub fn detect_strategy(html: &str, source_url: &str) -> &'static str {
    let page = Page::parse(html, source_url);
    ArticleExtractor::default().detect(&page).name
}

/// Extracts with default options.
pub fn extract(html: &str, source_url: &str) -> Result<ArticleRecord, ExtractionError> {
    extract_with(html, source_url, &ExtractOptions::default())
}

pub fn extract_with(
    html: &str,
    source_url: &str,
    options: &ExtractOptions,
) -> Result<ArticleRecord, ExtractionError> {
    ArticleExtractor::default().extract(html, source_url, options)
}
