use courier_core::ArticleRecord;
use scraper::ElementRef;

use super::blocks::BlockCollector;
use super::furniture::{has_any_class, is_structural};
use super::page::{element_text, Page};
use super::readability::best_candidate;
use super::{ExtractOptions, ExtractionError};

/// Share bars, subscribe prompts, comment sections and the byline card.
const FURNITURE_CLASSES: &[&str] = &[
    "pc-display-flex",
    "button-wrapper",
    "modal",
    "popup",
    "subscription-widget-wrap",
    "share-dialog",
    "post-ufi",
    "comments-section",
    "post-footer",
    "footer-buttons",
    "profile-hover-card-target",
];

const BODY_CONTAINERS: &[&str] = &[".available-content", ".body.markup", "article", "main"];

fn is_furniture(element: ElementRef<'_>) -> bool {
    is_structural(element) || has_any_class(element, FURNITURE_CLASSES)
}

fn inside_furniture(element: ElementRef<'_>) -> bool {
    is_furniture(element)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(is_furniture)
}

/// A publication-identity tag plus any Substack marker.
pub fn matches(page: &Page) -> bool {
    if page.meta(&["og:site_name"]).is_none() {
        return false;
    }
    let generator = page
        .meta(&["generator"])
        .is_some_and(|g| g.to_ascii_lowercase().contains("substack"));
    let host = page
        .host()
        .is_some_and(|h| h == "substack.com" || h.ends_with(".substack.com"));

    generator
        || host
        || page.select_first(".profile-hover-card-target").is_some()
        || page.mentions("substackcdn.com")
}

fn title(page: &Page, publication: Option<&str>) -> Option<String> {
    page.meta(&["og:title", "twitter:title"])
        .or_else(|| {
            page.select_all("h1")
                .into_iter()
                .filter(|h1| !inside_furniture(*h1))
                .map(element_text)
                .find(|text| !text.is_empty())
        })
        .or_else(|| {
            let full = page.title_tag()?;
            let stripped = publication
                .and_then(|publication| full.strip_suffix(publication))
                .and_then(|rest| rest.trim_end().strip_suffix('|'))
                .map(|rest| rest.trim_end().to_string());
            Some(stripped.unwrap_or(full))
        })
}

fn author(page: &Page) -> Option<String> {
    page.meta(&["author"]).or_else(|| {
        page.select_all(".profile-hover-card-target a")
            .into_iter()
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

pub fn extract(page: &Page, options: &ExtractOptions) -> Result<ArticleRecord, ExtractionError> {
    let publication = page.meta(&["og:site_name"]);
    let mut record = ArticleRecord::new(title(page, publication.as_deref()), page.source_url());
    record.author = author(page);
    record.publication = publication;

    let container = BODY_CONTAINERS
        .iter()
        .find_map(|css| page.select_first(css))
        .unwrap_or_else(|| best_candidate(page));

    let skip = |el: ElementRef<'_>| is_furniture(el);
    let (body, images) = BlockCollector::new(page.base_url(), options.preserve_image_links, &skip)
        .omit_heading(&record.title)
        .collect(container);

    if body.is_empty() {
        return Err(ExtractionError::EmptyBody);
    }
    record.body = body;
    record.images = images;
    Ok(record)
}
