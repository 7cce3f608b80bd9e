use std::collections::HashMap;

use courier_core::ArticleRecord;
use ego_tree::NodeId;
use scraper::ElementRef;

use super::blocks::BlockCollector;
use super::furniture::{class_weight, is_generic_furniture, is_structural, link_density, tag_name};
use super::page::{element_text, Page};
use super::{ExtractOptions, ExtractionError};

/// Paragraphs shorter than this are ignored while scoring.
const MIN_PARAGRAPH_CHARS: usize = 25;

fn tag_bias(tag: &str) -> f64 {
    match tag {
        "article" => 10.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

fn paragraph_score(text: &str) -> f64 {
    let len = text.chars().count();
    let commas = text.matches(',').count();
    1.0 + commas as f64 + (len / 100).min(3) as f64
}

fn inside_structural(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(is_structural)
}

/// Picks the element most likely to hold the article text, or `body`.
/// Equal scores go to the candidate seen first in document order.
pub fn best_candidate(page: &Page) -> ElementRef<'_> {
    let mut candidates: Vec<(ElementRef<'_>, f64)> = Vec::new();
    let mut positions: HashMap<NodeId, usize> = HashMap::new();

    for paragraph in page.select_all("p, pre") {
        if inside_structural(paragraph) {
            continue;
        }
        let text = element_text(paragraph);
        if text.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let score = paragraph_score(&text);

        let parent = paragraph.parent().and_then(ElementRef::wrap);
        let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);
        for (ancestor, share) in [(parent, 1.0), (grandparent, 0.5)] {
            let Some(ancestor) = ancestor else { continue };
            if matches!(tag_name(ancestor).as_str(), "html") {
                continue;
            }
            let index = *positions.entry(ancestor.id()).or_insert_with(|| {
                let initial = tag_bias(&tag_name(ancestor)) + class_weight(ancestor);
                candidates.push((ancestor, initial));
                candidates.len() - 1
            });
            candidates[index].1 += score * share;
        }
    }

    let mut best: Option<(ElementRef<'_>, f64)> = None;
    for (element, raw) in candidates {
        let score = raw * (1.0 - link_density(element));
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((element, score));
        }
    }
    best.map(|(element, _)| element).unwrap_or_else(|| page.body())
}

fn title(page: &Page) -> Option<String> {
    page.meta(&["og:title"])
        .or_else(|| {
            page.select_all("h1")
                .into_iter()
                .filter(|h1| !inside_structural(*h1))
                .map(element_text)
                .find(|text| !text.is_empty())
        })
        .or_else(|| page.title_tag())
}

/// Fallback for any page: highest-scoring container, generic furniture rules,
/// no author or publication.
pub fn extract(page: &Page, options: &ExtractOptions) -> Result<ArticleRecord, ExtractionError> {
    let mut record = ArticleRecord::new(title(page), page.source_url());
    let container = best_candidate(page);

    let skip = |el: ElementRef<'_>| is_generic_furniture(el);
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
