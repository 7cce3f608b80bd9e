use scraper::ElementRef;

/// Tags that never carry article text.
pub const STRUCTURAL_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "object", "embed", "canvas",
    "video", "audio", "form", "button", "input", "select", "textarea", "nav", "aside", "dialog",
    "link", "meta",
];

/// Class/id tokens that mark page furniture.
const NEGATIVE_TOKENS: &[&str] = &[
    "ad", "ads", "advert", "advertisement", "banner", "breadcrumb", "breadcrumbs", "comment",
    "comments", "cookie", "cookies", "footer", "masthead", "menu", "modal", "nav", "navbar",
    "newsletter", "popup", "promo", "related", "share", "sharing", "sidebar", "social",
    "sponsor", "sponsored", "subscribe", "subscription", "toolbar", "widget",
];

/// Class/id tokens that mark article content.
const POSITIVE_TOKENS: &[&str] = &[
    "article", "body", "content", "entry", "main", "markup", "post", "story", "text",
];

/// A container whose links make up more than this share of its text is a link list.
pub const MAX_LINK_DENSITY: f64 = 0.5;
/// Link lists shorter than this many characters are dropped.
pub const LINK_LIST_MAX_CHARS: usize = 200;
/// Containers whose text is below this share of their markup are buttons, ad slots and the like.
pub const MIN_TEXT_DENSITY: f64 = 0.1;
/// Low-density containers shorter than this many characters are dropped.
pub const LOW_DENSITY_MAX_CHARS: usize = 100;

const CONTAINER_TAGS: &[&str] = &["div", "section", "ul", "ol", "table"];

pub fn tag_name(element: ElementRef<'_>) -> String {
    element.value().name().to_ascii_lowercase()
}

pub fn is_structural(element: ElementRef<'_>) -> bool {
    let tag = tag_name(element);
    STRUCTURAL_TAGS.contains(&tag.as_str())
}

/// True when the element carries any of the given classes.
pub fn has_any_class(element: ElementRef<'_>, classes: &[&str]) -> bool {
    element
        .value()
        .classes()
        .any(|class| classes.iter().any(|c| c.eq_ignore_ascii_case(class)))
}

/// Lower-cased tokens from `class` and `id`, split on whitespace, `-` and `_`.
fn class_id_tokens(element: ElementRef<'_>) -> Vec<String> {
    let attrs = element.value();
    let class = attrs.attr("class").unwrap_or_default();
    let id = attrs.attr("id").unwrap_or_default();
    format!("{class} {id}")
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// +25 for content-ish names, -25 for furniture-ish names, 0 when mixed or neutral.
pub fn class_weight(element: ElementRef<'_>) -> f64 {
    let tokens = class_id_tokens(element);
    let negative = tokens.iter().any(|t| NEGATIVE_TOKENS.contains(&t.as_str()));
    let positive = tokens.iter().any(|t| POSITIVE_TOKENS.contains(&t.as_str()));
    match (negative, positive) {
        (true, false) => -25.0,
        (false, true) => 25.0,
        _ => 0.0,
    }
}

pub fn text_len(element: ElementRef<'_>) -> usize {
    element
        .text()
        .map(|t| t.split_whitespace().map(str::len).sum::<usize>())
        .sum()
}

/// Share of the element's text that sits inside links.
pub fn link_density(element: ElementRef<'_>) -> f64 {
    let total = text_len(element);
    if total == 0 {
        return 0.0;
    }
    let linked: usize = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case("a"))
        .map(text_len)
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

/// Visible text bytes relative to serialized markup bytes.
pub fn text_density(element: ElementRef<'_>) -> f64 {
    let markup = element.html().len();
    if markup == 0 {
        return 0.0;
    }
    text_len(element) as f64 / markup as f64
}

fn contains_image(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| matches!(tag_name(el).as_str(), "img" | "picture"))
}

/// Furniture rules for pages without a known publication signature.
pub fn is_generic_furniture(element: ElementRef<'_>) -> bool {
    if is_structural(element) {
        return true;
    }
    let tag = tag_name(element);
    if matches!(tag.as_str(), "header" | "footer") {
        return true;
    }
    if class_weight(element) < 0.0 {
        return true;
    }
    if !CONTAINER_TAGS.contains(&tag.as_str()) {
        return false;
    }

    let text = text_len(element);
    if text < LINK_LIST_MAX_CHARS && link_density(element) > MAX_LINK_DENSITY {
        return true;
    }
    text < LOW_DENSITY_MAX_CHARS && !contains_image(element) && text_density(element) < MIN_TEXT_DENSITY
}
