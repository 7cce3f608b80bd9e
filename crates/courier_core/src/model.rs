use url::Url;

/// Title used when neither the page nor its URL yields anything readable.
pub const UNTITLED: &str = "Untitled article";

/// A remote image referenced by an article body.
///
/// `local_id` is assigned in encounter order and names the image inside the
/// packaged document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub original_url: String,
    pub local_id: String,
    pub preserve_link: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Paragraph(String),
    Heading { level: u8, text: String },
    Image(ImageRef),
    List { ordered: bool, items: Vec<String> },
    Quote(String),
}

/// Normalized article produced by extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: String,
    pub author: Option<String>,
    pub publication: Option<String>,
    pub source_url: String,
    pub body: Vec<ContentBlock>,
    /// One entry per distinct image URL, in first-seen order.
    pub images: Vec<ImageRef>,
}

impl ArticleRecord {
    /// Builds a record, substituting a URL-derived title when `title` is blank.
    pub fn new(title: Option<String>, source_url: impl Into<String>) -> Self {
        let source_url = source_url.into();
        let title = title
            .map(|t| collapse_whitespace(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_from_url(&source_url));
        Self {
            title,
            author: None,
            publication: None,
            source_url,
            body: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Words of readable text; images count for nothing.
    pub fn word_count(&self) -> usize {
        self.body
            .iter()
            .map(|block| match block {
                ContentBlock::Paragraph(text)
                | ContentBlock::Heading { text, .. }
                | ContentBlock::Quote(text) => text.split_whitespace().count(),
                ContentBlock::List { items, .. } => {
                    items.iter().map(|i| i.split_whitespace().count()).sum()
                }
                ContentBlock::Image(_) => 0,
            })
            .sum()
    }
}

/// Placeholder title from the last meaningful path segment, e.g.
/// `/p/the-status-wars-of-apes` becomes `The status wars of apes`.
pub fn title_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return UNTITLED.to_string();
    };

    let slug = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|segment| {
            let stem = segment
                .rsplit_once('.')
                .map(|(stem, _ext)| stem)
                .filter(|stem| !stem.is_empty())
                .unwrap_or(segment);
            stem.replace(['-', '_', '+'], " ")
        })
        .map(|s| collapse_whitespace(&s))
        .filter(|s| s.chars().any(char::is_alphanumeric));

    match slug {
        Some(slug) => capitalize(&slug),
        None => parsed
            .host_str()
            .map(str::to_string)
            .unwrap_or_else(|| UNTITLED.to_string()),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
