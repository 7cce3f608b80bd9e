use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A parsed document plus the URL it came from.
pub struct Page {
    doc: Html,
    source_url: String,
    base_url: Option<Url>,
}

impl Page {
    pub fn parse(html: &str, source_url: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
            source_url: source_url.to_string(),
            base_url: Url::parse(source_url).ok(),
        }
    }

    pub fn document(&self) -> &Html {
        &self.doc
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn host(&self) -> Option<&str> {
        self.base_url.as_ref().and_then(Url::host_str)
    }

    /// Content of the first `<meta>` whose `property` or `name` matches one of
    /// `keys`, trying keys in order.
    pub fn meta(&self, keys: &[&str]) -> Option<String> {
        let sel = Selector::parse("meta").ok()?;
        keys.iter().find_map(|key| {
            self.doc.select(&sel).find_map(|meta| {
                let attrs = meta.value();
                let named = attrs
                    .attr("property")
                    .or_else(|| attrs.attr("name"))
                    .is_some_and(|name| name.trim().eq_ignore_ascii_case(key));
                if !named {
                    return None;
                }
                attrs.attr("content").map(clean_text).filter(|c| !c.is_empty())
            })
        })
    }

    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(css).ok()?;
        self.doc.select(&sel).next()
    }

    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(sel) => self.doc.select(&sel).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Text of `<title>`, whitespace-collapsed.
    pub fn title_tag(&self) -> Option<String> {
        self.select_first("title")
            .map(|t| clean_text(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    }

    pub fn body(&self) -> ElementRef<'_> {
        self.select_first("body")
            .unwrap_or_else(|| self.doc.root_element())
    }

    /// True when the raw markup mentions `needle` anywhere, e.g. a CDN host.
    pub fn mentions(&self, needle: &str) -> bool {
        self.doc.root_element().html().contains(needle)
    }
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}
