use courier_core::{ContentBlock, ImageRef};
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::ElementRef;
use url::Url;

use super::furniture::tag_name;
use super::page::clean_text;

/// Elements that end the current paragraph.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "figure", "figcaption",
    "table", "thead", "tbody", "tr", "td", "th", "address", "dl", "dd", "dt", "hr", "center",
    "details", "summary",
];

/// Assigns `img-001`, `img-002`, ... to distinct image URLs in encounter order.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: Vec<ImageRef>,
    preserve_links: bool,
}

impl ImageRegistry {
    pub fn new(preserve_links: bool) -> Self {
        Self {
            images: Vec::new(),
            preserve_links,
        }
    }

    pub fn register(&mut self, url: &str) -> ImageRef {
        if let Some(existing) = self.images.iter().find(|img| img.original_url == url) {
            return existing.clone();
        }
        let image = ImageRef {
            original_url: url.to_string(),
            local_id: format!("img-{:03}", self.images.len() + 1),
            preserve_link: self.preserve_links,
        };
        self.images.push(image.clone());
        image
    }

    pub fn into_images(self) -> Vec<ImageRef> {
        self.images
    }
}

/// Walks a content container and turns it into ordered [`ContentBlock`]s.
///
/// `skip` decides which elements are furniture; skipped subtrees contribute
/// neither text nor images.
pub struct BlockCollector<'a> {
    base_url: Option<&'a Url>,
    skip: &'a dyn Fn(ElementRef<'_>) -> bool,
    omit_heading: Option<String>,
    registry: ImageRegistry,
    blocks: Vec<ContentBlock>,
    inline: String,
}

impl<'a> BlockCollector<'a> {
    pub fn new(
        base_url: Option<&'a Url>,
        preserve_links: bool,
        skip: &'a dyn Fn(ElementRef<'_>) -> bool,
    ) -> Self {
        Self {
            base_url,
            skip,
            omit_heading: None,
            registry: ImageRegistry::new(preserve_links),
            blocks: Vec::new(),
            inline: String::new(),
        }
    }

    /// Drops the first heading whose text equals `title`; the title is
    /// rendered separately.
    pub fn omit_heading(mut self, title: &str) -> Self {
        self.omit_heading = Some(clean_text(title));
        self
    }

    pub fn collect(mut self, root: ElementRef<'_>) -> (Vec<ContentBlock>, Vec<ImageRef>) {
        for child in root.children() {
            self.visit_node(child);
        }
        self.flush();
        (self.blocks, self.registry.into_images())
    }

    fn visit_node(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => append_collapsed(&mut self.inline, text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element);
                }
            }
            _ => {}
        }
    }

    fn visit_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            self.visit_node(child);
        }
    }

    fn visit_element(&mut self, element: ElementRef<'_>) {
        if (self.skip)(element) {
            return;
        }
        let tag = tag_name(element);
        match tag.as_str() {
            "img" => self.handle_image(element),
            "br" => append_collapsed(&mut self.inline, " "),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.handle_heading(element, &tag),
            "ul" | "ol" => self.handle_list(element, tag == "ol"),
            "blockquote" => {
                self.flush();
                let text = capture_text(element, self.skip);
                if !text.is_empty() {
                    self.blocks.push(ContentBlock::Quote(text));
                }
                self.collect_nested_images(element);
            }
            "pre" => {
                self.flush();
                let text = capture_text(element, self.skip);
                if !text.is_empty() {
                    self.blocks.push(ContentBlock::Paragraph(text));
                }
            }
            tag if BLOCK_TAGS.contains(&tag) => {
                self.flush();
                self.visit_children(element);
                self.flush();
            }
            _ => self.visit_children(element),
        }
    }

    fn handle_heading(&mut self, element: ElementRef<'_>, tag: &str) {
        self.flush();
        let text = capture_text(element, self.skip);
        if text.is_empty() {
            return;
        }
        if self.omit_heading.as_deref() == Some(text.as_str()) {
            self.omit_heading = None;
            return;
        }
        let level = tag[1..].parse::<u8>().unwrap_or(2);
        self.blocks.push(ContentBlock::Heading { level, text });
    }

    fn handle_list(&mut self, element: ElementRef<'_>, ordered: bool) {
        self.flush();
        let items: Vec<String> = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| tag_name(*child) == "li" && !(self.skip)(*child))
            .map(|li| capture_text(li, self.skip))
            .filter(|text| !text.is_empty())
            .collect();
        if !items.is_empty() {
            self.blocks.push(ContentBlock::List { ordered, items });
        }
        self.collect_nested_images(element);
    }

    /// Images inside list items and quotes follow the text block.
    fn collect_nested_images(&mut self, element: ElementRef<'_>) {
        for child in element.children().filter_map(ElementRef::wrap) {
            if (self.skip)(child) {
                continue;
            }
            if tag_name(child) == "img" {
                self.handle_image(child);
            } else {
                self.collect_nested_images(child);
            }
        }
    }

    fn handle_image(&mut self, element: ElementRef<'_>) {
        let Some(url) = image_source(element, self.base_url) else {
            return;
        };
        self.flush();
        let image = self.registry.register(url.as_str());
        self.blocks.push(ContentBlock::Image(image));
    }

    fn flush(&mut self) {
        let text = self.inline.trim();
        if !text.is_empty() {
            self.blocks.push(ContentBlock::Paragraph(text.to_string()));
        }
        self.inline.clear();
    }
}

/// Visible text of an element with furniture removed and whitespace collapsed.
pub fn capture_text(element: ElementRef<'_>, skip: &dyn Fn(ElementRef<'_>) -> bool) -> String {
    let mut out = String::new();
    capture_into(element, skip, &mut out);
    out.trim().to_string()
}

fn capture_into(element: ElementRef<'_>, skip: &dyn Fn(ElementRef<'_>) -> bool, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => append_collapsed(out, text),
            Node::Element(_) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                if skip(el) {
                    continue;
                }
                let tag = tag_name(el);
                let separate = tag == "br" || tag == "li" || BLOCK_TAGS.contains(&tag.as_str());
                if separate {
                    append_collapsed(out, " ");
                }
                capture_into(el, skip, out);
                if separate {
                    append_collapsed(out, " ");
                }
            }
            _ => {}
        }
    }
}

fn append_collapsed(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            if out.is_empty() || out.ends_with(' ') {
                continue;
            }
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
}

/// `src`, then lazy-loading `data-src`, then the first `srcset` candidate.
fn image_source(element: ElementRef<'_>, base: Option<&Url>) -> Option<Url> {
    let attrs = element.value();
    let srcset_first = attrs
        .attr("srcset")
        .and_then(|set| set.split(',').next())
        .and_then(|candidate| candidate.split_whitespace().next());

    [attrs.attr("src"), attrs.attr("data-src"), srcset_first]
        .into_iter()
        .flatten()
        .find_map(|raw| resolve_url(raw, base))
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => base?.join(trimmed).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}
