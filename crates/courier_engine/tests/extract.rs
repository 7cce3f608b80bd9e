use courier_core::{ArticleRecord, ContentBlock};
use courier_engine::{
    detect_strategy, extract, extract_with, ArticleExtractor, ExtractOptions, ExtractionError,
    Extractor, Page, Strategy,
};
use pretty_assertions::assert_eq;

fn substack_page(title: &str, author: &str, publication: Option<&str>) -> String {
    let site_name = publication
        .map(|p| format!(r#"<meta property="og:site_name" content="{p}">"#))
        .unwrap_or_default();
    let suffix = publication.unwrap_or("Substack");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title} | {suffix}</title>
    {site_name}
    <meta name="author" content="{author}">
</head>
<body>
    <article>
        <h1>{title}</h1>
        <div class="profile-hover-card-target">
            <a>{author}</a>
        </div>
        <div class="article-content">
            <p>This is the main article content.</p>
            <p>More content here with various paragraphs.</p>
        </div>
        <div class="pc-display-flex">Should be removed</div>
        <div class="button-wrapper">Share button</div>
    </article>
</body>
</html>"#
    )
}

fn body_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Paragraph(text) | ContentBlock::Quote(text) => Some(text.clone()),
            ContentBlock::Heading { text, .. } => Some(text.clone()),
            ContentBlock::List { items, .. } => Some(items.join(" ")),
            ContentBlock::Image(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn win_win_metadata() {
    let title = "Can We Save Our Internet From The Bots, AND Preserve Anonymity?";
    let url = "https://substack.com/inbox/post/166333070";
    let html = substack_page(title, "Liv Boeree", Some("Win-Win"));

    assert_eq!(detect_strategy(&html, url), "substack");
    let record = extract(&html, url).expect("extracts");
    assert_eq!(record.title, title);
    assert_eq!(record.author.as_deref(), Some("Liv Boeree"));
    assert_eq!(record.publication.as_deref(), Some("Win-Win"));
    assert_eq!(record.source_url, url);
    assert_eq!(
        record.body,
        vec![
            ContentBlock::Paragraph("This is the main article content.".into()),
            ContentBlock::Paragraph("More content here with various paragraphs.".into()),
        ]
    );
}

#[test]
fn substack_furniture_is_removed() {
    let html = substack_page("Pt3: The Status Wars of Apes", "Aella", Some("Knowingless"));
    let record = extract(&html, "https://aella.substack.com/p/pt3-the-status-wars-of-apes")
        .expect("extracts");
    let text = body_text(&record.body);
    assert!(!text.contains("Should be removed"));
    assert!(!text.contains("Share button"));
    assert!(!text.contains("Aella"), "byline card is furniture: {text}");
    assert!(!text.contains("Status Wars"), "title heading is not repeated");
}

#[test]
fn missing_metadata_falls_back_to_generic() {
    let html = substack_page("Test Article", "Test Author", None);
    let url = "https://blog.example.com/posts/test-article";

    assert_eq!(detect_strategy(&html, url), "readability");
    let record = extract(&html, url).expect("extracts");
    assert_eq!(record.title, "Test Article");
    assert_eq!(record.author, None);
    assert_eq!(record.publication, None);
    assert!(body_text(&record.body).contains("This is the main article content."));
}

#[test]
fn generic_strategy_drops_navigation_and_link_lists() {
    let html = r#"<html><head><title>Field notes</title></head><body>
        <header><a href="/">Home</a></header>
        <nav><ul><li><a href="/a">Archive</a></li></ul></nav>
        <div class="main-story">
          <h2>Morning</h2>
          <p>We left camp before dawn, crossed the river twice, and reached the ridge by noon.</p>
          <div class="share-links"><a href="/tw">Tweet</a> <a href="/fb">Share</a></div>
          <p>The afternoon was quieter, with long stretches of walking and, later, some rain.</p>
          <ul class="tags"><li><a href="/t/hiking">hiking</a></li><li><a href="/t/rivers">rivers</a></li></ul>
        </div>
        <footer>Copyright</footer>
    </body></html>"#;

    let record = extract(html, "https://notes.example.org/field-notes").expect("extracts");
    assert_eq!(record.title, "Field notes");
    let text = body_text(&record.body);
    assert!(text.contains("crossed the river twice"));
    assert!(text.contains("some rain"));
    for furniture in ["Home", "Archive", "Tweet", "hiking", "Copyright"] {
        assert!(!text.contains(furniture), "{furniture} leaked into {text}");
    }
    assert_eq!(
        record.body[0],
        ContentBlock::Heading {
            level: 2,
            text: "Morning".into()
        }
    );
}

#[test]
fn repeated_image_urls_share_one_ref() {
    let html = r#"<html><head>
        <meta property="og:site_name" content="Pics">
        <meta name="generator" content="Substack">
      </head><body><div class="available-content">
        <p>First look at the chart.</p>
        <img src="https://substackcdn.com/image/chart.png">
        <p>And the same chart again.</p>
        <img src="https://substackcdn.com/image/chart.png">
        <img data-src="/local/photo.jpg">
      </div></body></html>"#;

    let record = extract_with(
        html,
        "https://pics.example.com/p/charts",
        &ExtractOptions {
            preserve_image_links: true,
        },
    )
    .expect("extracts");

    assert_eq!(record.images.len(), 2);
    assert_eq!(record.images[0].local_id, "img-001");
    assert_eq!(record.images[1].local_id, "img-002");
    assert_eq!(
        record.images[1].original_url,
        "https://pics.example.com/local/photo.jpg"
    );
    assert!(record.images.iter().all(|img| img.preserve_link));

    let image_blocks: Vec<&str> = record
        .body
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Image(img) => Some(img.local_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(image_blocks, vec!["img-001", "img-001", "img-002"]);
}

#[test]
fn title_falls_back_to_url_slug() {
    let html = "<html><body><div><p>Only a paragraph of body text lives here.</p></div></body></html>";
    let record = extract(html, "https://example.com/p/the-status-wars").expect("extracts");
    assert_eq!(record.title, "The status wars");
}

#[test]
fn blank_or_markupless_input_is_unparseable() {
    assert_eq!(
        extract("   ", "https://example.com/").unwrap_err(),
        ExtractionError::UnparseableHtml
    );
    assert_eq!(
        extract("just some words", "https://example.com/").unwrap_err(),
        ExtractionError::UnparseableHtml
    );
}

#[test]
fn page_of_only_furniture_has_empty_body() {
    let html = r#"<html><body><nav><a href="/">Home</a></nav><script>x()</script></body></html>"#;
    assert_eq!(
        extract(html, "https://example.com/").unwrap_err(),
        ExtractionError::EmptyBody
    );
}

#[test]
fn unclosed_tags_still_extract() {
    let html = "<html><body><article><p>An unclosed paragraph that keeps going<p>and another one";
    let record = extract(html, "https://example.com/a").expect("html5 parsing recovers");
    assert_eq!(record.body.len(), 2);
}

fn is_docs_site(page: &Page) -> bool {
    page.host() == Some("docs.example.com")
}

fn extract_docs(page: &Page, _options: &ExtractOptions) -> Result<ArticleRecord, ExtractionError> {
    let mut record = ArticleRecord::new(page.title_tag(), page.source_url());
    record.body = vec![ContentBlock::Paragraph("handled by the docs strategy".into())];
    Ok(record)
}

const DOCS: Strategy = Strategy {
    name: "docs",
    matches: is_docs_site,
    extract: extract_docs,
};

#[test]
fn custom_strategy_runs_before_the_readability_fallback() {
    let extractor = ArticleExtractor::with_strategies(vec![DOCS]);
    let html = r#"<html><head><title>Install guide</title></head><body><article>
        <p>Install the tool, configure it, and then run it against your project.</p>
    </article></body></html>"#;

    let docs = extractor
        .extract(html, "https://docs.example.com/install", &ExtractOptions::default())
        .expect("docs page");
    assert_eq!(docs.title, "Install guide");
    assert_eq!(
        docs.body,
        vec![ContentBlock::Paragraph("handled by the docs strategy".into())]
    );

    let other = extractor
        .extract(html, "https://blog.example.com/install", &ExtractOptions::default())
        .expect("fallback");
    assert_eq!(
        other.body,
        vec![ContentBlock::Paragraph(
            "Install the tool, configure it, and then run it against your project.".into()
        )]
    );
}
