//! EPUB 2 packaging of one [`ArticleRecord`].
//!
//! Output is byte-identical for identical input: entries are written in a
//! fixed order with a fixed modification time, and the identifier is derived
//! from the source URL.
use std::io::{Cursor, Write};

use courier_core::{ArticleRecord, ContentBlock, ImageRef};
use courier_logging::{courier_debug, courier_warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::filename::hex_digest;
use crate::{FetchedImage, ImageMap};

const MIMETYPE: &str = "application/epub+zip";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const STYLESHEET: &str = r#"body { font-family: serif; line-height: 1.4; }
h1 { font-size: 1.6em; margin-bottom: 0.3em; }
p.byline, p.publication { margin: 0.2em 0; font-style: italic; }
hr { border: 0; border-top: 1px solid #ccc; margin: 1.2em 0; }
div.image { text-align: center; margin: 1em 0; }
div.image img { max-width: 100%; }
p.missing-image { text-align: center; font-style: italic; color: #666; }
blockquote { margin: 1em 1.5em; font-style: italic; }
"#;

#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("article has no body content")]
    EmptyBody,
    #[error("image {local_id} could not be written into the book: {reason}")]
    ImageEmbedFailure { local_id: String, reason: String },
    #[error("could not write EPUB container: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for PackagingError {
    fn from(err: zip::result::ZipError) -> Self {
        PackagingError::Archive(err.to_string())
    }
}

impl From<std::io::Error> for PackagingError {
    fn from(err: std::io::Error) -> Self {
        PackagingError::Archive(err.to_string())
    }
}

/// A finished EPUB file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubDocument {
    bytes: Vec<u8>,
    missing_images: Vec<String>,
}

impl EpubDocument {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Local ids of images rendered as placeholders.
    pub fn missing_images(&self) -> &[String] {
        &self.missing_images
    }
}

/// An image that made it into the archive.
struct Embedded<'a> {
    image: &'a ImageRef,
    href: String,
    media_type: &'static str,
    bytes: &'a [u8],
}

pub fn package(record: &ArticleRecord, images: &ImageMap) -> Result<EpubDocument, PackagingError> {
    if record.body.is_empty() {
        return Err(PackagingError::EmptyBody);
    }

    let mut embedded = Vec::new();
    let mut missing_images = Vec::new();
    for image in &record.images {
        match images.get(&image.local_id).and_then(|fetched| embeddable(image, fetched)) {
            Some(entry) => embedded.push(entry),
            None => missing_images.push(image.local_id.clone()),
        }
    }

    let identifier = format!("urn:sha256:{}", hex_digest(&record.source_url, 32));
    let xhtml = render_content(record, &embedded);
    let opf = generate_opf(record, &identifier, &embedded);
    let ncx = generate_ncx(record, &identifier);

    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE.as_bytes())?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(opf.as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(ncx.as_bytes())?;

    zip.start_file("OEBPS/style.css", deflated)?;
    zip.write_all(STYLESHEET.as_bytes())?;

    zip.start_file("OEBPS/content.xhtml", deflated)?;
    zip.write_all(xhtml.as_bytes())?;

    for entry in &embedded {
        let embed_failure = |reason: String| PackagingError::ImageEmbedFailure {
            local_id: entry.image.local_id.clone(),
            reason,
        };
        // Already-compressed formats gain nothing from deflate.
        let options = if entry.media_type == "image/svg+xml" { deflated } else { stored };
        zip.start_file(format!("OEBPS/{}", entry.href), options)
            .map_err(|e| embed_failure(e.to_string()))?;
        zip.write_all(entry.bytes)
            .map_err(|e| embed_failure(e.to_string()))?;
    }

    let bytes = zip.finish()?.into_inner();
    courier_debug!(
        "Packaged '{}': {} bytes, {} images embedded, {} missing",
        record.title,
        bytes.len(),
        embedded.len(),
        missing_images.len()
    );
    Ok(EpubDocument {
        bytes,
        missing_images,
    })
}

fn embeddable<'a>(image: &'a ImageRef, fetched: &'a FetchedImage) -> Option<Embedded<'a>> {
    let Some(media_type) = sniff_media_type(&fetched.bytes, fetched.content_type.as_deref()) else {
        courier_warn!(
            "Image {} from {} is not a recognised image format",
            image.local_id,
            image.original_url
        );
        return None;
    };
    Some(Embedded {
        image,
        href: format!("images/{}.{}", image.local_id, extension_for(media_type)),
        media_type,
        bytes: &fetched.bytes,
    })
}

/// Identifies an image by its magic bytes, falling back to an `image/*`
/// content type the sniffer does not know.
pub fn sniff_media_type(bytes: &[u8], content_type: Option<&str>) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some("image/svg+xml");
    }

    let declared = content_type?
        .split(';')
        .next()?
        .trim()
        .to_ascii_lowercase();
    match declared.as_str() {
        "image/png" => Some("image/png"),
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/gif" => Some("image/gif"),
        "image/webp" => Some("image/webp"),
        "image/svg+xml" => Some("image/svg+xml"),
        "image/bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

fn render_content(record: &ArticleRecord, embedded: &[Embedded<'_>]) -> String {
    let mut out = String::new();
    out.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en">
<head>
"#,
    );
    out.push_str(&format!("  <title>{}</title>\n", escape_xml(&record.title)));
    out.push_str("  <link rel=\"stylesheet\" type=\"text/css\" href=\"style.css\"/>\n");
    out.push_str("</head>\n<body>\n");

    out.push_str(&format!("  <h1>{}</h1>\n", escape_xml(&record.title)));
    if let Some(author) = &record.author {
        out.push_str(&format!("  <p class=\"byline\">By {}</p>\n", escape_xml(author)));
    }
    if let Some(publication) = &record.publication {
        out.push_str(&format!(
            "  <p class=\"publication\">From: {}</p>\n",
            escape_xml(publication)
        ));
    }
    out.push_str("  <hr/>\n");

    for block in &record.body {
        match block {
            ContentBlock::Paragraph(text) => {
                out.push_str(&format!("  <p>{}</p>\n", escape_xml(text)));
            }
            ContentBlock::Heading { level, text } => {
                // h1 belongs to the article title.
                let level = (*level).clamp(2, 6);
                out.push_str(&format!("  <h{level}>{}</h{level}>\n", escape_xml(text)));
            }
            ContentBlock::Quote(text) => {
                out.push_str(&format!(
                    "  <blockquote><p>{}</p></blockquote>\n",
                    escape_xml(text)
                ));
            }
            ContentBlock::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                out.push_str(&format!("  <{tag}>\n"));
                for item in items {
                    out.push_str(&format!("    <li>{}</li>\n", escape_xml(item)));
                }
                out.push_str(&format!("  </{tag}>\n"));
            }
            ContentBlock::Image(image) => {
                match embedded.iter().find(|e| e.image.local_id == image.local_id) {
                    Some(entry) => render_image(&mut out, image, &entry.href),
                    None => out.push_str(&format!(
                        "  <p class=\"missing-image\">[Image unavailable: {}]</p>\n",
                        escape_xml(&image.original_url)
                    )),
                }
            }
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn render_image(out: &mut String, image: &ImageRef, href: &str) {
    let img = format!("<img src=\"{}\" alt=\"\"/>", escape_xml(href));
    if image.preserve_link {
        out.push_str(&format!(
            "  <div class=\"image\"><a href=\"{}\">{img}</a></div>\n",
            escape_xml(&image.original_url)
        ));
    } else {
        out.push_str(&format!("  <div class=\"image\">{img}</div>\n"));
    }
}

fn generate_opf(record: &ArticleRecord, identifier: &str, embedded: &[Embedded<'_>]) -> String {
    let mut opf = String::new();
    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(&record.title)));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));
    opf.push_str("    <dc:language>en</dc:language>\n");
    if let Some(author) = &record.author {
        opf.push_str(&format!("    <dc:creator>{}</dc:creator>\n", escape_xml(author)));
    }
    if let Some(publication) = &record.publication {
        opf.push_str(&format!(
            "    <dc:publisher>{}</dc:publisher>\n",
            escape_xml(publication)
        ));
    }
    opf.push_str(&format!(
        "    <dc:source>{}</dc:source>\n",
        escape_xml(&record.source_url)
    ));

    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str("    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n");
    opf.push_str("    <item id=\"style\" href=\"style.css\" media-type=\"text/css\"/>\n");
    opf.push_str(
        "    <item id=\"content\" href=\"content.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
    );
    for entry in embedded {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
            href_to_id(&entry.href),
            escape_xml(&entry.href),
            entry.media_type
        ));
    }
    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    opf.push_str("    <itemref idref=\"content\"/>\n");
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_ncx(record: &ArticleRecord, identifier: &str) -> String {
    let title = escape_xml(&record.title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
    <navPoint id="navpoint-1" playOrder="1">
      <navLabel>
        <text>{title}</text>
      </navLabel>
      <content src="content.xhtml"/>
    </navPoint>
  </navMap>
</ncx>
"#,
        uid = escape_xml(identifier),
    )
}

/// Escapes markup characters and drops code points XML 1.0 does not allow.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..)
}

/// Manifest ids must be XML names, so `images/img-001.png` becomes `images_img_001_png`.
fn href_to_id(href: &str) -> String {
    href.replace(['/', '.', ' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffing_prefers_magic_bytes_over_headers() {
        assert_eq!(
            sniff_media_type(b"\x89PNG\r\n\x1a\n....", Some("image/jpeg")),
            Some("image/png")
        );
        assert_eq!(sniff_media_type(b"GIF89a..", None), Some("image/gif"));
        assert_eq!(
            sniff_media_type(b"RIFF\x00\x00\x00\x00WEBPVP8 ", None),
            Some("image/webp")
        );
        assert_eq!(
            sniff_media_type(b"<?xml version=\"1.0\"?><svg xmlns=\"x\"/>", None),
            Some("image/svg+xml")
        );
    }

    #[test]
    fn unknown_bytes_need_an_image_content_type() {
        assert_eq!(sniff_media_type(b"BM....", Some("image/bmp")), Some("image/bmp"));
        assert_eq!(sniff_media_type(b"<html></html>", Some("text/html")), None);
        assert_eq!(sniff_media_type(b"\x00\x01", None), None);
    }

    #[test]
    fn escaping_covers_markup_characters() {
        assert_eq!(escape_xml(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
        assert_eq!(escape_xml("Hello\u{1}world\u{1F}\u{FFFE}\t!"), "Helloworld\t!");
        assert_eq!(href_to_id("images/img-001.png"), "images_img_001_png");
    }
}
