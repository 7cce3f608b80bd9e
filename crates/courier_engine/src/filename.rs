use sha2::{Digest, Sha256};

/// Longest title prefix kept in a filename, in characters.
const MAX_TITLE_CHARS: usize = 80;

/// Deterministic attachment name: `{sanitized_title}--{short_hash(url)}.epub`.
///
/// Kindle shows the filename while a document is pending, so the title is
/// kept readable and only characters that mail clients or filesystems reject
/// are replaced.
pub fn epub_filename(title: &str, url: &str) -> String {
    let sanitized = sanitize_title(title);
    let hash = short_hash(url);
    format!("{sanitized}--{hash}.epub")
}

fn sanitize_title(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    let mut compacted = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && compacted.ends_with('_') {
            continue;
        }
        compacted.push(c);
    }

    let mut name: String = compacted
        .trim_matches(&['_', ' ', '.'][..])
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    name = name.trim_end_matches(&['_', ' ', '.'][..]).to_string();
    if name.is_empty() {
        name = "article".to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// First `bytes` bytes of the SHA-256 of `input`, hex encoded.
pub(crate) fn hex_digest(input: &str, bytes: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(bytes * 2);
    for byte in digest.iter().take(bytes) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

fn short_hash(input: &str) -> String {
    hex_digest(input, 4)
}
