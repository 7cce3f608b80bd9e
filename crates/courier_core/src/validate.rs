use url::Url;

/// Accepts `name@kindle.com` and regional/free subdomains such as
/// `name@free.kindle.com`. Comparison is case-insensitive.
pub fn is_kindle_address(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let domain = domain.to_ascii_lowercase();
    domain == "kindle.com"
        || domain
            .strip_suffix(".kindle.com")
            .is_some_and(|sub| !sub.is_empty() && !sub.starts_with('.'))
}

/// Returns the normalized URL when `text` is a single http(s) URL.
pub fn parse_article_url(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return None;
    }
    let parsed = Url::parse(text).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed.to_string()),
        _ => None,
    }
}
