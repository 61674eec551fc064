/// Site extraction for the same-site heuristics
use regex::Regex;
use std::sync::LazyLock;

static SITE_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+://([^/?#]+)").expect("site pattern is valid")
});

/// Extract the site (host, with port if present) from a URL
///
/// Only URLs of the exact form `scheme://host...` produce a site. Anything
/// else (`about:blank`, `data:` URLs, bare hostnames, empty strings) yields
/// `None`, so those tabs never match each other.
///
/// Examples:
/// - https://www.example.com/a/b → www.example.com
/// - http://localhost:3000/ → localhost:3000
/// - about:newtab → None
pub fn extract_site(url: &str) -> Option<String> {
    SITE_MATCHER
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|site| site.as_str().to_lowercase())
}

/// Both URLs resolve to the same site
pub fn is_same_site(a: &str, b: &str) -> bool {
    match (extract_site(a), extract_site(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
