//! URL canonicalization for de-duplication.
//!
//! The key is `host + path` with `www.` dropped, duplicate slashes collapsed,
//! no trailing slash (except the root `/`) and no query or fragment. It is an
//! equality key only and is never shown to anyone.

use std::sync::OnceLock;

use regex::Regex;
use ::url::Url;

/// Link shorteners and click trackers; a real article URL is preferred over these.
pub const TRACKING_HOSTS: &[&str] = &[
    "links.cision.one",
    "bit.ly",
    "t.co",
    "ow.ly",
    "tinyurl.com",
    "lnkd.in",
];

/// Canonical dedup key for a raw URL, hyperlink formula or encoded link.
/// None when nothing usable remains.
pub fn canonicalize(raw: &str) -> Option<String> {
    let mut working = raw.trim().to_string();
    if working.is_empty() {
        return None;
    }

    if looks_like_wrapped_link(&working) {
        if let Some(best) = extract_best_url(&working) {
            working = best;
        }
    }
    if let Some(target) = hyperlink_formula_target(&working) {
        working = target;
    }

    working = fix_protocol(&working);
    if !has_scheme(&working) {
        working = format!("https://{working}");
    }

    let key = match Url::parse(&working) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}{}", strip_www(&host.to_lowercase()), normalize_path(url.path())),
            None => fallback_key(&working),
        },
        Err(_) => fallback_key(&working),
    };
    (!key.is_empty()).then_some(key)
}

/// Link target written into the report for a stored URL value. Unlike
/// [`canonicalize`], query strings are kept.
pub fn link_target(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Wrapped links resolve like the dedup key so both name the same article
    let target = looks_like_wrapped_link(trimmed)
        .then(|| extract_best_url(trimmed))
        .flatten()
        .or_else(|| hyperlink_formula_target(trimmed))
        .unwrap_or_else(|| trimmed.to_string());
    Some(fix_protocol(&target))
}

/// Formula-wrapped (`=HYPERLINK(...)`) or percent-encoded argument lists
fn looks_like_wrapped_link(s: &str) -> bool {
    let unprefixed = s.trim_start_matches('=').trim_start();
    let lower = unprefixed.to_ascii_lowercase();
    lower.starts_with("hyperlink") || s.to_ascii_lowercase().contains("%22,%20%22")
}

/// Pick the last URL-like substring not on a tracking host, else the last one.
pub fn extract_best_url(raw: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?i)https?:/?/?[a-z0-9.-]+[^\s",)]+"#).expect("url candidate pattern")
    });

    let decoded = decode_argument_quotes(raw);
    let candidates: Vec<String> = re
        .find_iter(&decoded)
        .map(|m| fix_protocol(m.as_str()))
        .collect();

    candidates
        .iter()
        .rev()
        .find(|c| !is_tracking_link(c))
        .or_else(|| candidates.last())
        .cloned()
}

/// `%22` / `%20` / `%2C` back to `"` / space / `,` so candidates end cleanly
fn decode_argument_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3).map(str::to_ascii_uppercase);
        match code.as_deref() {
            Some("22") => out.push('"'),
            Some("20") => out.push(' '),
            Some("2C") => out.push(','),
            _ => {
                out.push('%');
                rest = &rest[pos + 1..];
                continue;
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    out
}

fn is_tracking_link(candidate: &str) -> bool {
    let without_scheme = candidate
        .split_once("://")
        .map_or(candidate, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let host = strip_www(&host);
    TRACKING_HOSTS
        .iter()
        .any(|t| host == *t || host.ends_with(&format!(".{t}")))
}

/// First argument of a bare `=HYPERLINK("target"[, "text"])` formula
pub fn hyperlink_formula_target(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?i)^=\s*hyperlink\(\s*"([^"]+)"\s*(?:[,;]\s*"[^"]*"\s*)?\)$"#)
            .expect("hyperlink formula pattern")
    });
    re.captures(s.trim()).map(|caps| caps[1].trim().to_string())
}

/// Repair `http:/x`, `https:x` and `https/x` style prefixes.
pub fn fix_protocol(raw: &str) -> String {
    let s = raw.trim();
    let lower = s.to_ascii_lowercase();
    for scheme in ["https", "http"] {
        if !lower.starts_with(scheme) {
            continue;
        }
        let rest = &s[scheme.len()..];
        if rest.starts_with("://") {
            return s.to_string();
        }
        if let Some(after_colon) = rest.strip_prefix(':') {
            return format!("{scheme}://{}", after_colon.trim_start_matches('/'));
        }
        if let Some(after_slash) = rest.strip_prefix('/') {
            if !after_slash.starts_with('/') {
                return format!("{scheme}://{after_slash}");
            }
        }
        return s.to_string();
    }
    s.to_string()
}

fn has_scheme(s: &str) -> bool {
    s.split_once("://")
        .is_some_and(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()))
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len().max(1));
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    if out.is_empty() {
        out.push('/');
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// String-level normalization for values the URL parser rejects
fn fallback_key(working: &str) -> String {
    let base = working.split(['?', '#']).next().unwrap_or_default();
    let lower = base.to_lowercase();
    let without_scheme = ["https://", "http://"]
        .iter()
        .find_map(|p| lower.strip_prefix(p))
        .unwrap_or(&lower);
    let without_www = strip_www(without_scheme);
    let mut key = String::with_capacity(without_www.len());
    for c in without_www.chars() {
        if c == '/' && key.ends_with('/') {
            continue;
        }
        key.push(c);
    }
    if key.len() > 1 && key.ends_with('/') {
        key.pop();
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn link_targets_keep_query() {
        assert_eq!(
            link_target(" https://x.com/a?id=2 ").as_deref(),
            Some("https://x.com/a?id=2")
        );
        assert_eq!(
            link_target(r#"=HYPERLINK("https://x.com/a","Read")"#).as_deref(),
            Some("https://x.com/a")
        );
        assert_eq!(link_target("http:/x.com/b").as_deref(), Some("http://x.com/b"));
        assert_eq!(link_target("  "), None);
    }

    #[test]
    fn link_target_skips_tracking_redirect() {
        let raw = r#"=HYPERLINK("https://links.cision.one/c/abc","https://www.news.example.org/story/")"#;
        assert_eq!(link_target(raw).as_deref(), Some("https://www.news.example.org/story/"));
        assert_eq!(
            link_target(r#"=HYPERLINK("www.example.com/a")"#).as_deref(),
            Some("www.example.com/a")
        );
    }

    #[test]
    fn scheme_www_and_trailing_slash_collapse() {
        let a = canonicalize("http://example.com/a");
        let b = canonicalize("https://www.example.com/a/");
        assert_eq!(a.as_deref(), Some("example.com/a"));
        assert_eq!(a, b);
        assert_eq!(canonicalize("EXAMPLE.com//news//story/?utm=1#top").as_deref(), Some("example.com/news/story"));
        assert_eq!(canonicalize("https://example.com").as_deref(), Some("example.com/"));
    }

    #[test]
    fn empty_is_none() {
        assert_eq!(canonicalize(""), None);
        assert_eq!(canonicalize("   "), None);
    }

    #[test]
    fn repairs_broken_protocols() {
        assert_eq!(fix_protocol("https:/example.com/a"), "https://example.com/a");
        assert_eq!(fix_protocol("http:example.com"), "http://example.com");
        assert_eq!(fix_protocol("https/example.com"), "https://example.com");
        assert_eq!(fix_protocol("httpbin.org/get"), "httpbin.org/get");
        assert_eq!(canonicalize("https:/example.com/a").as_deref(), Some("example.com/a"));
        assert_eq!(canonicalize("http:www.example.com/a").as_deref(), Some("example.com/a"));
        assert_eq!(canonicalize("httpbin.org/get").as_deref(), Some("httpbin.org/get"));
    }

    #[test]
    fn formula_prefers_non_tracking_candidate() {
        let raw = r#"=HYPERLINK("https://links.cision.one/c/abc?x=1","https://www.news.example.org/story/")"#;
        assert_eq!(canonicalize(raw).as_deref(), Some("news.example.org/story"));
    }

    #[test]
    fn formula_with_only_tracking_links_keeps_last() {
        let raw = r#"=HYPERLINK("https://bit.ly/one","https://links.cision.one/two")"#;
        assert_eq!(canonicalize(raw).as_deref(), Some("links.cision.one/two"));
    }

    #[test]
    fn percent_encoded_arguments() {
        let raw = "HYPERLINK(%22https://links.cision.one/c/1%22,%20%22https://example.com/a%22)";
        assert_eq!(canonicalize(raw).as_deref(), Some("example.com/a"));
    }

    #[test]
    fn bare_formula_uses_its_target() {
        let raw = r#"=HYPERLINK("example.com/launch","Read more")"#;
        assert_eq!(canonicalize(raw).as_deref(), Some("example.com/launch"));
        assert_eq!(hyperlink_formula_target("=hyperlink(\"x.org\")").as_deref(), Some("x.org"));
    }

    #[test]
    fn unparsable_falls_back_to_string_normalization() {
        assert_eq!(canonicalize("https://exa mple.com/A/?q=1").as_deref(), Some("exa mple.com/a"));
    }

    #[test]
    fn tracking_hosts_match_subdomains() {
        assert!(is_tracking_link("https://links.cision.one/x"));
        assert!(is_tracking_link("https://www.bit.ly/x"));
        assert!(!is_tracking_link("https://notbit.ly/x"));
    }

    fn raw_url() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["", "http://", "https://", "HTTPS://", "http:", "https/"]),
            prop::bool::ANY,
            "[a-z]{1,10}\\.(com|org|net)",
            prop::collection::vec("[a-z0-9]{1,6}", 0..4),
            prop::sample::select(vec!["/", "//", "///"]),
            prop::bool::ANY,
            prop::option::of("[a-z]{1,5}=[0-9]{1,3}"),
        )
            .prop_map(|(scheme, www, host, segments, sep, trailing, query)| {
                let mut url = format!("{scheme}{}{host}", if www { "www." } else { "" });
                for segment in &segments {
                    url.push_str(sep);
                    url.push_str(segment);
                }
                if trailing {
                    url.push('/');
                }
                if let Some(q) = query {
                    url.push('?');
                    url.push_str(&q);
                }
                url
            })
    }

    proptest! {
        #[test]
        fn canonicalize_is_idempotent(raw in raw_url()) {
            let once = canonicalize(&raw);
            prop_assert!(once.is_some());
            let twice = once.as_deref().and_then(canonicalize);
            prop_assert_eq!(once, twice);
        }
    }
}
