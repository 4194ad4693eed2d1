// Resource reference extraction from HTML, inline CSS and inline JavaScript

use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static CSS_URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"url\(([^)]+)\)").ok());

/// Every resource a parsed page references: `src`/`href` attributes of
/// `script`, `img`, `font` and `link` tags, `url(...)` values inside `style`
/// tags, and URL-looking tokens inside inline scripts.
pub fn extract_page_resources(document: &Html, page_url: &Url) -> BTreeSet<String> {
    let mut resources = BTreeSet::new();

    for element in document.tree.nodes().filter_map(ElementRef::wrap) {
        match element.value().name() {
            "script" => {
                if let Some(resolved) = attribute_reference(&element, "src", page_url) {
                    resources.insert(resolved);
                }
                let inline: String = element.text().collect();
                resources.extend(extract_js_urls(&inline, page_url));
            }
            "img" | "font" => {
                if let Some(resolved) = attribute_reference(&element, "src", page_url) {
                    resources.insert(resolved);
                }
            }
            "link" => {
                if let Some(resolved) = attribute_reference(&element, "href", page_url) {
                    resources.insert(resolved);
                }
            }
            "style" => {
                let css: String = element.text().collect();
                resources.extend(extract_css_urls(&css, page_url));
            }
            _ => {}
        }
    }

    debug!("{} resource references on {}", resources.len(), page_url);
    resources
}

/// `url(...)` references in a stylesheet fragment, resolved against `page_url`.
pub fn extract_css_urls(css: &str, page_url: &Url) -> BTreeSet<String> {
    let Some(pattern) = CSS_URL_PATTERN.as_ref() else {
        return BTreeSet::new();
    };

    pattern
        .captures_iter(css)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"'))
        .filter_map(|raw| resolve_reference(page_url, raw))
        .collect()
}

/// URL candidates in an inline script.
///
/// The script is split on whitespace and quote characters. Tokens that are
/// already absolute `http(s)` URLs are kept verbatim, anything else is
/// resolved against `page_url`. This cannot tell a URL literal from any other
/// quote-free word, so plain identifiers come back as page-relative URLs.
pub fn extract_js_urls(js: &str, page_url: &Url) -> BTreeSet<String> {
    js.split(|c: char| c.is_whitespace() || c == '\'' || c == '"')
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            if token.starts_with("http://") || token.starts_with("https://") {
                Some(token.to_string())
            } else {
                resolve_reference(page_url, token)
            }
        })
        .collect()
}

/// Anchor targets on a page, resolved and stripped of fragments, in document
/// order without duplicates.
pub fn extract_links(document: &Html, page_url: &Url) -> Vec<Url> {
    let mut seen = BTreeSet::new();
    let mut links = Vec::new();

    for element in document.tree.nodes().filter_map(ElementRef::wrap) {
        if element.value().name() != "a" {
            continue;
        }
        if let Some(href) = element.value().attr("href")
            && let Some(link) = resolve_link(page_url, href)
            && seen.insert(link.to_string())
        {
            links.push(link);
        }
    }

    links
}

fn attribute_reference(element: &ElementRef<'_>, attribute: &str, page_url: &Url) -> Option<String> {
    element
        .value()
        .attr(attribute)
        .and_then(|raw| resolve_reference(page_url, raw))
}

fn resolve_reference(page_url: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    page_url.join(raw).ok().map(|url| url.to_string())
}

fn resolve_link(page_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    // Skip empty, javascript:, mailto:, tel:, etc.
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut url = page_url.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://site.test/page").unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_css_url_with_single_quotes() {
        let found = extract_css_urls("body { background: url('/images/bg.png'); }", &page());
        assert_eq!(found, set(&["https://site.test/images/bg.png"]));
    }

    #[test]
    fn test_css_url_variants() {
        let css = r#"
            @font-face { src: url("https://fonts.cdn.test/a.woff2"); }
            .hero { background: url( img/hero.jpg ); }
            .icon { background: url(data:image/png;base64,AAAA); }
        "#;
        let found = extract_css_urls(css, &page());
        assert!(found.contains("https://fonts.cdn.test/a.woff2"));
        assert!(found.contains("https://site.test/img/hero.jpg"));
        assert!(found.contains("data:image/png;base64,AAAA"));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_css_unterminated_url_is_ignored() {
        assert!(extract_css_urls("a { background: url('/x.png' ", &page()).is_empty());
        assert!(extract_css_urls("", &page()).is_empty());
    }

    #[test]
    fn test_js_absolute_tokens_kept_verbatim() {
        let js = r#"fetch("https://api.example.com/v1/items"); load('http://cdn.example.com/lib.js')"#;
        let found = extract_js_urls(js, &page());
        assert!(found.contains("https://api.example.com/v1/items"));
        assert!(!found.iter().any(|u| u.contains("\"")));
        assert!(found.contains("http://cdn.example.com/lib.js"));
    }

    #[test]
    fn test_js_relative_tokens_resolved_against_page() {
        let found = extract_js_urls("var x = '/static/app.js';", &page());
        assert!(found.contains("https://site.test/static/app.js"));
        assert!(found.contains("https://site.test/var"));
    }

    #[test]
    fn test_js_empty_input() {
        assert!(extract_js_urls("", &page()).is_empty());
        assert!(extract_js_urls("   \n\t ", &page()).is_empty());
    }

    #[test]
    fn test_page_resources_from_tags() {
        let html = r#"<html><head>
            <script src="https://cdn.example.com/app.js"></script>
            <link rel="stylesheet" href="/css/site.css">
            <style>.a { background: url("/img/a.png"); }</style>
        </head><body>
            <img src="logo.png">
            <img>
            <font src="/fonts/x.ttf">text</font>
        </body></html>"#;
        let document = Html::parse_document(html);
        let found = extract_page_resources(&document, &page());

        assert!(found.contains("https://cdn.example.com/app.js"));
        assert!(found.contains("https://site.test/css/site.css"));
        assert!(found.contains("https://site.test/img/a.png"));
        assert!(found.contains("https://site.test/logo.png"));
        assert!(found.contains("https://site.test/fonts/x.ttf"));
        assert_eq!(found.len(), 5);
    }

    #[test]
    fn test_page_resources_include_inline_script_tokens() {
        let html = r#"<script>window.api = "https://api.example.com/data";</script>"#;
        let document = Html::parse_document(html);
        let found = extract_page_resources(&document, &page());
        assert!(found.contains("https://api.example.com/data"));
    }

    #[test]
    fn test_page_resources_malformed_markup() {
        let document = Html::parse_document("<img src=\"/a.png\"<script src=<<<></div></p>");
        let found = extract_page_resources(&document, &page());
        assert!(found.iter().all(|u| u.starts_with("https://site.test/")));
    }

    #[test]
    fn test_links_resolved_and_filtered() {
        let html = r##"<body>
            <a href="/about#team">About</a>
            <a href="/about">About again</a>
            <a href="contact">Contact</a>
            <a href="#top">Top</a>
            <a href="mailto:me@site.test">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="https://other.test/">Other</a>
            <a>No href</a>
        </body>"##;
        let document = Html::parse_document(html);
        let links: Vec<String> = extract_links(&document, &page())
            .into_iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            links,
            vec![
                "https://site.test/about",
                "https://site.test/contact",
                "https://other.test/",
            ]
        );
    }
}
