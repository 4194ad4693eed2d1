// Crawl engine tests against an in-memory site

use cspcrawl_scanner::error::Result;
use cspcrawl_scanner::{
    Crawler, FetchedPage, FollowMode, PageFetcher, ScanError, StopSignal, Termination, classify,
};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Serves fixed HTML bodies by URL; unknown URLs answer 404.
struct StaticSite {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticSite {
    fn new(pages: &[(&str, String)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.clone()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PageFetcher for StaticSite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        self.requests.lock().unwrap().push(url.to_string());
        let (status, body) = match self.pages.get(url.as_str()) {
            Some(html) => (200, html.clone()),
            None => (404, String::new()),
        };
        Ok(FetchedPage {
            status,
            final_url: url.clone(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            body,
        })
    }
}

/// A linear chain of `n` pages: page i links to page i + 1.
fn chain(n: usize) -> StaticSite {
    let pages: Vec<(String, String)> = (0..n)
        .map(|i| {
            (
                format!("https://site.test/p{}", i),
                format!(r#"<a href="/p{}">next</a>"#, i + 1),
            )
        })
        .collect();
    let refs: Vec<(&str, String)> = pages.iter().map(|(u, h)| (u.as_str(), h.clone())).collect();
    StaticSite::new(&refs)
}

#[tokio::test]
async fn test_page_limit_reports_partial_crawl() {
    let crawler = Crawler::with_fetcher(chain(50)).with_max_pages(5);
    let report = crawler.crawl("https://site.test/p0").await.unwrap();

    assert_eq!(report.pages.len(), 5);
    assert_eq!(report.termination, Termination::PageLimit);
    assert!(!report.termination.is_complete());
}

#[tokio::test]
async fn test_fail_on_limit_surfaces_error() {
    let crawler = Crawler::with_fetcher(chain(50))
        .with_max_pages(3)
        .with_fail_on_limit(true);
    let err = crawler.crawl("https://site.test/p0").await.unwrap_err();

    assert!(matches!(err, ScanError::TraversalLimitExceeded { limit: 3 }));
}

#[tokio::test]
async fn test_page_limit_not_reported_when_site_fits() {
    // p0..p3 exist, p4 answers 404: five fetches in total
    let crawler = Crawler::with_fetcher(chain(4)).with_max_pages(5);
    let report = crawler.crawl("https://site.test/p0").await.unwrap();

    assert_eq!(report.pages.len(), 5);
    assert_eq!(report.pages_fetched(), 4);
    assert_eq!(report.termination, Termination::Exhausted);
}

#[tokio::test]
async fn test_depth_limit() {
    let crawler = Crawler::with_fetcher(chain(10)).with_max_depth(Some(2));
    let report = crawler.crawl("https://site.test/p0").await.unwrap();

    let urls: Vec<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/p0",
            "https://site.test/p1",
            "https://site.test/p2"
        ]
    );
    assert_eq!(report.termination, Termination::DepthLimit);
}

#[tokio::test]
async fn test_raised_stop_signal_ends_crawl() {
    let signal = StopSignal::new();
    signal.stop();
    let site = chain(10);
    let crawler = Crawler::with_fetcher(&site).with_stop_signal(signal);
    let report = crawler.crawl("https://site.test/p0").await.unwrap();

    assert!(report.pages.is_empty());
    assert_eq!(site.request_count(), 0);
    assert_eq!(report.termination, Termination::Stopped);
}

#[tokio::test]
async fn test_single_page_mode_fetches_once() {
    let site = chain(10);
    let crawler = Crawler::with_fetcher(&site).with_follow_mode(FollowMode::SinglePage);
    let report = crawler.crawl("https://site.test/p0").await.unwrap();

    assert_eq!(report.pages.len(), 1);
    assert_eq!(site.request_count(), 1);
    assert_eq!(report.termination, Termination::Exhausted);
}

#[tokio::test]
async fn test_start_page_missing() {
    let crawler = Crawler::with_fetcher(chain(3));
    let err = crawler.crawl("https://site.test/nowhere").await.unwrap_err();
    assert!(matches!(err, ScanError::StartPageUnavailable { .. }));
}

#[tokio::test]
async fn test_cycle_with_many_workers_fetches_each_page_once() {
    let site = StaticSite::new(&[
        (
            "https://site.test/",
            r#"<a href="/a">a</a><a href="/b">b</a><a href="/">home</a>"#.to_string(),
        ),
        (
            "https://site.test/a",
            r#"<a href="/b">b</a><a href="/">home</a><a href="/a#self">me</a>"#.to_string(),
        ),
        (
            "https://site.test/b",
            r#"<a href="/a">a</a><a href="https://site.test/">home</a>"#.to_string(),
        ),
    ]);
    let crawler = Crawler::with_fetcher(&site).with_workers(8);
    let report = crawler.crawl("https://site.test/").await.unwrap();

    assert_eq!(report.pages.len(), 3);
    assert_eq!(site.request_count(), 3);
    assert_eq!(report.termination, Termination::Exhausted);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let site = StaticSite::new(&[
        ("https://site.test/", r#"<a href="/x">x</a><a href="/x#top">x</a>"#.to_string()),
        ("https://site.test/x", r#"<a href="/">home</a><a href="/x">self</a>"#.to_string()),
    ]);
    let report = Crawler::with_fetcher(&site)
        .crawl("https://site.test/")
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 2);
    assert_eq!(site.request_count(), 2);
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let pages = [
        (
            "https://site.test/",
            r#"<script src="https://cdn.example.com/app.js"></script>
               <style>body { background: url('/img/bg.png'); }</style>
               <a href="/about">about</a>"#
                .to_string(),
        ),
        (
            "https://site.test/about",
            r#"<link href="https://fonts.example.com/css2?family=Inter">
               <img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=">"#
                .to_string(),
        ),
    ];

    let first = Crawler::with_fetcher(StaticSite::new(&pages))
        .crawl("https://site.test/")
        .await
        .unwrap();
    let second = Crawler::with_fetcher(StaticSite::new(&pages))
        .crawl("https://site.test/")
        .await
        .unwrap();

    assert_eq!(first.resources, second.resources);
    assert!(first.resources.contains("https://site.test/img/bg.png"));
    assert!(first.resources.iter().any(|r| r.starts_with("data:")));

    // data: references are collected but never classified
    for resource in first.resources.iter().filter(|r| r.starts_with("data:")) {
        assert_eq!(classify(resource), None);
    }
}
