use crate::error::Result;
use crate::nonce::NonceSource;
use crate::report::GeneratedPolicy;
use cspcrawl_scanner::{
    Crawler, FollowMode, HttpFetcher, PageEvent, PageFetcher, ProgressCallback, StopSignal,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: String,
    pub follow_mode: FollowMode,
    pub workers: usize,
    pub max_pages: usize,
    pub max_depth: Option<usize>,
    pub fail_on_limit: bool,
    pub timeout_secs: u64,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            follow_mode: FollowMode::SameHost,
            workers: 4,
            max_pages: 500,
            max_depth: None,
            fail_on_limit: false,
            timeout_secs: 10,
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Crawl `options.url` over HTTP and build its policy.
pub async fn execute_crawl(
    options: CrawlOptions,
    nonce_source: &dyn NonceSource,
    stop_signal: StopSignal,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<GeneratedPolicy> {
    let fetcher = HttpFetcher::with_timeout(options.timeout_secs)?;
    execute_crawl_with(fetcher, options, nonce_source, stop_signal, progress_callback).await
}

/// Same as [`execute_crawl`] over any page fetcher.
pub async fn execute_crawl_with<F: PageFetcher>(
    fetcher: F,
    options: CrawlOptions,
    nonce_source: &dyn NonceSource,
    stop_signal: StopSignal,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<GeneratedPolicy> {
    let CrawlOptions {
        url,
        follow_mode,
        workers,
        max_pages,
        max_depth,
        fail_on_limit,
        timeout_secs: _,
        show_progress_bars,
    } = options;

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Crawling {}...", url));
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut crawler = Crawler::with_fetcher(fetcher)
        .with_follow_mode(follow_mode)
        .with_workers(workers)
        .with_max_pages(max_pages)
        .with_max_depth(max_depth)
        .with_fail_on_limit(fail_on_limit)
        .with_stop_signal(stop_signal);

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let page_callback: ProgressCallback = Arc::new(move |event: PageEvent| {
            pb_clone.set_message(format!(
                "Crawling... {} pages done, {} queued ({})",
                event.pages_done,
                event.queued,
                extract_url_path(&event.url)
            ));
        });
        crawler = crawler.with_progress_callback(page_callback);
    }

    let crawl = crawler.crawl(&url).await;

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        match &crawl {
            Ok(report) => pb.finish_with_message(format!(
                "Crawl complete! {} pages, {} resource references",
                report.pages.len(),
                report.resources.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let crawl = crawl?;
    if let Some(ref callback) = progress_callback
        && !crawl.termination.is_complete()
    {
        callback(format!(
            "[!] Crawl of {} ended early: {}",
            url,
            crawl.termination.describe()
        ));
    }

    let generated = GeneratedPolicy::from_crawl(crawl, nonce_source.generate());
    info!(
        "Policy for {} built from {} origins",
        generated.start_url,
        generated.buckets.origin_count()
    );

    Ok(generated)
}
