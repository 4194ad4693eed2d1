use crate::error::{Result, ScanError};
use crate::extract;
use crate::fetch::{FetchedPage, HttpFetcher, PageFetcher};
use crate::result::{CrawlReport, PageResult, Termination};
use futures::stream::{self, StreamExt};
use scraper::Html;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(PageEvent) + Send + Sync>;

/// Reported once per page the crawler finishes with.
#[derive(Debug, Clone)]
pub struct PageEvent {
    pub url: String,
    pub status_code: u16,
    pub resources_found: usize,
    pub pages_done: usize,
    pub queued: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    /// Fetch the start page only.
    SinglePage,
    /// Follow anchors to every page on the start URL's host.
    #[default]
    SameHost,
}

/// Cooperative stop flag, checked before each frontier pop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Crawler<F = HttpFetcher> {
    fetcher: F,
    follow_mode: FollowMode,
    max_pages: usize,
    max_depth: Option<usize>,
    workers: usize,
    fail_on_limit: bool,
    stop_signal: StopSignal,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler<HttpFetcher> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new()?))
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::with_timeout(timeout_secs)?))
    }
}

/// A claimed frontier entry after its fetch completed.
struct Fetched {
    url: Url,
    depth: usize,
    elapsed: Duration,
}

impl<F: PageFetcher> Crawler<F> {
    pub const DEFAULT_MAX_PAGES: usize = 500;
    pub const DEFAULT_WORKERS: usize = 4;

    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            fetcher,
            follow_mode: FollowMode::default(),
            max_pages: Self::DEFAULT_MAX_PAGES,
            max_depth: None,
            workers: Self::DEFAULT_WORKERS,
            fail_on_limit: false,
            stop_signal: StopSignal::new(),
            progress_callback: None,
        }
    }

    pub fn with_follow_mode(mut self, follow_mode: FollowMode) -> Self {
        self.follow_mode = follow_mode;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Return [`ScanError::TraversalLimitExceeded`] instead of a partial
    /// report when the page ceiling is hit.
    pub fn with_fail_on_limit(mut self, fail_on_limit: bool) -> Self {
        self.fail_on_limit = fail_on_limit;
        self
    }

    pub fn with_stop_signal(mut self, stop_signal: StopSignal) -> Self {
        self.stop_signal = stop_signal;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Breadth-first crawl from `start_url`, collecting every resource
    /// reference on every page of the start host.
    ///
    /// Failed pages are logged and skipped. The only fatal fetch failure is
    /// the start page's.
    pub async fn crawl(&self, start_url: &str) -> Result<CrawlReport> {
        info!(
            "Starting crawl of {} with {} workers (max {} pages)",
            start_url, self.workers, self.max_pages
        );

        let start = Url::parse(start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", start_url, e)))?;
        let base_host = start
            .host_str()
            .ok_or_else(|| ScanError::InvalidUrl(format!("{}: URL has no host", start_url)))?
            .to_string();

        let mut frontier: VecDeque<(Url, usize)> = VecDeque::from([(start.clone(), 0)]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut resources = BTreeSet::new();
        let mut pages: Vec<PageResult> = Vec::new();
        let mut depth_pruned = false;
        let mut termination = Termination::Exhausted;

        loop {
            let mut batch = Vec::with_capacity(self.workers);
            while batch.len() < self.workers {
                if self.stop_signal.is_stopped() {
                    termination = Termination::Stopped;
                    break;
                }
                if pages.len() + batch.len() >= self.max_pages {
                    break;
                }
                let Some((url, depth)) = frontier.pop_front() else {
                    break;
                };
                if !visited.insert(url.to_string()) {
                    continue;
                }
                batch.push((url, depth));
            }

            if batch.is_empty() {
                if termination == Termination::Stopped {
                    info!("Crawl of {} stopped after {} pages", start_url, pages.len());
                } else if frontier
                    .iter()
                    .any(|(url, _)| !visited.contains(url.as_str()))
                {
                    warn!("Page limit of {} reached for {}", self.max_pages, start_url);
                    if self.fail_on_limit {
                        return Err(ScanError::TraversalLimitExceeded {
                            limit: self.max_pages,
                        });
                    }
                    termination = Termination::PageLimit;
                } else if depth_pruned {
                    termination = Termination::DepthLimit;
                }
                break;
            }

            let fetched: Vec<(Fetched, Result<FetchedPage>)> = stream::iter(batch)
                .map(|(url, depth)| async move {
                    let started = Instant::now();
                    let outcome = self.fetch_page(&url).await;
                    let item = Fetched {
                        url,
                        depth,
                        elapsed: started.elapsed(),
                    };
                    (item, outcome)
                })
                .buffered(self.workers)
                .collect()
                .await;

            for (item, outcome) in fetched {
                let result = match outcome {
                    Ok(page) => {
                        let (result, links, pruned) =
                            self.process_page(&item, &page, &base_host, &visited, &mut resources);
                        depth_pruned |= pruned;
                        frontier.extend(links.into_iter().map(|link| (link, item.depth + 1)));
                        result
                    }
                    Err(e) => {
                        if item.depth == 0 {
                            return Err(ScanError::StartPageUnavailable {
                                url: item.url.to_string(),
                                reason: e.to_string(),
                            });
                        }
                        warn!("Failed to fetch {}: {}", item.url, e);
                        let mut result = PageResult::with_error(item.url.to_string(), e.to_string());
                        if let ScanError::HttpStatus { status, .. } = e {
                            result.status_code = status;
                        }
                        result.response_time = item.elapsed;
                        result
                    }
                };

                if let Some(ref callback) = self.progress_callback {
                    callback(PageEvent {
                        url: result.url.clone(),
                        status_code: result.status_code,
                        resources_found: result.resources_found,
                        pages_done: pages.len() + 1,
                        queued: frontier.len(),
                    });
                }
                pages.push(result);
            }
        }

        info!(
            "Crawl of {} complete: {} pages, {} resource references ({})",
            start_url,
            pages.len(),
            resources.len(),
            termination.describe()
        );

        Ok(CrawlReport {
            start_url: start.to_string(),
            pages,
            resources,
            termination,
        })
    }

    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage> {
        let page = self.fetcher.fetch(url).await?;
        if !page.is_success() {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: page.status,
            });
        }
        Ok(page)
    }

    /// Extract resources and follow-able links from a fetched page.
    ///
    /// Returns the page result, the links to enqueue and whether any link was
    /// dropped by the depth ceiling.
    fn process_page(
        &self,
        item: &Fetched,
        page: &FetchedPage,
        base_host: &str,
        visited: &HashSet<String>,
        resources: &mut BTreeSet<String>,
    ) -> (PageResult, Vec<Url>, bool) {
        let mut result = PageResult::new(item.url.to_string());
        result.final_url = Some(page.final_url.to_string());
        result.status_code = page.status;
        result.content_type = page.content_type.clone();
        result.response_time = item.elapsed;

        if !page.is_html() {
            debug!("Skipping non-HTML content at {}", item.url);
            return (result, Vec::new(), false);
        }

        let document = Html::parse_document(&page.body);

        let found = extract::extract_page_resources(&document, &page.final_url);
        result.resources_found = found.len();
        resources.extend(found);

        let mut links = Vec::new();
        let mut pruned = false;
        if self.follow_mode == FollowMode::SameHost {
            for link in extract::extract_links(&document, &page.final_url) {
                if !is_same_host(&link, base_host) {
                    debug!("  -> {} is off-host, skipping", link);
                    continue;
                }
                if visited.contains(link.as_str()) {
                    continue;
                }
                if let Some(max_depth) = self.max_depth
                    && item.depth + 1 > max_depth
                {
                    pruned = true;
                    continue;
                }
                result.links_found.push(link.to_string());
                links.push(link);
            }
        }

        (result, links, pruned)
    }
}

/// Hostname equality; scheme and port are not compared.
pub fn is_same_host(url: &Url, base_host: &str) -> bool {
    url.host_str() == Some(base_host)
}
