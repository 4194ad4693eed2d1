use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub final_url: Option<String>,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub response_time: Duration,
    pub resources_found: usize,
    pub links_found: Vec<String>,
    pub error: Option<String>,
}

impl PageResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            final_url: None,
            status_code: 0,
            content_type: None,
            response_time: Duration::from_secs(0),
            resources_found: 0,
            links_found: Vec::new(),
            error: None,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Every reachable page was fetched.
    Exhausted,
    /// The page ceiling was hit with unvisited pages still queued.
    PageLimit,
    /// Links were dropped for lying deeper than the depth ceiling.
    DepthLimit,
    /// The stop signal was raised.
    Stopped,
}

impl Termination {
    pub fn is_complete(self) -> bool {
        self == Termination::Exhausted
    }

    pub fn describe(self) -> &'static str {
        match self {
            Termination::Exhausted => "all reachable pages crawled",
            Termination::PageLimit => "page limit reached",
            Termination::DepthLimit => "depth limit reached",
            Termination::Stopped => "stopped early",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub start_url: String,
    pub pages: Vec<PageResult>,
    /// Every resolved resource reference seen across all pages.
    pub resources: BTreeSet<String>,
    pub termination: Termination,
}

impl CrawlReport {
    pub fn pages_fetched(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_failure()).count()
    }

    pub fn failed_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.is_failure())
    }
}
