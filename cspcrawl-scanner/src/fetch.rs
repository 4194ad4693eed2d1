use crate::error::Result;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A page as handed back by a [`PageFetcher`].
///
/// `body` is already decoded to text using the charset the server declared
/// (UTF-8 when it declared none).
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Pages without a content type are treated as HTML.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true)
    }
}

/// Capability the crawl engine uses to retrieve pages.
///
/// Implementations report transport failures as errors and return every HTTP
/// response, whatever its status; the engine decides what a non-2xx means.
pub trait PageFetcher {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage>> + Send;
}

impl<T: PageFetcher + Sync + ?Sized> PageFetcher for &T {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage>> + Send {
        (**self).fetch(url)
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cspcrawl/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if final_url != *url {
            debug!("{} redirected to {}", url, final_url);
        }

        let body = response.text().await?;

        Ok(FetchedPage {
            status,
            final_url,
            content_type,
            body,
        })
    }
}
