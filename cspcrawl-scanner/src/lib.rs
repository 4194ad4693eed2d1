pub mod classify;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod result;

pub use classify::{Classification, Directive, classify};
pub use crawler::{Crawler, FollowMode, PageEvent, ProgressCallback, StopSignal};
pub use error::ScanError;
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use result::{CrawlReport, PageResult, Termination};
