pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    GenerateSettings, load_urls_from_file, load_urls_from_source, parse_url_line,
    policy_filename, write_policy,
};

pub use cspcrawl_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};
