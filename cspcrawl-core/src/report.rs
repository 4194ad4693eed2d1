// Output formats for generated policies

use crate::error::Result;
use crate::policy::{DirectiveBuckets, Policy, assemble};
use chrono::{DateTime, Utc};
use cspcrawl_scanner::{CrawlReport, Directive, Termination};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyFormat {
    Text,
    Header,
    Json,
}

impl PolicyFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(PolicyFormat::Text),
            "header" => Some(PolicyFormat::Header),
            "json" => Some(PolicyFormat::Json),
            _ => None,
        }
    }

    /// Suffix appended to the derived output filename stem.
    pub fn file_suffix(self) -> &'static str {
        match self {
            PolicyFormat::Text => "csp.txt",
            PolicyFormat::Header => "csp.header.txt",
            PolicyFormat::Json => "csp.json",
        }
    }
}

/// Everything one run produced for one start URL.
#[derive(Debug, Clone)]
pub struct GeneratedPolicy {
    pub start_url: String,
    pub nonce: String,
    pub policy: Policy,
    pub buckets: DirectiveBuckets,
    pub crawl: CrawlReport,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedPolicy {
    /// Classify the crawl's resources and assemble the policy.
    pub fn from_crawl(crawl: CrawlReport, nonce: String) -> Self {
        let buckets = DirectiveBuckets::from_resources(&crawl.resources);
        let policy = assemble(&buckets, &nonce);
        Self {
            start_url: crawl.start_url.clone(),
            nonce,
            policy,
            buckets,
            crawl,
            generated_at: Utc::now(),
        }
    }

    pub fn render(&self, format: PolicyFormat) -> Result<String> {
        match format {
            PolicyFormat::Text => Ok(self.policy.render()),
            PolicyFormat::Header => Ok(format!(
                "Content-Security-Policy: {}",
                self.policy.header_value()
            )),
            PolicyFormat::Json => {
                let document = PolicyDocument::from(self);
                Ok(serde_json::to_string_pretty(&document)?)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub start_url: String,
    pub generated_at: String,
    pub nonce: String,
    pub directives: Vec<DirectiveEntry>,
    pub pages_crawled: usize,
    pub pages_failed: usize,
    pub resources: Vec<String>,
    pub termination: Termination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveEntry {
    pub name: Directive,
    pub sources: Vec<String>,
}

impl From<&GeneratedPolicy> for PolicyDocument {
    fn from(generated: &GeneratedPolicy) -> Self {
        Self {
            start_url: generated.start_url.clone(),
            generated_at: generated.generated_at.to_rfc3339(),
            nonce: generated.nonce.clone(),
            directives: generated
                .policy
                .directives()
                .iter()
                .map(|(name, sources)| DirectiveEntry {
                    name: *name,
                    sources: sources.clone(),
                })
                .collect(),
            pages_crawled: generated.crawl.pages_fetched(),
            pages_failed: generated.crawl.failed_pages().count(),
            resources: generated.crawl.resources.iter().cloned().collect(),
            termination: generated.crawl.termination,
        }
    }
}

/// Human-readable summary of a run, printed after the crawl.
pub fn generate_summary(generated: &GeneratedPolicy) -> String {
    let crawl = &generated.crawl;

    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str(&format!("# {}\n", generated.start_url));
    report.push_str(&format!("  Pages crawled: {}\n", crawl.pages_fetched()));
    report.push_str(&format!("  Pages failed: {}\n", crawl.failed_pages().count()));
    report.push_str(&format!("  Resource references: {}\n", crawl.resources.len()));
    report.push_str(&format!("  Origins whitelisted: {}\n", generated.buckets.origin_count()));
    report.push_str(&format!("  Crawl: {}\n", crawl.termination.describe()));

    let routed: Vec<Directive> = Directive::ALL
        .into_iter()
        .filter(|d| generated.buckets.sources(*d).next().is_some())
        .collect();
    if !routed.is_empty() {
        report.push('\n');
        for directive in routed {
            report.push_str(&format!("## {}\n", directive));
            for source in generated.buckets.sources(directive) {
                report.push_str(&format!("  {}\n", source));
            }
        }
    }

    let failed: Vec<_> = crawl.failed_pages().collect();
    if !failed.is_empty() {
        report.push_str("\n## failed pages\n");
        for page in failed {
            report.push_str(&format!(
                "  {} {}\n",
                page.url,
                page.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    report
}
