// Directive buckets and policy assembly

use cspcrawl_scanner::{Directive, classify};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Sources every generated policy carries, independent of what was crawled.
pub fn baseline(directive: Directive) -> &'static [&'static str] {
    match directive {
        Directive::DefaultSrc => &["'self'"],
        Directive::ScriptSrc => &["'self'", "'strict-dynamic'", "'unsafe-inline'"],
        Directive::StyleSrc => &["'self'", "'unsafe-inline'"],
        Directive::ImgSrc => &["'self'", "data:"],
        Directive::FontSrc | Directive::ConnectSrc | Directive::FrameSrc => &["'self'"],
        Directive::ObjectSrc => &["'none'"],
        Directive::RequireTrustedTypesFor => &["'script'"],
        Directive::BaseUri => &["'self'"],
    }
}

/// Crawled origins grouped by the directive they were routed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveBuckets {
    buckets: BTreeMap<Directive, BTreeSet<String>>,
}

impl DirectiveBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify every resource and route the resulting origins.
    pub fn from_resources<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buckets = Self::new();
        for resource in resources {
            buckets.add_resource(resource.as_ref());
        }
        buckets
    }

    /// Classify one resource URL; returns the directive it landed in.
    pub fn add_resource(&mut self, resource_url: &str) -> Option<Directive> {
        let classification = classify(resource_url)?;
        self.add(classification.directive, classification.source);
        Some(classification.directive)
    }

    /// Add a source to a directive. Fixed directives (`default-src`,
    /// `object-src`, ...) never take crawled sources; returns `false` for them.
    pub fn add(&mut self, directive: Directive, source: String) -> bool {
        if !directive.is_classifiable() {
            return false;
        }
        self.buckets.entry(directive).or_default().insert(source);
        true
    }

    pub fn sources(&self, directive: Directive) -> impl Iterator<Item = &str> {
        self.buckets
            .get(&directive)
            .into_iter()
            .flat_map(|sources| sources.iter().map(String::as_str))
    }

    pub fn origin_count(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.origin_count() == 0
    }
}

/// An assembled policy: directives in emission order, each with its sorted,
/// deduplicated source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    directives: Vec<(Directive, Vec<String>)>,
}

impl Policy {
    pub fn directives(&self) -> &[(Directive, Vec<String>)] {
        &self.directives
    }

    pub fn sources(&self, directive: Directive) -> Option<&[String]> {
        self.directives
            .iter()
            .find(|(d, _)| *d == directive)
            .map(|(_, sources)| sources.as_slice())
    }

    fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.directives
            .iter()
            .map(|(directive, sources)| format!("{} {}", directive, sources.join(" ")))
    }

    /// The policy file format: one directive per line, `;`-terminated.
    pub fn render(&self) -> String {
        let mut text = self.lines().collect::<Vec<_>>().join(";\n");
        text.push(';');
        text
    }

    /// The policy on a single line, as sent in a response header.
    pub fn header_value(&self) -> String {
        let mut text = self.lines().collect::<Vec<_>>().join("; ");
        text.push(';');
        text
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Merge baselines, crawled origins and the nonce into a policy.
///
/// Output depends only on the bucket contents and the nonce.
pub fn assemble(buckets: &DirectiveBuckets, nonce: &str) -> Policy {
    let directives = Directive::ALL
        .into_iter()
        .map(|directive| {
            let mut sources: BTreeSet<String> = baseline(directive)
                .iter()
                .map(|s| s.to_string())
                .collect();
            sources.extend(buckets.sources(directive).map(str::to_string));
            if directive == Directive::ScriptSrc {
                sources.insert(format!("'nonce-{}'", nonce));
            }
            (directive, sources.into_iter().collect())
        })
        .collect();

    Policy { directives }
}
