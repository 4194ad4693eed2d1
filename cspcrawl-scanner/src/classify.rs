// Lexical classification of resource URLs into CSP directives

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The directives a generated policy carries, in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Directive {
    #[serde(rename = "default-src")]
    DefaultSrc,
    #[serde(rename = "script-src")]
    ScriptSrc,
    #[serde(rename = "style-src")]
    StyleSrc,
    #[serde(rename = "img-src")]
    ImgSrc,
    #[serde(rename = "font-src")]
    FontSrc,
    #[serde(rename = "connect-src")]
    ConnectSrc,
    #[serde(rename = "frame-src")]
    FrameSrc,
    #[serde(rename = "object-src")]
    ObjectSrc,
    #[serde(rename = "require-trusted-types-for")]
    RequireTrustedTypesFor,
    #[serde(rename = "base-uri")]
    BaseUri,
}

impl Directive {
    pub const ALL: [Directive; 10] = [
        Directive::DefaultSrc,
        Directive::ScriptSrc,
        Directive::StyleSrc,
        Directive::ImgSrc,
        Directive::FontSrc,
        Directive::ConnectSrc,
        Directive::FrameSrc,
        Directive::ObjectSrc,
        Directive::RequireTrustedTypesFor,
        Directive::BaseUri,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Directive::DefaultSrc => "default-src",
            Directive::ScriptSrc => "script-src",
            Directive::StyleSrc => "style-src",
            Directive::ImgSrc => "img-src",
            Directive::FontSrc => "font-src",
            Directive::ConnectSrc => "connect-src",
            Directive::FrameSrc => "frame-src",
            Directive::ObjectSrc => "object-src",
            Directive::RequireTrustedTypesFor => "require-trusted-types-for",
            Directive::BaseUri => "base-uri",
        }
    }

    /// Whether crawled origins can be routed into this directive.
    pub fn is_classifiable(self) -> bool {
        CLASSIFICATION_RULES.iter().any(|(_, directive)| *directive == self)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered `(needles, directive)` rules; the first rule with a needle
/// occurring anywhere in the URL text decides the directive.
pub const CLASSIFICATION_RULES: &[(&[&str], Directive)] = &[
    (&["script", "js"], Directive::ScriptSrc),
    (&["css"], Directive::StyleSrc),
    (&["img"], Directive::ImgSrc),
    (&["font", "woff", "ttf"], Directive::FontSrc),
    (&["connect", "api"], Directive::ConnectSrc),
    (&["frame", "embed"], Directive::FrameSrc),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub directive: Directive,
    /// Source expression contributed to the directive, e.g. `https://*.cdn.example.com`.
    pub source: String,
}

/// Route a resource URL to a directive.
///
/// Only `http` and `https` URLs are considered. The contributed source is a
/// subdomain wildcard over the resource host (port kept when explicit), never
/// the resource URL itself.
pub fn classify(resource_url: &str) -> Option<Classification> {
    let parsed = Url::parse(resource_url).ok()?;
    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return None;
    }

    let directive = match_rule(resource_url)?;
    let host = parsed.host_str()?;
    let source = match parsed.port() {
        Some(port) => format!("{}://*.{}:{}", scheme, host, port),
        None => format!("{}://*.{}", scheme, host),
    };

    Some(Classification { directive, source })
}

/// The directive of the first rule matching `text`, if any.
pub fn match_rule(text: &str) -> Option<Directive> {
    CLASSIFICATION_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| text.contains(needle)))
        .map(|(_, directive)| *directive)
}
