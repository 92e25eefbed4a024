use crate::utils::error::{BacklinkError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ahrefs,
    DataForSeo,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ahrefs => "ahrefs",
            Self::DataForSeo => "dataforseo",
        }
    }

    /// Inclusive bounds of the provider's authority score.
    pub fn rating_bounds(&self) -> (f64, f64) {
        match self {
            Self::Ahrefs => (0.0, 100.0),
            Self::DataForSeo => (0.0, 1000.0),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = BacklinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ahrefs" => Ok(Self::Ahrefs),
            "dataforseo" => Ok(Self::DataForSeo),
            other => Err(invalid_choice("provider", other, "ahrefs, dataforseo")),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the target is matched by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Subdomains,
    Exact,
    Prefix,
    Domain,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subdomains => "subdomains",
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Domain => "domain",
        }
    }
}

impl FromStr for MatchMode {
    type Err = BacklinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "subdomains" => Ok(Self::Subdomains),
            "exact" => Ok(Self::Exact),
            "prefix" => Ok(Self::Prefix),
            "domain" => Ok(Self::Domain),
            other => Err(invalid_choice(
                "mode",
                other,
                "subdomains, exact, prefix, domain",
            )),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-side deduplication of similar or duplicate links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    #[default]
    All,
    SimilarLinks,
    OnePerDomain,
}

impl AggregationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::SimilarLinks => "similar_links",
            Self::OnePerDomain => "one_per_domain",
        }
    }
}

impl FromStr for AggregationMode {
    type Err = BacklinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "similar_links" => Ok(Self::SimilarLinks),
            "one_per_domain" | "1_per_domain" => Ok(Self::OnePerDomain),
            other => Err(invalid_choice(
                "aggregation",
                other,
                "all, similar_links, one_per_domain",
            )),
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid_choice(field: &str, value: &str, allowed: &str) -> BacklinkError {
    BacklinkError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: format!("Expected one of: {}", allowed),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum LinkKind {
    Text,
    Redirect,
    Image,
    Frame,
    Form,
    Canonical,
    Other(String),
}

impl LinkKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Redirect => "redirect",
            Self::Image => "image",
            Self::Frame => "frame",
            Self::Form => "form",
            Self::Canonical => "canonical",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for LinkKind {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "text" | "href" | "anchor" => Self::Text,
            "redirect" => Self::Redirect,
            "image" => Self::Image,
            "frame" | "iframe" => Self::Frame,
            "form" => Self::Form,
            "canonical" => Self::Canonical,
            _ => Self::Other(raw),
        }
    }
}

impl From<LinkKind> for String {
    fn from(kind: LinkKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Per-link quality signals only some providers report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkQuality {
    pub domain_from: Option<String>,
    pub rank: f64,
    pub spam_score: f64,
    pub dofollow: bool,
    pub is_broken: bool,
    pub is_indirect: bool,
    pub anchor: Option<String>,
    pub keywords_top_3: u64,
    pub keywords_top_10: u64,
    pub keywords_top_100: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklinkRecord {
    pub source_url: String,
    pub source_rating: f64,
    pub first_seen: DateTime<Utc>,
    pub link_kind: LinkKind,
    /// `None` until tier-2 enrichment has run for this record.
    pub tier2_link_count: Option<u64>,
    pub tier2_referring_domain_count: Option<u64>,
    /// Set when the tier-2 lookup failed and the counts above are placeholder zeros.
    #[serde(default)]
    pub tier2_degraded: bool,
    pub quality: Option<LinkQuality>,
}

impl BacklinkRecord {
    /// Builds a record, enforcing a non-empty source URL and a rating inside
    /// the provider's declared bounds.
    pub fn new(
        provider: ProviderKind,
        source_url: impl Into<String>,
        source_rating: f64,
        first_seen: DateTime<Utc>,
        link_kind: LinkKind,
    ) -> Result<Self> {
        let source_url = source_url.into();
        if source_url.trim().is_empty() {
            return Err(BacklinkError::parse(
                format!("{} backlink", provider),
                "empty source URL",
            ));
        }

        let (min, max) = provider.rating_bounds();
        if !(min..=max).contains(&source_rating) {
            return Err(BacklinkError::parse(
                format!("{} backlink {}", provider, source_url),
                format!("rating {} outside [{}, {}]", source_rating, min, max),
            ));
        }

        Ok(Self {
            source_url,
            source_rating,
            first_seen,
            link_kind,
            tier2_link_count: None,
            tier2_referring_domain_count: None,
            tier2_degraded: false,
            quality: None,
        })
    }

    pub fn with_quality(mut self, quality: LinkQuality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn apply_tier2(&mut self, stats: Tier2Stats) {
        self.tier2_link_count = Some(stats.live_links);
        self.tier2_referring_domain_count = Some(stats.live_referring_domains);
        self.tier2_degraded = false;
    }

    pub fn mark_tier2_degraded(&mut self) {
        self.apply_tier2(Tier2Stats::zero());
        self.tier2_degraded = true;
    }

    pub fn is_enriched(&self) -> bool {
        self.tier2_link_count.is_some()
    }
}

/// Live second-order counts for one referring URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier2Stats {
    pub live_links: u64,
    pub live_referring_domains: u64,
}

impl Tier2Stats {
    pub fn zero() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryOptions {
    pub target: String,
    pub limit: u32,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub aggregation_mode: AggregationMode,
    #[serde(default)]
    pub enrich_tier2: bool,
}

impl QueryOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            limit: 100,
            match_mode: MatchMode::default(),
            aggregation_mode: AggregationMode::default(),
            enrich_tier2: false,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn with_aggregation_mode(mut self, aggregation_mode: AggregationMode) -> Self {
        self.aggregation_mode = aggregation_mode;
        self
    }

    pub fn with_tier2(mut self, enrich_tier2: bool) -> Self {
        self.enrich_tier2 = enrich_tier2;
        self
    }
}

impl Validate for QueryOptions {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("target", &self.target)?;
        validate_range("limit", self.limit, MIN_LIMIT, MAX_LIMIT)
    }
}

/// Parses the timestamp shapes providers emit: RFC 3339, `YYYY-MM-DD HH:MM:SS +00:00`,
/// naive date-times and bare dates (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
