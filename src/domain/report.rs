use crate::domain::model::{BacklinkRecord, ProviderKind};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub label: String,
    pub count: usize,
}

/// Counts per band for one attribute. `eligible` is the number of records
/// that carried the attribute at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub buckets: Vec<BucketCount>,
    pub eligible: usize,
}

impl Distribution {
    pub fn counts(&self) -> Vec<usize> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
    pub cumulative: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremalMetrics {
    pub max_rating: f64,
    pub max_rating_url: String,
    /// Highest tier-2 live link count; absent when no record was enriched.
    pub max_tier2_links: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_links: usize,
    pub dofollow_percent: f64,
    pub broken_percent: f64,
    pub indirect_percent: f64,
    pub avg_spam_score: f64,
    pub avg_rank: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordVisibility {
    pub top_3: u64,
    pub top_10: u64,
    pub top_100: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainOverlap {
    pub shared_count: usize,
    pub unique_to_target: usize,
    pub unique_to_ours: usize,
    pub shared_urls: Vec<String>,
    pub avg_rating_shared: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub total: usize,
    pub succeeded: usize,
    /// URLs whose lookup failed and were recorded as zero/zero.
    pub degraded_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub provider: ProviderKind,
    pub target: String,
    pub total_backlinks: usize,
    pub yearly: Vec<YearCount>,
    pub rating_distribution: Distribution,
    pub tier2_link_distribution: Option<Distribution>,
    pub tier2_refdomain_distribution: Option<Distribution>,
    pub extremal: ExtremalMetrics,
    pub link_kinds: Vec<BucketCount>,
    pub quality: Option<QualitySummary>,
    pub rank_distribution: Option<Distribution>,
    pub spam_distribution: Option<Distribution>,
    pub keyword_visibility: Option<KeywordVisibility>,
    pub overlap: Option<DomainOverlap>,
    pub enrichment: Option<EnrichmentSummary>,
}

impl AnalysisReport {
    /// Plain-text summary for terminal output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Backlinks for {} ({})", self.target, self.provider)?;
        writeln!(out, "  Total backlinks: {}", self.total_backlinks)?;

        if !self.yearly.is_empty() {
            writeln!(out, "\nFirst seen by year")?;
            writeln!(out, "  {:<6} {:>8} {:>12}", "Year", "Count", "Cumulative")?;
            for row in &self.yearly {
                writeln!(out, "  {:<6} {:>8} {:>12}", row.year, row.count, row.cumulative)?;
            }
        }

        write_distribution(out, "Rating distribution", &self.rating_distribution)?;
        if let Some(dist) = &self.tier2_link_distribution {
            write_distribution(out, "Tier-2 live links", dist)?;
        }
        if let Some(dist) = &self.tier2_refdomain_distribution {
            write_distribution(out, "Tier-2 referring domains", dist)?;
        }

        writeln!(out, "\nMaximum metrics")?;
        writeln!(out, "  Highest rating: {}", self.extremal.max_rating)?;
        match self.extremal.max_tier2_links {
            Some(max) => writeln!(out, "  Most tier-2 links: {}", max)?,
            None => writeln!(out, "  Most tier-2 links: n/a")?,
        }
        if !self.extremal.max_rating_url.is_empty() {
            writeln!(out, "  Strongest backlink: {}", self.extremal.max_rating_url)?;
        }

        if let Some(quality) = &self.quality {
            writeln!(out, "\nLink quality ({} links)", quality.total_links)?;
            writeln!(out, "  Dofollow: {:.1}%", quality.dofollow_percent)?;
            writeln!(out, "  Broken: {:.1}%", quality.broken_percent)?;
            writeln!(out, "  Indirect: {:.1}%", quality.indirect_percent)?;
            writeln!(out, "  Average spam score: {:.1}", quality.avg_spam_score)?;
            writeln!(out, "  Average rank: {:.1}", quality.avg_rank)?;
        }

        if let Some(overlap) = &self.overlap {
            writeln!(out, "\nDomain overlap")?;
            writeln!(out, "  Shared source URLs: {}", overlap.shared_count)?;
            writeln!(out, "  Only linking to the target: {}", overlap.unique_to_target)?;
            writeln!(out, "  Only linking to us: {}", overlap.unique_to_ours)?;
            writeln!(out, "  Average rating of shared: {:.1}", overlap.avg_rating_shared)?;
        }

        if let Some(enrichment) = &self.enrichment {
            if !enrichment.degraded_urls.is_empty() {
                writeln!(
                    out,
                    "\n{} of {} tier-2 lookups failed and were counted as 0",
                    enrichment.degraded_urls.len(),
                    enrichment.total
                )?;
            }
        }
        Ok(())
    }
}

fn write_distribution(out: &mut String, title: &str, dist: &Distribution) -> std::fmt::Result {
    writeln!(out, "\n{}", title)?;
    for bucket in &dist.buckets {
        writeln!(out, "  {:<18} {:>6}", bucket.label, bucket.count)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub records: Vec<BacklinkRecord>,
    pub enrichment: Option<EnrichmentSummary>,
    /// Backlinks of the domain to compare against, when one was requested.
    pub comparison: Option<Vec<BacklinkRecord>>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub records: Vec<BacklinkRecord>,
    pub report: AnalysisReport,
    pub csv_output: String,
}
