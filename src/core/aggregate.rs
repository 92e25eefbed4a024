//! Pure aggregation of a backlink set into the report views.

use crate::domain::model::{BacklinkRecord, LinkQuality, ProviderKind};
use crate::domain::report::{
    AnalysisReport, BucketCount, Distribution, DomainOverlap, EnrichmentSummary, ExtremalMetrics,
    KeywordVisibility, QualitySummary, YearCount,
};
use chrono::Datelike;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A band covers `[lower, next band's lower)`; the last band is open-ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub label: &'static str,
    pub lower: f64,
}

const fn band(label: &'static str, lower: f64) -> Band {
    Band { label, lower }
}

pub const DOMAIN_RATING_BANDS: [Band; 4] = [
    band("DR 0-29", 0.0),
    band("DR 30-44", 30.0),
    band("DR 45-59", 45.0),
    band("DR 60-100", 60.0),
];

pub const RANK_BANDS: [Band; 4] = [
    band("Rank 0-100", 0.0),
    band("Rank 101-200", 101.0),
    band("Rank 201-300", 201.0),
    band("Rank 300+", 301.0),
];

pub const SPAM_SCORE_BANDS: [Band; 4] = [
    band("Spam Score 0-25", 0.0),
    band("Spam Score 26-50", 26.0),
    band("Spam Score 51-75", 51.0),
    band("Spam Score 76-100", 76.0),
];

pub const TIER2_BANDS: [Band; 4] = [
    band("0", 0.0),
    band("1-3", 1.0),
    band("4-10", 4.0),
    band("11+", 11.0),
];

pub fn rating_bands(provider: ProviderKind) -> &'static [Band] {
    match provider {
        ProviderKind::Ahrefs => &DOMAIN_RATING_BANDS,
        ProviderKind::DataForSeo => &RANK_BANDS,
    }
}

fn band_index(bands: &[Band], value: f64) -> Option<usize> {
    if value.is_nan() {
        return None;
    }
    bands.iter().rposition(|b| value >= b.lower)
}

/// Counts values per band. Values below the first band are left out of every bucket.
pub fn bucket_counts<I>(bands: &[Band], values: I) -> Distribution
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = vec![0usize; bands.len()];
    let mut eligible = 0;
    for value in values {
        eligible += 1;
        if let Some(index) = band_index(bands, value) {
            counts[index] += 1;
        }
    }

    Distribution {
        buckets: bands
            .iter()
            .zip(counts)
            .map(|(b, count)| BucketCount {
                label: b.label.to_string(),
                count,
            })
            .collect(),
        eligible,
    }
}

pub fn rating_distribution(records: &[BacklinkRecord], bands: &[Band]) -> Distribution {
    bucket_counts(bands, records.iter().map(|r| r.source_rating))
}

/// Records that were never enriched are excluded.
pub fn tier2_link_distribution(records: &[BacklinkRecord]) -> Distribution {
    bucket_counts(
        &TIER2_BANDS,
        records.iter().filter_map(|r| r.tier2_link_count).map(|c| c as f64),
    )
}

pub fn tier2_refdomain_distribution(records: &[BacklinkRecord]) -> Distribution {
    bucket_counts(
        &TIER2_BANDS,
        records
            .iter()
            .filter_map(|r| r.tier2_referring_domain_count)
            .map(|c| c as f64),
    )
}

/// Per-year counts with a running total, ascending by year.
pub fn yearly_distribution(records: &[BacklinkRecord]) -> Vec<YearCount> {
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for record in records {
        *per_year.entry(record.first_seen.year()).or_default() += 1;
    }

    let mut cumulative = 0;
    per_year
        .into_iter()
        .map(|(year, count)| {
            cumulative += count;
            YearCount {
                year,
                count,
                cumulative,
            }
        })
        .collect()
}

/// Highest rating and the first URL carrying it; zeros on an empty set.
pub fn extremal_metrics(records: &[BacklinkRecord]) -> ExtremalMetrics {
    let strongest = records.iter().fold(None::<&BacklinkRecord>, |best, record| match best {
        Some(b) if record.source_rating <= b.source_rating => Some(b),
        _ => Some(record),
    });

    ExtremalMetrics {
        max_rating: strongest.map(|r| r.source_rating).unwrap_or(0.0),
        max_rating_url: strongest.map(|r| r.source_url.clone()).unwrap_or_default(),
        max_tier2_links: records.iter().filter_map(|r| r.tier2_link_count).max(),
    }
}

/// Counts per link kind, most frequent first.
pub fn link_kind_counts(records: &[BacklinkRecord]) -> Vec<BucketCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.link_kind.as_str()).or_default() += 1;
    }

    let mut kinds: Vec<BucketCount> = counts
        .into_iter()
        .map(|(label, count)| BucketCount {
            label: label.to_string(),
            count,
        })
        .collect();
    kinds.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    kinds
}

fn percent(part: usize, total: usize) -> f64 {
    part as f64 / total as f64 * 100.0
}

/// Aggregates over records carrying quality details; zeros when none do.
pub fn quality_summary(records: &[BacklinkRecord]) -> QualitySummary {
    let qualities: Vec<&LinkQuality> = records.iter().filter_map(|r| r.quality.as_ref()).collect();
    let total = qualities.len();
    if total == 0 {
        return QualitySummary {
            total_links: 0,
            dofollow_percent: 0.0,
            broken_percent: 0.0,
            indirect_percent: 0.0,
            avg_spam_score: 0.0,
            avg_rank: 0.0,
        };
    }

    let count = |pred: fn(&LinkQuality) -> bool| qualities.iter().filter(|q| pred(q)).count();

    QualitySummary {
        total_links: total,
        dofollow_percent: percent(count(|q| q.dofollow), total),
        broken_percent: percent(count(|q| q.is_broken), total),
        indirect_percent: percent(count(|q| q.is_indirect), total),
        avg_spam_score: qualities.iter().map(|q| q.spam_score).sum::<f64>() / total as f64,
        avg_rank: qualities.iter().map(|q| q.rank).sum::<f64>() / total as f64,
    }
}

pub fn rank_distribution(records: &[BacklinkRecord]) -> Option<Distribution> {
    let ranks: Vec<f64> = records
        .iter()
        .filter_map(|r| r.quality.as_ref().map(|q| q.rank))
        .collect();
    (!ranks.is_empty()).then(|| bucket_counts(&RANK_BANDS, ranks))
}

pub fn spam_distribution(records: &[BacklinkRecord]) -> Option<Distribution> {
    let scores: Vec<f64> = records
        .iter()
        .filter_map(|r| r.quality.as_ref().map(|q| q.spam_score))
        .collect();
    (!scores.is_empty()).then(|| bucket_counts(&SPAM_SCORE_BANDS, scores))
}

pub fn keyword_visibility(records: &[BacklinkRecord]) -> Option<KeywordVisibility> {
    records
        .iter()
        .filter_map(|r| r.quality.as_ref())
        .fold(None, |acc: Option<KeywordVisibility>, q| {
            let acc = acc.unwrap_or_default();
            Some(KeywordVisibility {
                top_3: acc.top_3 + q.keywords_top_3,
                top_10: acc.top_10 + q.keywords_top_10,
                top_100: acc.top_100 + q.keywords_top_100,
            })
        })
}

/// Compares the source URLs linking to the target against those linking to our domain.
pub fn domain_overlap(target: &[BacklinkRecord], ours: &[BacklinkRecord]) -> DomainOverlap {
    let target_urls: HashSet<&str> = target.iter().map(|r| r.source_url.as_str()).collect();
    let our_urls: HashSet<&str> = ours.iter().map(|r| r.source_url.as_str()).collect();

    let mut shared_urls: Vec<String> = target_urls
        .intersection(&our_urls)
        .map(|url| url.to_string())
        .collect();
    shared_urls.sort();

    let shared_ratings: Vec<f64> = target
        .iter()
        .filter(|r| our_urls.contains(r.source_url.as_str()))
        .map(|r| r.source_rating)
        .collect();
    let avg_rating_shared = if shared_ratings.is_empty() {
        0.0
    } else {
        shared_ratings.iter().sum::<f64>() / shared_ratings.len() as f64
    };

    DomainOverlap {
        shared_count: shared_urls.len(),
        unique_to_target: target_urls.difference(&our_urls).count(),
        unique_to_ours: our_urls.difference(&target_urls).count(),
        shared_urls,
        avg_rating_shared,
    }
}

/// Builds every derived view for one query result.
pub fn analyze(
    provider: ProviderKind,
    target: &str,
    records: &[BacklinkRecord],
    enrichment: Option<EnrichmentSummary>,
    comparison: Option<&[BacklinkRecord]>,
) -> AnalysisReport {
    let enriched = records.iter().any(|r| r.is_enriched());
    let has_quality = records.iter().any(|r| r.quality.is_some());

    AnalysisReport {
        provider,
        target: target.to_string(),
        total_backlinks: records.len(),
        yearly: yearly_distribution(records),
        rating_distribution: rating_distribution(records, rating_bands(provider)),
        tier2_link_distribution: enriched.then(|| tier2_link_distribution(records)),
        tier2_refdomain_distribution: enriched.then(|| tier2_refdomain_distribution(records)),
        extremal: extremal_metrics(records),
        link_kinds: link_kind_counts(records),
        quality: has_quality.then(|| quality_summary(records)),
        rank_distribution: rank_distribution(records),
        spam_distribution: spam_distribution(records),
        keyword_visibility: keyword_visibility(records),
        overlap: comparison.map(|ours| domain_overlap(records, ours)),
        enrichment,
    }
}
