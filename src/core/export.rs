use crate::domain::model::BacklinkRecord;
use crate::utils::error::{BacklinkError, Result};
use serde::Serialize;

pub const CSV_HEADER: [&str; 12] = [
    "source_url",
    "source_rating",
    "first_seen",
    "link_kind",
    "tier2_link_count",
    "tier2_referring_domain_count",
    "tier2_degraded",
    "domain_from",
    "rank",
    "spam_score",
    "dofollow",
    "anchor",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    source_url: &'a str,
    source_rating: f64,
    first_seen: String,
    link_kind: &'a str,
    tier2_link_count: Option<u64>,
    tier2_referring_domain_count: Option<u64>,
    tier2_degraded: Option<bool>,
    domain_from: Option<&'a str>,
    rank: Option<f64>,
    spam_score: Option<f64>,
    dofollow: Option<bool>,
    anchor: Option<&'a str>,
}

impl<'a> From<&'a BacklinkRecord> for CsvRow<'a> {
    fn from(record: &'a BacklinkRecord) -> Self {
        let quality = record.quality.as_ref();
        Self {
            source_url: &record.source_url,
            source_rating: record.source_rating,
            first_seen: record.first_seen.to_rfc3339(),
            link_kind: record.link_kind.as_str(),
            tier2_link_count: record.tier2_link_count,
            tier2_referring_domain_count: record.tier2_referring_domain_count,
            tier2_degraded: record.is_enriched().then_some(record.tier2_degraded),
            domain_from: quality.and_then(|q| q.domain_from.as_deref()),
            rank: quality.map(|q| q.rank),
            spam_score: quality.map(|q| q.spam_score),
            dofollow: quality.map(|q| q.dofollow),
            anchor: quality.and_then(|q| q.anchor.as_deref()),
        }
    }
}

/// Comma-separated UTF-8 with a header row, even for an empty set. Absent
/// values are written as empty fields.
pub fn records_to_csv(records: &[BacklinkRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| BacklinkError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| BacklinkError::parse("CSV export", e))
}
