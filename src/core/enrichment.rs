//! Tier-2 enrichment: per-referring-URL statistics fetched over a bounded pool.

use crate::domain::model::{BacklinkRecord, Tier2Stats};
use crate::domain::ports::BacklinkProvider;
use crate::domain::report::EnrichmentSummary;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Emitted once per URL, in completion order. `completed` grows by exactly one each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentProgress {
    pub completed: usize,
    pub total: usize,
    pub url: String,
    pub degraded: bool,
}

impl EnrichmentProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

pub struct Tier2Enricher {
    provider: Arc<dyn BacklinkProvider>,
    workers: usize,
}

impl Tier2Enricher {
    pub const DEFAULT_WORKERS: usize = 5;

    pub fn new(provider: Arc<dyn BacklinkProvider>, workers: usize) -> Self {
        Self {
            provider,
            workers: workers.max(1),
        }
    }

    /// Looks up every URL with at most `workers` lookups in flight. Output is
    /// index-aligned with `urls`. A failed lookup yields zero/zero and is listed
    /// in the summary; it never aborts the batch.
    pub async fn fetch_all(
        &self,
        urls: &[String],
        progress: Option<&UnboundedSender<EnrichmentProgress>>,
    ) -> (Vec<Tier2Stats>, EnrichmentSummary) {
        let (lookups, summary) = self.lookup_all(urls, progress).await;
        let stats = lookups
            .into_iter()
            .map(|stats| stats.unwrap_or_else(Tier2Stats::zero))
            .collect();
        (stats, summary)
    }

    /// Index-aligned lookups; `None` marks a failed URL.
    async fn lookup_all(
        &self,
        urls: &[String],
        progress: Option<&UnboundedSender<EnrichmentProgress>>,
    ) -> (Vec<Option<Tier2Stats>>, EnrichmentSummary) {
        let total = urls.len();
        let mut results: Vec<Option<Tier2Stats>> = vec![None; total];
        let mut failed = vec![false; total];

        tracing::info!(
            "🔗 Starting tier-2 analysis of {} URLs with {} workers",
            total,
            self.workers
        );

        // Each lookup owns its URL and provider handle so the stream stays Send.
        let mut lookups = stream::iter(urls.iter().cloned().enumerate())
            .map(|(index, url)| {
                let provider = Arc::clone(&self.provider);
                async move { (index, provider.fetch_tier2_stats(&url).await) }
            })
            .buffer_unordered(self.workers);

        let mut completed = 0;
        while let Some((index, outcome)) = lookups.next().await {
            completed += 1;
            match outcome {
                Ok(stats) => results[index] = Some(stats),
                Err(e) => {
                    tracing::warn!(
                        "Tier-2 lookup failed for {}, recording 0/0: {}",
                        urls[index],
                        e
                    );
                    failed[index] = true;
                }
            }

            tracing::debug!("Tier-2 progress {}/{}", completed, total);
            if let Some(tx) = progress {
                // A dropped receiver only means nobody is watching.
                let _ = tx.send(EnrichmentProgress {
                    completed,
                    total,
                    url: urls[index].clone(),
                    degraded: failed[index],
                });
            }
        }

        let degraded_urls: Vec<String> = urls
            .iter()
            .zip(&failed)
            .filter(|(_, failed)| **failed)
            .map(|(url, _)| url.clone())
            .collect();

        let summary = EnrichmentSummary {
            total,
            succeeded: total - degraded_urls.len(),
            degraded_urls,
        };
        tracing::info!(
            "✅ Tier-2 analysis finished: {}/{} succeeded",
            summary.succeeded,
            summary.total
        );

        (results, summary)
    }

    /// Attaches tier-2 counts to each record in place. Records whose lookup
    /// failed get zero counts and are flagged as degraded.
    pub async fn enrich(
        &self,
        records: &mut [BacklinkRecord],
        progress: Option<&UnboundedSender<EnrichmentProgress>>,
    ) -> EnrichmentSummary {
        let urls: Vec<String> = records.iter().map(|r| r.source_url.clone()).collect();
        let (lookups, summary) = self.lookup_all(&urls, progress).await;
        for (record, stats) in records.iter_mut().zip(lookups) {
            match stats {
                Some(stats) => record.apply_tier2(stats),
                None => record.mark_tier2_degraded(),
            }
        }
        summary
    }
}
