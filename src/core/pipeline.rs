use crate::core::aggregate::analyze;
use crate::core::enrichment::{EnrichmentProgress, Tier2Enricher};
use crate::core::export::records_to_csv;
use crate::core::fetcher::BulkFetcher;
use crate::domain::ports::{BacklinkProvider, ConfigProvider, Pipeline, Storage};
use crate::domain::report::{ExtractResult, TransformResult};
use crate::utils::error::{BacklinkError, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub const EXPORT_STEP: &str = "Export";
pub const COMPARISON_FETCH_STEP: &str = "Comparison fetch";

/// Fetch, enrich, aggregate and export one target's backlinks.
pub struct BacklinkPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    provider: Arc<dyn BacklinkProvider>,
    progress: Option<UnboundedSender<EnrichmentProgress>>,
}

impl<S: Storage, C: ConfigProvider> BacklinkPipeline<S, C> {
    pub fn new(storage: S, config: C, provider: Arc<dyn BacklinkProvider>) -> Self {
        Self {
            storage,
            config,
            provider,
            progress: None,
        }
    }

    /// Reports tier-2 progress on `sender`, one event per enriched URL.
    pub fn with_progress(mut self, sender: UnboundedSender<EnrichmentProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    fn file_stamp() -> String {
        chrono::Local::now().format("%Y%m%d_%H%M").to_string()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BacklinkPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractResult> {
        let options = self.config.query();
        let fetcher = BulkFetcher::new(self.provider.clone());
        let mut records = fetcher.fetch(options).await?;

        let enrichment = if options.enrich_tier2 && !records.is_empty() {
            let enricher = Tier2Enricher::new(self.provider.clone(), self.config.workers());
            Some(enricher.enrich(&mut records, self.progress.as_ref()).await)
        } else {
            None
        };

        let comparison = match self.config.compare_with() {
            Some(ours) => {
                tracing::info!("Fetching backlinks of {} for comparison", ours);
                let mut compare_options = options.clone().with_tier2(false);
                compare_options.target = ours.to_string();
                let ours = fetcher
                    .fetch(&compare_options)
                    .await
                    .map_err(|e| BacklinkError::step(COMPARISON_FETCH_STEP, e))?;
                Some(ours)
            }
            None => None,
        };

        Ok(ExtractResult {
            records,
            enrichment,
            comparison,
        })
    }

    async fn transform(&self, data: ExtractResult) -> Result<TransformResult> {
        let report = analyze(
            self.provider.kind(),
            &self.config.query().target,
            &data.records,
            data.enrichment,
            data.comparison.as_deref(),
        );
        tracing::debug!(
            "Aggregated {} backlinks into {} yearly rows",
            report.total_backlinks,
            report.yearly.len()
        );

        let csv_output =
            records_to_csv(&data.records).map_err(|e| BacklinkError::step(EXPORT_STEP, e))?;

        Ok(TransformResult {
            records: data.records,
            report,
            csv_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let stamp = Self::file_stamp();
        let csv_name = format!("backlinks_{}.csv", stamp);
        let summary_name = format!("summary_{}.json", stamp);

        tracing::debug!(
            "Writing {} ({} bytes) and {}",
            csv_name,
            result.csv_output.len(),
            summary_name
        );

        self.storage
            .write_file(&csv_name, result.csv_output.as_bytes())
            .await
            .map_err(|e| BacklinkError::step(EXPORT_STEP, e))?;

        let summary = serde_json::to_vec_pretty(&result.report)?;
        self.storage
            .write_file(&summary_name, &summary)
            .await
            .map_err(|e| BacklinkError::step(EXPORT_STEP, e))?;

        Ok(format!("{}/{}", self.config.output_path(), csv_name))
    }
}
