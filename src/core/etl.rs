use crate::domain::ports::Pipeline;
use crate::domain::report::AnalysisReport;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub output_path: String,
    pub report: AnalysisReport,
}

/// Drives a pipeline through extract, transform and load.
pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<AnalysisOutcome> {
        tracing::info!("Starting backlink analysis...");

        tracing::info!("Extracting backlinks...");
        let extracted = self.pipeline.extract().await?;
        tracing::info!("Extracted {} backlinks", extracted.records.len());
        if let Some(enrichment) = &extracted.enrichment {
            if !enrichment.degraded_urls.is_empty() {
                tracing::warn!(
                    "⚠️ {} of {} tier-2 lookups degraded to 0/0",
                    enrichment.degraded_urls.len(),
                    enrichment.total
                );
            }
        }

        tracing::info!("Aggregating...");
        let transformed = self.pipeline.transform(extracted).await?;
        let report = transformed.report.clone();

        tracing::info!("Exporting...");
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(AnalysisOutcome {
            output_path,
            report,
        })
    }
}
