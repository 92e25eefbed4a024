use crate::domain::model::{BacklinkRecord, QueryOptions};
use crate::domain::ports::BacklinkProvider;
use crate::utils::error::{BacklinkError, Result};
use crate::utils::validation::Validate;
use std::sync::Arc;

pub const BULK_FETCH_STEP: &str = "Bulk backlink fetch";

/// Retrieves the primary backlink list for a target in a single provider call.
pub struct BulkFetcher {
    provider: Arc<dyn BacklinkProvider>,
}

impl BulkFetcher {
    pub fn new(provider: Arc<dyn BacklinkProvider>) -> Self {
        Self { provider }
    }

    /// Fails as a whole on any provider error; never returns more than `options.limit` records.
    pub async fn fetch(&self, options: &QueryOptions) -> Result<Vec<BacklinkRecord>> {
        options.validate()?;

        tracing::info!(
            "🔎 Fetching up to {} backlinks for {} from {} (mode={}, aggregation={})",
            options.limit,
            options.target,
            self.provider.kind(),
            options.match_mode,
            options.aggregation_mode
        );

        let mut records = self
            .provider
            .fetch_backlinks(options)
            .await
            .map_err(|e| BacklinkError::step(BULK_FETCH_STEP, e))?;

        let limit = options.limit as usize;
        if records.len() > limit {
            tracing::warn!(
                "Provider returned {} records for a limit of {}, truncating",
                records.len(),
                limit
            );
            records.truncate(limit);
        }

        if records.is_empty() {
            tracing::info!("No backlinks found for {}", options.target);
        }

        Ok(records)
    }
}
