use crate::domain::model::{BacklinkRecord, ProviderKind, QueryOptions, Tier2Stats};
use crate::domain::report::{ExtractResult, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn query(&self) -> &QueryOptions;
    fn output_path(&self) -> &str;
    fn workers(&self) -> usize;
    fn compare_with(&self) -> Option<&str>;
}

/// A third-party backlink index.
#[async_trait]
pub trait BacklinkProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// One bulk query for the target's backlinks. An empty index answer is `Ok(vec![])`.
    async fn fetch_backlinks(&self, options: &QueryOptions) -> Result<Vec<BacklinkRecord>>;

    /// Live backlink and referring-domain counts for a single referring URL.
    async fn fetch_tier2_stats(&self, url: &str) -> Result<Tier2Stats>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractResult>;
    async fn transform(&self, data: ExtractResult) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
