pub mod aggregate;
pub mod cache;
pub mod enrichment;
pub mod etl;
pub mod executor;
pub mod export;
pub mod fetcher;
pub mod pipeline;
pub mod rate_limiter;
pub mod retry;

pub use crate::domain::model::{BacklinkRecord, QueryOptions};
pub use crate::domain::ports::{BacklinkProvider, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
