pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::Settings, RunConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{
    enrichment::{EnrichmentProgress, Tier2Enricher},
    etl::{AnalysisEngine, AnalysisOutcome},
    fetcher::BulkFetcher,
    pipeline::BacklinkPipeline,
};
pub use domain::model::{BacklinkRecord, ProviderKind, QueryOptions, Tier2Stats};
pub use domain::report::AnalysisReport;
pub use utils::error::{BacklinkError, Result};
