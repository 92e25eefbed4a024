pub mod cli;
pub mod toml_config;

use crate::domain::model::{AggregationMode, MatchMode, ProviderKind, QueryOptions};
use crate::domain::ports::{BacklinkProvider, ConfigProvider};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_positive_number, Validate};
use std::sync::Arc;
use toml_config::Settings;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Fully resolved settings for one analysis run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub provider: ProviderKind,
    pub query: QueryOptions,
    pub compare_with: Option<String>,
    pub output_path: String,
    pub workers: usize,
    pub settings: Settings,
}

impl RunConfig {
    pub fn new(provider: ProviderKind, query: QueryOptions, settings: Settings) -> Self {
        Self {
            provider,
            query,
            compare_with: None,
            output_path: settings.output.path.clone(),
            workers: settings.enrichment.workers,
            settings,
        }
    }

    pub fn build_provider(&self) -> Result<Arc<dyn BacklinkProvider>> {
        self.settings.build_provider(self.provider)
    }
}

impl ConfigProvider for RunConfig {
    fn query(&self) -> &QueryOptions {
        &self.query
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn compare_with(&self) -> Option<&str> {
        self.compare_with.as_deref()
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        self.query.validate()?;
        self.settings.validate()?;
        validate_path("output_path", &self.output_path)?;
        validate_positive_number("workers", self.workers, 1)?;
        if let Some(ours) = &self.compare_with {
            validate_non_empty_string("compare_with", ours)?;
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "backlink-scope")]
#[command(about = "Fetch, enrich and summarise the backlinks of a target URL")]
pub struct CliConfig {
    #[arg(long, help = "Domain or URL to analyse")]
    pub target: String,

    #[arg(long, default_value = "ahrefs", help = "Backlink index: ahrefs or dataforseo")]
    pub provider: ProviderKind,

    #[arg(long, default_value = "100", help = "Maximum backlinks to fetch (10-1000)")]
    pub limit: u32,

    #[arg(long, default_value = "subdomains", help = "subdomains, exact, prefix or domain")]
    pub mode: MatchMode,

    #[arg(long, default_value = "all", help = "all, similar_links or one_per_domain")]
    pub aggregation: AggregationMode,

    #[arg(long, help = "Look up live tier-2 counts for every referring URL")]
    pub tier2: bool,

    #[arg(long, help = "Our own domain, to compare backlink overlap against")]
    pub compare_with: Option<String>,

    #[arg(long, help = "Directory for the CSV and summary files [default: ./output]")]
    pub output_path: Option<String>,

    #[arg(long, help = "Concurrent tier-2 lookups [default: 5]")]
    pub workers: Option<usize>,

    #[arg(long, help = "Outbound request cap per second [default: 5]")]
    pub requests_per_second: Option<usize>,

    #[arg(long, help = "TOML settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the settings file, if any, and lets command-line flags override it.
    pub fn resolve(&self) -> Result<RunConfig> {
        let mut settings = match &self.config {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Settings::from_file(path)?
            }
            None => Settings::default(),
        };

        if let Some(rps) = self.requests_per_second {
            settings.http.requests_per_second = rps;
        }
        if let Some(workers) = self.workers {
            settings.enrichment.workers = workers;
        }
        if let Some(path) = &self.output_path {
            settings.output.path = path.clone();
        }

        let query = QueryOptions::new(self.target.clone())
            .with_limit(self.limit)
            .with_match_mode(self.mode)
            .with_aggregation_mode(self.aggregation)
            .with_tier2(self.tier2);

        let mut run = RunConfig::new(self.provider, query, settings);
        run.compare_with = self.compare_with.clone();
        Ok(run)
    }
}
