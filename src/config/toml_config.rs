use crate::adapters::{ahrefs, dataforseo, AhrefsProvider, DataForSeoProvider};
use crate::core::cache::ResponseCache;
use crate::core::executor::{Auth, HttpExecutor};
use crate::core::rate_limiter::RateLimiter;
use crate::core::retry::RetryPolicy;
use crate::domain::model::ProviderKind;
use crate::domain::ports::BacklinkProvider;
use crate::utils::error::{BacklinkError, Result};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const AHREFS_API_KEY_ENV: &str = "AHREFS_API_KEY";
pub const DATAFORSEO_LOGIN_ENV: &str = "DATAFORSEO_LOGIN";
pub const DATAFORSEO_API_KEY_ENV: &str = "DATAFORSEO_API_KEY";

/// Optional settings file. Every section and key may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub enrichment: EnrichmentSettings,
    pub credentials: CredentialSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub ahrefs_base_url: String,
    pub dataforseo_base_url: String,
    pub timeout_seconds: u64,
    pub requests_per_second: usize,
    pub retry_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub cache_ttl_seconds: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            ahrefs_base_url: ahrefs::DEFAULT_BASE_URL.to_string(),
            dataforseo_base_url: dataforseo::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: HttpExecutor::DEFAULT_TIMEOUT.as_secs(),
            requests_per_second: RateLimiter::DEFAULT_REQUESTS_PER_SECOND,
            retry_attempts: retry.max_attempts,
            retry_base_delay_ms: retry.base_delay.as_millis() as u64,
            retry_max_delay_ms: retry.max_delay.as_millis() as u64,
            cache_ttl_seconds: ResponseCache::DEFAULT_TTL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub workers: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            workers: crate::core::enrichment::Tier2Enricher::DEFAULT_WORKERS,
        }
    }
}

/// Values left as an unresolved `${VAR}` count as unset.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub ahrefs_api_key: Option<String>,
    pub dataforseo_login: Option<String>,
    pub dataforseo_api_key: Option<String>,
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "***" } else { "<unset>" };
        f.debug_struct("CredentialSettings")
            .field("ahrefs_api_key", &mask(&self.ahrefs_api_key))
            .field("dataforseo_login", &self.dataforseo_login)
            .field("dataforseo_api_key", &mask(&self.dataforseo_api_key))
            .finish()
    }
}

impl CredentialSettings {
    fn resolve(value: &Option<String>, env_var: &str) -> Result<String> {
        value
            .as_ref()
            .filter(|v| !v.trim().is_empty() && !v.starts_with("${"))
            .cloned()
            .or_else(|| std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| BacklinkError::MissingConfigError {
                field: env_var.to_string(),
            })
    }

    pub fn ahrefs_auth(&self) -> Result<Auth> {
        Ok(Auth::Bearer(Self::resolve(
            &self.ahrefs_api_key,
            AHREFS_API_KEY_ENV,
        )?))
    }

    pub fn dataforseo_auth(&self) -> Result<Auth> {
        Ok(Auth::Basic {
            login: Self::resolve(&self.dataforseo_login, DATAFORSEO_LOGIN_ENV)?,
            password: Self::resolve(&self.dataforseo_api_key, DATAFORSEO_API_KEY_ENV)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BacklinkError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BacklinkError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are kept verbatim.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BacklinkError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.http.retry_attempts,
            Duration::from_millis(self.http.retry_base_delay_ms),
            Duration::from_millis(self.http.retry_max_delay_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.http.cache_ttl_seconds)
    }

    /// Builds a provider with its own limiter and cache, authenticated from
    /// `[credentials]` or the environment.
    pub fn build_provider(&self, kind: ProviderKind) -> Result<Arc<dyn BacklinkProvider>> {
        let limiter = Arc::new(RateLimiter::new(self.http.requests_per_second));
        let cache = Arc::new(ResponseCache::new(self.cache_ttl()));

        let provider: Arc<dyn BacklinkProvider> = match kind {
            ProviderKind::Ahrefs => {
                let executor = HttpExecutor::with_timeout(
                    self.http.ahrefs_base_url.as_str(),
                    self.credentials.ahrefs_auth()?,
                    limiter,
                    cache,
                    self.retry_policy(),
                    self.timeout(),
                )?;
                Arc::new(AhrefsProvider::new(executor))
            }
            ProviderKind::DataForSeo => {
                let executor = HttpExecutor::with_timeout(
                    self.http.dataforseo_base_url.as_str(),
                    self.credentials.dataforseo_auth()?,
                    limiter,
                    cache,
                    self.retry_policy(),
                    self.timeout(),
                )?;
                Arc::new(DataForSeoProvider::new(executor))
            }
        };

        tracing::debug!(
            "Built {} provider ({} req/s, {} attempts, cache TTL {}s)",
            kind,
            self.http.requests_per_second,
            self.http.retry_attempts,
            self.http.cache_ttl_seconds
        );
        Ok(provider)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("http.ahrefs_base_url", &self.http.ahrefs_base_url)?;
        validate_url("http.dataforseo_base_url", &self.http.dataforseo_base_url)?;
        validate_positive_number("http.requests_per_second", self.http.requests_per_second, 1)?;
        validate_positive_number("http.retry_attempts", self.http.retry_attempts, 1)?;
        validate_positive_number("http.timeout_seconds", self.http.timeout_seconds as usize, 1)?;
        validate_positive_number("enrichment.workers", self.enrichment.workers, 1)?;
        validate_path("output.path", &self.output.path)?;

        if self.http.retry_base_delay_ms > self.http.retry_max_delay_ms {
            return Err(BacklinkError::ConfigValidationError {
                field: "http.retry_base_delay_ms".to_string(),
                message: "Base delay must not exceed retry_max_delay_ms".to_string(),
            });
        }
        Ok(())
    }
}
