use crate::adapters::encode_target;
use crate::core::executor::HttpExecutor;
use crate::domain::model::{
    parse_timestamp, AggregationMode, BacklinkRecord, LinkKind, ProviderKind, QueryOptions,
    Tier2Stats,
};
use crate::domain::ports::BacklinkProvider;
use crate::utils::error::{BacklinkError, Result};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.ahrefs.com";
const ALL_BACKLINKS_PATH: &str = "/v3/site-explorer/all-backlinks";
const BACKLINKS_STATS_PATH: &str = "/v3/site-explorer/backlinks-stats";
const SELECT_FIELDS: &str = "domain_rating_source,url_from,first_seen,link_type";

#[derive(Debug, Deserialize)]
struct AllBacklinksResponse {
    backlinks: Vec<AhrefsBacklink>,
}

#[derive(Debug, Deserialize)]
struct AhrefsBacklink {
    url_from: String,
    domain_rating_source: f64,
    first_seen: String,
    link_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BacklinksStatsResponse {
    #[serde(default)]
    metrics: StatsMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct StatsMetrics {
    #[serde(default)]
    live: u64,
    #[serde(default)]
    live_refdomains: u64,
}

/// Ahrefs Site Explorer v3, bearer-token authenticated.
pub struct AhrefsProvider {
    executor: HttpExecutor,
}

impl AhrefsProvider {
    pub fn new(executor: HttpExecutor) -> Self {
        Self { executor }
    }

    fn aggregation_param(mode: AggregationMode) -> &'static str {
        match mode {
            AggregationMode::All => "all",
            AggregationMode::SimilarLinks => "similar_links",
            AggregationMode::OnePerDomain => "1_per_domain",
        }
    }

    pub fn bulk_endpoint(options: &QueryOptions) -> String {
        format!(
            "{}?limit={}&select={}&target={}&mode={}&history=live&aggregation={}",
            ALL_BACKLINKS_PATH,
            options.limit,
            SELECT_FIELDS,
            encode_target(&options.target),
            options.match_mode.as_str(),
            Self::aggregation_param(options.aggregation_mode)
        )
    }

    pub fn stats_endpoint(url: &str, date: &str) -> String {
        format!(
            "{}?target={}&mode=exact&date={}",
            BACKLINKS_STATS_PATH,
            encode_target(url),
            date
        )
    }
}

#[async_trait]
impl BacklinkProvider for AhrefsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ahrefs
    }

    async fn fetch_backlinks(&self, options: &QueryOptions) -> Result<Vec<BacklinkRecord>> {
        let endpoint = Self::bulk_endpoint(options);
        tracing::debug!("Ahrefs bulk endpoint: {}", endpoint);

        let value = self.executor.get_json("ahrefs.all_backlinks", &endpoint).await?;
        let response: AllBacklinksResponse = serde_json::from_value(value)
            .map_err(|e| BacklinkError::parse("Ahrefs all-backlinks response", e))?;

        tracing::info!("Ahrefs returned {} backlinks", response.backlinks.len());

        response
            .backlinks
            .into_iter()
            .map(|item| {
                let first_seen = parse_timestamp(&item.first_seen).ok_or_else(|| {
                    BacklinkError::parse(
                        format!("first_seen of {}", item.url_from),
                        format!("unrecognised timestamp '{}'", item.first_seen),
                    )
                })?;
                let kind = item
                    .link_type
                    .map(LinkKind::from)
                    .unwrap_or_else(|| LinkKind::Other("unknown".to_string()));
                BacklinkRecord::new(
                    ProviderKind::Ahrefs,
                    item.url_from,
                    item.domain_rating_source,
                    first_seen,
                    kind,
                )
            })
            .collect()
    }

    async fn fetch_tier2_stats(&self, url: &str) -> Result<Tier2Stats> {
        let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let endpoint = Self::stats_endpoint(url, &date);

        let value = self
            .executor
            .get_json("ahrefs.backlinks_stats", &endpoint)
            .await?;
        let stats: BacklinksStatsResponse = serde_json::from_value(value)
            .map_err(|e| BacklinkError::parse("Ahrefs backlinks-stats response", e))?;

        Ok(Tier2Stats {
            live_links: stats.metrics.live,
            live_referring_domains: stats.metrics.live_refdomains,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::ResponseCache;
    use crate::core::executor::Auth;
    use crate::core::rate_limiter::RateLimiter;
    use crate::core::retry::RetryPolicy;
    use crate::domain::model::MatchMode;
    use httpmock::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn provider(server: &MockServer) -> AhrefsProvider {
        let executor = HttpExecutor::new(
            server.base_url(),
            Auth::Bearer("test-key".to_string()),
            Arc::new(RateLimiter::new(50)),
            Arc::new(ResponseCache::default()),
            RetryPolicy::new(2, Duration::from_millis(2), Duration::from_millis(4)),
        )
        .unwrap();
        AhrefsProvider::new(executor)
    }

    #[test]
    fn test_bulk_endpoint_encodes_target_and_options() {
        let options = QueryOptions::new("https://example.com/")
            .with_limit(250)
            .with_match_mode(MatchMode::Prefix)
            .with_aggregation_mode(AggregationMode::OnePerDomain);

        assert_eq!(
            AhrefsProvider::bulk_endpoint(&options),
            "/v3/site-explorer/all-backlinks?limit=250\
             &select=domain_rating_source,url_from,first_seen,link_type\
             &target=https%3A%2F%2Fexample.com%2F&mode=prefix&history=live&aggregation=1_per_domain"
        );
    }

    #[test]
    fn test_stats_endpoint_uses_exact_mode() {
        assert_eq!(
            AhrefsProvider::stats_endpoint("https://blog.a.com/post", "2024-05-01"),
            "/v3/site-explorer/backlinks-stats?target=https%3A%2F%2Fblog.a.com%2Fpost\
             &mode=exact&date=2024-05-01"
        );
    }

    #[tokio::test]
    async fn test_fetch_backlinks_parses_records() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v3/site-explorer/all-backlinks")
                .query_param("target", "https://example.com")
                .query_param("history", "live")
                .header("authorization", "Bearer test-key");
            then.status(200).json_body(serde_json::json!({
                "backlinks": [
                    {"url_from": "https://a.com/x", "domain_rating_source": 71.0,
                     "first_seen": "2021-02-03T04:05:06Z", "link_type": "href"},
                    {"url_from": "https://b.com/y", "domain_rating_source": 12.5,
                     "first_seen": "2019-12-31T23:59:59Z", "link_type": "redirect"}
                ]
            }));
        });

        let records = provider(&server)
            .fetch_backlinks(&QueryOptions::new("https://example.com"))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_url, "https://a.com/x");
        assert_eq!(records[0].link_kind, LinkKind::Text);
        assert_eq!(records[1].link_kind, LinkKind::Redirect);
        assert_eq!(records[1].tier2_link_count, None);
    }

    #[tokio::test]
    async fn test_missing_backlinks_key_is_parse_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v3/site-explorer/all-backlinks");
            then.status(200).json_body(serde_json::json!({"error": "nope"}));
        });

        let result = provider(&server)
            .fetch_backlinks(&QueryOptions::new("example.com"))
            .await;
        assert!(matches!(result, Err(BacklinkError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_tier2_stats_reads_live_metrics() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v3/site-explorer/backlinks-stats")
                .query_param("target", "https://a.com/x")
                .query_param("mode", "exact")
                .query_param_exists("date");
            then.status(200).json_body(serde_json::json!({
                "metrics": {"live": 42, "live_refdomains": 7, "all_time": 100}
            }));
        });

        let stats = provider(&server)
            .fetch_tier2_stats("https://a.com/x")
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(
            stats,
            Tier2Stats {
                live_links: 42,
                live_referring_domains: 7
            }
        );
    }

    #[tokio::test]
    async fn test_tier2_stats_missing_metrics_default_to_zero() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v3/site-explorer/backlinks-stats");
            then.status(200).json_body(serde_json::json!({}));
        });

        let stats = provider(&server).fetch_tier2_stats("https://a.com").await.unwrap();
        assert_eq!(stats, Tier2Stats::zero());
    }
}
