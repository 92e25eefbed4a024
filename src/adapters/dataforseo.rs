use crate::core::executor::HttpExecutor;
use crate::domain::model::{
    parse_timestamp, AggregationMode, BacklinkRecord, LinkKind, LinkQuality, MatchMode,
    ProviderKind, QueryOptions, Tier2Stats,
};
use crate::domain::ports::BacklinkProvider;
use crate::utils::error::{BacklinkError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://api.dataforseo.com";
const BACKLINKS_PATH: &str = "/v3/backlinks/backlinks/live";
const SUMMARY_PATH: &str = "/v3/backlinks/summary/live";
const STATUS_OK: i64 = 20000;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Envelope<T> {
    status_code: i64,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    tasks: Vec<Task<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Task<T> {
    status_code: i64,
    #[serde(default)]
    status_message: String,
    result: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct BacklinksResult {
    items: Option<Vec<DataForSeoItem>>,
}

/// Quality counters may come back as `null`; those read as zero.
#[derive(Debug, Deserialize)]
struct DataForSeoItem {
    url_from: String,
    domain_from: Option<String>,
    #[serde(default)]
    rank: Option<f64>,
    #[serde(default)]
    domain_from_rank: Option<f64>,
    #[serde(default)]
    backlink_spam_score: Option<f64>,
    #[serde(default)]
    dofollow: Option<bool>,
    #[serde(default)]
    is_broken: Option<bool>,
    #[serde(default)]
    is_indirect_link: Option<bool>,
    first_seen: String,
    item_type: Option<String>,
    anchor: Option<String>,
    ranked_keywords_info: Option<RankedKeywordsInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct RankedKeywordsInfo {
    #[serde(default)]
    page_from_keywords_count_top_3: Option<u64>,
    #[serde(default)]
    page_from_keywords_count_top_10: Option<u64>,
    #[serde(default)]
    page_from_keywords_count_top_100: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    #[serde(default)]
    backlinks: Option<u64>,
    #[serde(default)]
    referring_domains: Option<u64>,
}

/// DataForSeo Backlinks API (live endpoints), basic-auth authenticated.
pub struct DataForSeoProvider {
    executor: HttpExecutor,
}

impl DataForSeoProvider {
    pub fn new(executor: HttpExecutor) -> Self {
        Self { executor }
    }

    fn mode_param(mode: AggregationMode) -> &'static str {
        match mode {
            AggregationMode::All => "as_is",
            AggregationMode::SimilarLinks => "one_per_anchor",
            AggregationMode::OnePerDomain => "one_per_domain",
        }
    }

    pub fn bulk_payload(options: &QueryOptions) -> serde_json::Value {
        json!([{
            "target": options.target.trim(),
            "limit": options.limit,
            "internal_list_limit": 10,
            "backlinks_status_type": "live",
            "include_subdomains": options.match_mode == MatchMode::Subdomains,
            "exclude_internal_backlinks": true,
            "include_indirect_links": true,
            "mode": Self::mode_param(options.aggregation_mode)
        }])
    }

    /// Unwraps the task envelope, turning any non-20000 status into a rejection.
    fn first_result<T: DeserializeOwned>(value: serde_json::Value, context: &str) -> Result<Option<T>> {
        let envelope: Envelope<T> =
            serde_json::from_value(value).map_err(|e| BacklinkError::parse(context, e))?;

        if envelope.status_code != STATUS_OK {
            return Err(BacklinkError::ProviderRejected {
                code: envelope.status_code,
                message: envelope.status_message,
            });
        }

        let Some(task) = envelope.tasks.into_iter().next() else {
            return Err(BacklinkError::parse(context, "response contains no task"));
        };
        if task.status_code != STATUS_OK {
            return Err(BacklinkError::ProviderRejected {
                code: task.status_code,
                message: task.status_message,
            });
        }

        Ok(task.result.and_then(|results| results.into_iter().next()))
    }

    fn into_record(item: DataForSeoItem) -> Result<BacklinkRecord> {
        let first_seen = parse_timestamp(&item.first_seen).ok_or_else(|| {
            BacklinkError::parse(
                format!("first_seen of {}", item.url_from),
                format!("unrecognised timestamp '{}'", item.first_seen),
            )
        })?;
        let keywords = item.ranked_keywords_info.unwrap_or_default();
        let quality = LinkQuality {
            domain_from: item.domain_from,
            rank: item.rank.unwrap_or_default(),
            spam_score: item.backlink_spam_score.unwrap_or_default(),
            dofollow: item.dofollow.unwrap_or_default(),
            is_broken: item.is_broken.unwrap_or_default(),
            is_indirect: item.is_indirect_link.unwrap_or_default(),
            anchor: item.anchor,
            keywords_top_3: keywords.page_from_keywords_count_top_3.unwrap_or_default(),
            keywords_top_10: keywords.page_from_keywords_count_top_10.unwrap_or_default(),
            keywords_top_100: keywords.page_from_keywords_count_top_100.unwrap_or_default(),
        };
        let kind = item
            .item_type
            .map(LinkKind::from)
            .unwrap_or_else(|| LinkKind::Other("unknown".to_string()));

        Ok(BacklinkRecord::new(
            ProviderKind::DataForSeo,
            item.url_from,
            item.domain_from_rank.unwrap_or_default(),
            first_seen,
            kind,
        )?
        .with_quality(quality))
    }
}

#[async_trait]
impl BacklinkProvider for DataForSeoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DataForSeo
    }

    async fn fetch_backlinks(&self, options: &QueryOptions) -> Result<Vec<BacklinkRecord>> {
        let payload = Self::bulk_payload(options);
        let value = self
            .executor
            .post_json("dataforseo.backlinks", BACKLINKS_PATH, &payload)
            .await?;

        let result: Option<BacklinksResult> =
            Self::first_result(value, "DataForSeo backlinks response")?;
        let items = result.and_then(|r| r.items).unwrap_or_default();
        tracing::info!("DataForSeo returned {} backlinks", items.len());

        items.into_iter().map(Self::into_record).collect()
    }

    async fn fetch_tier2_stats(&self, url: &str) -> Result<Tier2Stats> {
        let payload = json!([{ "target": url.trim(), "include_subdomains": false }]);
        let value = self
            .executor
            .post_json("dataforseo.summary", SUMMARY_PATH, &payload)
            .await?;

        let summary: Option<SummaryResult> =
            Self::first_result(value, "DataForSeo summary response")?;
        Ok(summary
            .map(|s| Tier2Stats {
                live_links: s.backlinks.unwrap_or_default(),
                live_referring_domains: s.referring_domains.unwrap_or_default(),
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::ResponseCache;
    use crate::core::executor::Auth;
    use crate::core::rate_limiter::RateLimiter;
    use crate::core::retry::RetryPolicy;
    use httpmock::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn provider(server: &MockServer) -> DataForSeoProvider {
        let executor = HttpExecutor::new(
            server.base_url(),
            Auth::Basic {
                login: "login".to_string(),
                password: "secret".to_string(),
            },
            Arc::new(RateLimiter::new(50)),
            Arc::new(ResponseCache::default()),
            RetryPolicy::new(2, Duration::from_millis(2), Duration::from_millis(4)),
        )
        .unwrap();
        DataForSeoProvider::new(executor)
    }

    fn envelope(result: serde_json::Value) -> serde_json::Value {
        json!({
            "status_code": 20000,
            "status_message": "Ok.",
            "tasks": [{"status_code": 20000, "status_message": "Ok.", "result": [result]}]
        })
    }

    #[test]
    fn test_bulk_payload_shape() {
        let options = QueryOptions::new(" example.com ")
            .with_limit(50)
            .with_match_mode(MatchMode::Exact)
            .with_aggregation_mode(AggregationMode::OnePerDomain);
        let payload = DataForSeoProvider::bulk_payload(&options);

        assert_eq!(payload[0]["target"], "example.com");
        assert_eq!(payload[0]["limit"], 50);
        assert_eq!(payload[0]["include_subdomains"], false);
        assert_eq!(payload[0]["mode"], "one_per_domain");
        assert_eq!(payload[0]["backlinks_status_type"], "live");
    }

    #[tokio::test]
    async fn test_fetch_backlinks_maps_quality_fields() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v3/backlinks/backlinks/live")
                .header("authorization", "Basic bG9naW46c2VjcmV0")
                .body_contains("\"target\":\"example.com\"");
            then.status(200).json_body(envelope(json!({
                "items": [{
                    "url_from": "https://blog.a.com/post",
                    "domain_from": "blog.a.com",
                    "rank": 150,
                    "domain_from_rank": 320,
                    "backlink_spam_score": 12,
                    "dofollow": true,
                    "is_broken": false,
                    "is_indirect_link": false,
                    "first_seen": "2019-10-27 20:55:32 +00:00",
                    "item_type": "anchor",
                    "anchor": "great tool",
                    "ranked_keywords_info": {
                        "page_from_keywords_count_top_3": 1,
                        "page_from_keywords_count_top_10": 4,
                        "page_from_keywords_count_top_100": 9
                    }
                }]
            })));
        });

        let records = provider(&server)
            .fetch_backlinks(&QueryOptions::new("example.com"))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source_rating, 320.0);
        assert_eq!(record.link_kind, LinkKind::Text);
        let quality = record.quality.as_ref().unwrap();
        assert!(quality.dofollow);
        assert_eq!(quality.rank, 150.0);
        assert_eq!(quality.keywords_top_100, 9);
        assert_eq!(quality.domain_from.as_deref(), Some("blog.a.com"));
    }

    #[tokio::test]
    async fn test_null_quality_fields_read_as_zero() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v3/backlinks/backlinks/live");
            then.status(200).json_body(envelope(json!({
                "items": [
                    {
                        "url_from": "https://a.com/full",
                        "domain_from": "a.com",
                        "rank": 90,
                        "domain_from_rank": 200,
                        "backlink_spam_score": 3,
                        "dofollow": true,
                        "first_seen": "2020-01-01 00:00:00 +00:00",
                        "item_type": "anchor"
                    },
                    {
                        "url_from": "https://b.com/sparse",
                        "domain_from": "b.com",
                        "rank": null,
                        "domain_from_rank": null,
                        "backlink_spam_score": null,
                        "dofollow": null,
                        "is_broken": null,
                        "first_seen": "2021-06-01 00:00:00 +00:00",
                        "item_type": "anchor",
                        "ranked_keywords_info": {
                            "page_from_keywords_count_top_3": null,
                            "page_from_keywords_count_top_10": 2,
                            "page_from_keywords_count_top_100": null
                        }
                    }
                ]
            })));
        });

        let records = provider(&server)
            .fetch_backlinks(&QueryOptions::new("example.com"))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_rating, 200.0);
        let sparse = &records[1];
        assert_eq!(sparse.source_url, "https://b.com/sparse");
        assert_eq!(sparse.source_rating, 0.0);
        let quality = sparse.quality.as_ref().unwrap();
        assert_eq!(quality.rank, 0.0);
        assert_eq!(quality.spam_score, 0.0);
        assert!(!quality.dofollow);
        assert_eq!(quality.keywords_top_3, 0);
        assert_eq!(quality.keywords_top_10, 2);
    }

    #[tokio::test]
    async fn test_envelope_without_tasks_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v3/backlinks/summary/live");
            then.status(200)
                .json_body(json!({"status_code": 20000, "status_message": "Ok."}));
        });

        let result = provider(&server)
            .fetch_tier2_stats("https://blog.a.com/post")
            .await;

        match result {
            Err(BacklinkError::Parse { message, .. }) => assert!(message.contains("no task")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_items_is_empty_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v3/backlinks/backlinks/live");
            then.status(200)
                .json_body(envelope(json!({"total_count": 0, "items": null})));
        });

        let records = provider(&server)
            .fetch_backlinks(&QueryOptions::new("nobody.example"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_task_error_is_rejection_and_not_retried() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v3/backlinks/backlinks/live");
            then.status(200).json_body(json!({
                "status_code": 20000,
                "tasks": [{"status_code": 40501, "status_message": "Invalid Field: 'target'.", "result": null}]
            }));
        });

        let result = provider(&server)
            .fetch_backlinks(&QueryOptions::new("bad target"))
            .await;

        api_mock.assert_hits(1);
        match result {
            Err(BacklinkError::ProviderRejected { code, message }) => {
                assert_eq!(code, 40501);
                assert!(message.contains("target"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tier2_summary_counts() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v3/backlinks/summary/live")
                .body_contains("\"include_subdomains\":false");
            then.status(200)
                .json_body(envelope(json!({"backlinks": 88, "referring_domains": 13})));
        });

        let stats = provider(&server)
            .fetch_tier2_stats("https://blog.a.com/post")
            .await
            .unwrap();
        assert_eq!(stats.live_links, 88);
        assert_eq!(stats.live_referring_domains, 13);
    }
}
