pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub base_url: String,
    pub index_name: String,
    pub api_key: Option<String>,
}

impl SearchConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("SEARCH_URL")
            .map_err(|_| AppError::Config("SEARCH_URL is not set".to_string()))?;
        let index_name =
            env::var("COURSEWARE_INDEX_NAME").unwrap_or_else(|_| "courseware_index".to_string());
        let api_key = env::var("SEARCH_API_KEY").ok().filter(|k| !k.is_empty());

        Ok(Self {
            base_url,
            index_name,
            api_key,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recent start first.
    Newer,
    /// Earliest start first.
    Older,
}

impl SortOrder {
    /// `"newer"` or `"older"`; anything else means relevance order.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "newer" => Some(SortOrder::Newer),
            "older" => Some(SortOrder::Older),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub query_string: Option<String>,
    pub size: usize,
    pub from: usize,
    /// Course ids the engine must leave out.
    pub exclude_ids: Vec<String>,
    pub sort: Option<SortOrder>,
}

/// One ranked hit: the course id plus whatever the index stores for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: Option<f64>,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub took: u64,
    pub total: u64,
    pub max_score: Option<f64>,
    pub results: Vec<SearchHit>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults, AppError>;
}

pub struct HttpSearchClient {
    client: Client,
    config: SearchConfig,
}

impl HttpSearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/{}/_search",
            self.config.base_url.trim_end_matches('/'),
            self.config.index_name
        )
    }
}

/// Build the engine request body for `query`.
pub fn request_body(query: &SearchQuery) -> dto::SearchRequestBody {
    let must = match query.query_string.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => json!({
            "multi_match": {
                "query": term,
                "fields": ["content.*", "number", "org"]
            }
        }),
        _ => json!({ "match_all": {} }),
    };

    let mut bool_query = json!({ "must": [must] });
    if !query.exclude_ids.is_empty() {
        bool_query["must_not"] = json!([{ "ids": { "values": query.exclude_ids } }]);
    }

    let sort = query.sort.map(|order| match order {
        SortOrder::Newer => vec![json!({ "start": { "order": "desc" } })],
        SortOrder::Older => vec![json!({ "start": { "order": "asc" } })],
    });

    dto::SearchRequestBody {
        from: query.from,
        size: query.size,
        query: json!({ "bool": bool_query }),
        sort,
    }
}

impl From<dto::SearchResponse> for SearchResults {
    fn from(response: dto::SearchResponse) -> Self {
        SearchResults {
            took: response.took,
            total: response.hits.total.value(),
            max_score: response.hits.max_score,
            results: response
                .hits
                .hits
                .into_iter()
                .map(|hit| SearchHit {
                    id: hit.id,
                    score: hit.score,
                    data: hit.source,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults, AppError> {
        let mut request = self.client.post(self.search_url()).json(&request_body(query));
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("ApiKey {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Search(format!("request failed: {}", e)))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| AppError::Search(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Search(format!("search engine error {}: {}", status, body_text)));
        }

        let parsed: dto::SearchResponse = serde_json::from_str(&body_text).map_err(|e| {
            tracing::error!("Failed to parse search response: {}", e);
            AppError::Search(format!("Failed to parse search response: {}", e))
        })?;

        Ok(parsed.into())
    }
}

pub struct NoopSearchClient;

#[async_trait]
impl SearchClient for NoopSearchClient {
    async fn search(&self, _query: &SearchQuery) -> Result<SearchResults, AppError> {
        Ok(SearchResults::default())
    }
}
