use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    pub hits: Hits,
}

#[derive(Debug, Deserialize)]
pub struct Hits {
    pub total: Total,
    #[serde(default)]
    pub max_score: Option<f64>,
    pub hits: Vec<Hit>,
}

/// Older engines report a bare number, newer ones `{"value": n, "relation": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Total {
    Count(u64),
    Object { value: u64 },
}

impl Total {
    pub fn value(&self) -> u64 {
        match self {
            Total::Count(n) => *n,
            Total::Object { value } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SearchRequestBody {
    pub from: usize,
    pub size: usize,
    pub query: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
}
