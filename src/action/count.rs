//! Count the documents matching a query.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{collect_names, require_names, require_object, ShardStats};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRequest {
    /// Empty means every index
    pub indices: Vec<String>,
    pub types: Vec<String>,
    pub query: Value,
    pub min_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
    pub shards: ShardStats,
}

#[derive(Debug, Clone)]
pub struct CountRequestBuilder {
    indices: Vec<String>,
    types: Vec<String>,
    query: Value,
    min_score: Option<f32>,
}

impl CountRequestBuilder {
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indices: collect_names(indices),
            types: Vec::new(),
            query: json!({"match_all": {}}),
            min_score: None,
        }
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = collect_names(types);
        self
    }

    pub fn query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn build(self) -> Result<CountRequest, ValidationError> {
        let mut validation = ValidationError::new();
        require_names(&mut validation, "indices", &self.indices);
        require_names(&mut validation, "types", &self.types);
        require_object(&mut validation, "query", &self.query);
        if let Some(min_score) = self.min_score {
            if !min_score.is_finite() || min_score < 0.0 {
                validation.add("min_score must be a non-negative number");
            }
        }
        validation.into_result()?;

        Ok(CountRequest {
            indices: self.indices,
            types: self.types,
            query: self.query,
            min_score: self.min_score,
        })
    }
}
