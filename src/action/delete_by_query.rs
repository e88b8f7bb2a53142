//! Delete every document matching a query across one or more indices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{collect_names, require_names, require_object, ShardStats};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteByQueryRequest {
    pub indices: Vec<String>,
    pub types: Vec<String>,
    pub query: Value,
}

/// Per-index shard outcome of a delete-by-query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteByQueryResponse {
    pub indices: BTreeMap<String, ShardStats>,
}

impl DeleteByQueryResponse {
    /// Shard stats summed across all indices
    pub fn total_shards(&self) -> ShardStats {
        self.indices
            .values()
            .fold(ShardStats::default(), |mut acc, stats| {
                acc.total += stats.total;
                acc.successful += stats.successful;
                acc.failed += stats.failed;
                acc.failures.extend(stats.failures.iter().cloned());
                acc
            })
    }
}

#[derive(Debug, Clone)]
pub struct DeleteByQueryRequestBuilder {
    indices: Vec<String>,
    types: Vec<String>,
    query: Option<Value>,
}

impl DeleteByQueryRequestBuilder {
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indices: collect_names(indices),
            types: Vec::new(),
            query: None,
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
        self.query = Some(query);
        self
    }

    pub fn build(self) -> Result<DeleteByQueryRequest, ValidationError> {
        let mut validation = ValidationError::new();
        // a delete across every index must be spelled out explicitly
        if self.indices.is_empty() {
            validation.add("at least one index is required");
        }
        require_names(&mut validation, "indices", &self.indices);
        require_names(&mut validation, "types", &self.types);
        match &self.query {
            Some(query) => require_object(&mut validation, "query", query),
            None => validation.add("query is missing"),
        }
        validation.into_result()?;

        Ok(DeleteByQueryRequest {
            indices: self.indices,
            types: self.types,
            query: self.query.unwrap_or(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_by_query_requires_indices_and_query() {
        let empty: [&str; 0] = [];
        let err = DeleteByQueryRequestBuilder::new(empty).build().unwrap_err();
        assert_eq!(err.errors().len(), 2);

        let request = DeleteByQueryRequestBuilder::new(["logs"])
            .query(json!({"term": {"level": "debug"}}))
            .build()
            .unwrap();
        assert_eq!(request.indices, vec!["logs"]);
    }

    #[test]
    fn test_total_shards_sums_indices() {
        let mut response = DeleteByQueryResponse::default();
        response
            .indices
            .insert("a".to_string(), ShardStats::all_successful(3));
        response.indices.insert(
            "b".to_string(),
            ShardStats {
                total: 2,
                successful: 1,
                failed: 1,
                failures: Vec::new(),
            },
        );

        let total = response.total_shards();
        assert_eq!(total.total, 5);
        assert_eq!(total.successful, 4);
        assert_eq!(total.failed, 1);
    }
}
