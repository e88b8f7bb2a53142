//! Query-based search, scroll continuation and the shared search response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{collect_names, require_names, require_non_empty, require_object, ShardStats};
use crate::error::ValidationError;

/// Upper bound on `from + size` for a single page
pub const MAX_RESULT_WINDOW: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    QueryThenFetch,
    DfsQueryThenFetch,
    QueryAndFetch,
    DfsQueryAndFetch,
    Scan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Empty means every index
    pub indices: Vec<String>,
    pub types: Vec<String>,
    pub query: Value,
    pub from: usize,
    pub size: usize,
    pub sort: Vec<Value>,
    pub search_type: SearchType,
    /// Keep a scroll context alive for this long when set
    pub scroll_keep_alive_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScrollRequest {
    pub scroll_id: String,
    pub keep_alive_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub scroll_id: Option<String>,
    pub took_ms: u64,
    pub timed_out: bool,
    pub shards: ShardStats,
    pub hits: SearchHits,
}

impl SearchResponse {
    pub fn total_hits(&self) -> u64 {
        self.hits.total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: u64,
    pub max_score: Option<f32>,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub score: Option<f32>,
    pub source: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct SearchRequestBuilder {
    indices: Vec<String>,
    types: Vec<String>,
    query: Value,
    from: usize,
    size: usize,
    sort: Vec<Value>,
    search_type: SearchType,
    scroll_keep_alive_ms: Option<u64>,
}

impl SearchRequestBuilder {
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indices: collect_names(indices),
            types: Vec::new(),
            query: json!({"match_all": {}}),
            from: 0,
            size: 10,
            sort: Vec::new(),
            search_type: SearchType::default(),
            scroll_keep_alive_ms: None,
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

    pub fn from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    pub fn scroll(mut self, keep_alive_ms: u64) -> Self {
        self.scroll_keep_alive_ms = Some(keep_alive_ms);
        self
    }

    pub fn build(self) -> Result<SearchRequest, ValidationError> {
        let mut validation = ValidationError::new();
        require_names(&mut validation, "indices", &self.indices);
        require_names(&mut validation, "types", &self.types);
        require_object(&mut validation, "query", &self.query);
        if self.from.saturating_add(self.size) > MAX_RESULT_WINDOW {
            validation.add(format!(
                "from + size must not exceed {MAX_RESULT_WINDOW}, got {}",
                self.from.saturating_add(self.size)
            ));
        }
        if self.search_type == SearchType::Scan && self.scroll_keep_alive_ms.is_none() {
            validation.add("scan search requires a scroll keep-alive");
        }
        if self.scroll_keep_alive_ms == Some(0) {
            validation.add("scroll keep-alive must be greater than zero");
        }
        validation.into_result()?;

        Ok(SearchRequest {
            indices: self.indices,
            types: self.types,
            query: self.query,
            from: self.from,
            size: self.size,
            sort: self.sort,
            search_type: self.search_type,
            scroll_keep_alive_ms: self.scroll_keep_alive_ms,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchScrollRequestBuilder {
    scroll_id: String,
    keep_alive_ms: Option<u64>,
}

impl SearchScrollRequestBuilder {
    pub fn new(scroll_id: impl Into<String>) -> Self {
        Self {
            scroll_id: scroll_id.into(),
            keep_alive_ms: None,
        }
    }

    pub fn keep_alive(mut self, keep_alive_ms: u64) -> Self {
        self.keep_alive_ms = Some(keep_alive_ms);
        self
    }

    pub fn build(self) -> Result<SearchScrollRequest, ValidationError> {
        let mut validation = ValidationError::new();
        require_non_empty(&mut validation, "scroll_id", &self.scroll_id);
        if self.keep_alive_ms == Some(0) {
            validation.add("scroll keep-alive must be greater than zero");
        }
        validation.into_result()?;

        Ok(SearchScrollRequest {
            scroll_id: self.scroll_id,
            keep_alive_ms: self.keep_alive_ms,
        })
    }
}
