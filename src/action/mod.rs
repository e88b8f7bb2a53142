//! # Operation Requests and Responses
//!
//! Thin request/response data for every operation kind the gateway can
//! dispatch. Requests are produced by builders whose `build()` performs all
//! parameter validation, so a malformed request never reaches the dispatcher.
//!
//! ```rust
//! use cluster_gateway::action::Requests;
//! use serde_json::json;
//!
//! let request = Requests::index_request("twitter")
//!     .id("1")
//!     .source(json!({"user": "kimchy", "message": "trying out the gateway"}))
//!     .build()
//!     .expect("valid request");
//! assert_eq!(request.index, "twitter");
//!
//! // Missing parameters surface synchronously, before submission
//! assert!(Requests::get_request("twitter").build().is_err());
//! ```

pub mod admin;
pub mod count;
pub mod delete;
pub mod delete_by_query;
pub mod get;
pub mod index;
pub mod mlt;
pub mod search;
pub mod terms;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use admin::{
    ClearRealmCacheRequest, ClearRealmCacheRequestBuilder, ClearRealmCacheResponse,
    NodeCacheClearStatus,
};
pub use count::{CountRequest, CountRequestBuilder, CountResponse};
pub use delete::{DeleteRequest, DeleteRequestBuilder, DeleteResponse};
pub use delete_by_query::{DeleteByQueryRequest, DeleteByQueryRequestBuilder, DeleteByQueryResponse};
pub use get::{GetRequest, GetRequestBuilder, GetResponse};
pub use index::{IndexRequest, IndexRequestBuilder, IndexResponse, OpType};
pub use mlt::{MoreLikeThisRequest, MoreLikeThisRequestBuilder};
pub use search::{
    SearchHit, SearchHits, SearchRequest, SearchRequestBuilder, SearchResponse,
    SearchScrollRequest, SearchScrollRequestBuilder, SearchType,
};
pub use terms::{TermFreq, TermsRequest, TermsRequestBuilder, TermsResponse, TermsSort};

/// Document type used when a request does not name one
pub const DEFAULT_DOC_TYPE: &str = "_doc";

/// Entry points for every request builder
pub struct Requests;

impl Requests {
    pub fn index_request(index: impl Into<String>) -> IndexRequestBuilder {
        IndexRequestBuilder::new(index)
    }

    pub fn delete_request(index: impl Into<String>) -> DeleteRequestBuilder {
        DeleteRequestBuilder::new(index)
    }

    pub fn delete_by_query_request<I, S>(indices: I) -> DeleteByQueryRequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DeleteByQueryRequestBuilder::new(indices)
    }

    pub fn get_request(index: impl Into<String>) -> GetRequestBuilder {
        GetRequestBuilder::new(index)
    }

    pub fn count_request<I, S>(indices: I) -> CountRequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CountRequestBuilder::new(indices)
    }

    pub fn search_request<I, S>(indices: I) -> SearchRequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SearchRequestBuilder::new(indices)
    }

    pub fn search_scroll_request(scroll_id: impl Into<String>) -> SearchScrollRequestBuilder {
        SearchScrollRequestBuilder::new(scroll_id)
    }

    pub fn terms_request<I, S>(indices: I) -> TermsRequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TermsRequestBuilder::new(indices)
    }

    pub fn more_like_this_request(index: impl Into<String>) -> MoreLikeThisRequestBuilder {
        MoreLikeThisRequestBuilder::new(index)
    }

    pub fn clear_realm_cache_request() -> ClearRealmCacheRequestBuilder {
        ClearRealmCacheRequestBuilder::new()
    }
}

/// Shard-level outcome of a broadcast operation.
///
/// Failed shards are reported here as data; a broadcast response is still a
/// success when some shards fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStats {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
    #[serde(default)]
    pub failures: Vec<ShardFailure>,
}

impl ShardStats {
    /// Stats for a broadcast where every shard answered
    pub fn all_successful(total: u32) -> Self {
        Self {
            total,
            successful: total,
            failed: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.failed > 0 && self.successful > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardFailure {
    pub index: String,
    pub shard: u32,
    pub reason: String,
}

pub(crate) fn require_non_empty(validation: &mut ValidationError, field: &str, value: &str) {
    if value.trim().is_empty() {
        validation.add(format!("{field} is missing"));
    }
}

pub(crate) fn require_object(
    validation: &mut ValidationError,
    field: &str,
    value: &serde_json::Value,
) {
    if !value.is_object() {
        validation.add(format!("{field} must be a JSON object"));
    }
}

pub(crate) fn collect_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

pub(crate) fn require_names(validation: &mut ValidationError, field: &str, names: &[String]) {
    if names.iter().any(|name| name.trim().is_empty()) {
        validation.add(format!("{field} must not contain blank names"));
    }
}
