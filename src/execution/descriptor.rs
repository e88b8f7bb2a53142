//! Operation descriptors: the closed set of operation kinds, their request and
//! response payloads, and the typed mapping between a request type and its
//! response type.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::{
    ClearRealmCacheRequest, ClearRealmCacheResponse, CountRequest, CountResponse,
    DeleteByQueryRequest, DeleteByQueryResponse, DeleteRequest, DeleteResponse, GetRequest,
    GetResponse, IndexRequest, IndexResponse, MoreLikeThisRequest, SearchRequest, SearchResponse,
    SearchScrollRequest, TermsRequest, TermsResponse,
};
use crate::error::{GatewayError, GatewayResult};

/// Every operation the gateway can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Index,
    Delete,
    DeleteByQuery,
    Get,
    Count,
    Search,
    SearchScroll,
    Terms,
    MoreLikeThis,
    ClearRealmCache,
}

impl OperationKind {
    pub const ALL: [OperationKind; 10] = [
        OperationKind::Index,
        OperationKind::Delete,
        OperationKind::DeleteByQuery,
        OperationKind::Get,
        OperationKind::Count,
        OperationKind::Search,
        OperationKind::SearchScroll,
        OperationKind::Terms,
        OperationKind::MoreLikeThis,
        OperationKind::ClearRealmCache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Index => "index",
            OperationKind::Delete => "delete",
            OperationKind::DeleteByQuery => "delete_by_query",
            OperationKind::Get => "get",
            OperationKind::Count => "count",
            OperationKind::Search => "search",
            OperationKind::SearchScroll => "search_scroll",
            OperationKind::Terms => "terms",
            OperationKind::MoreLikeThis => "more_like_this",
            OperationKind::ClearRealmCache => "admin_clear_realm_cache",
        }
    }

    /// Administrative operations are exposed through the admin sub-gateway
    pub fn is_admin(&self) -> bool {
        matches!(self, OperationKind::ClearRealmCache)
    }

    /// Operations that change cluster state
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            OperationKind::Index | OperationKind::Delete | OperationKind::DeleteByQuery
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload, one variant per operation kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "request", rename_all = "snake_case")]
pub enum OperationRequest {
    Index(IndexRequest),
    Delete(DeleteRequest),
    DeleteByQuery(DeleteByQueryRequest),
    Get(GetRequest),
    Count(CountRequest),
    Search(SearchRequest),
    SearchScroll(SearchScrollRequest),
    Terms(TermsRequest),
    MoreLikeThis(MoreLikeThisRequest),
    ClearRealmCache(ClearRealmCacheRequest),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Index(_) => OperationKind::Index,
            OperationRequest::Delete(_) => OperationKind::Delete,
            OperationRequest::DeleteByQuery(_) => OperationKind::DeleteByQuery,
            OperationRequest::Get(_) => OperationKind::Get,
            OperationRequest::Count(_) => OperationKind::Count,
            OperationRequest::Search(_) => OperationKind::Search,
            OperationRequest::SearchScroll(_) => OperationKind::SearchScroll,
            OperationRequest::Terms(_) => OperationKind::Terms,
            OperationRequest::MoreLikeThis(_) => OperationKind::MoreLikeThis,
            OperationRequest::ClearRealmCache(_) => OperationKind::ClearRealmCache,
        }
    }
}

/// Response payload returned by a transport.
///
/// Search, scroll and more-like-this all answer with a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "response", rename_all = "snake_case")]
pub enum OperationResponse {
    Index(IndexResponse),
    Delete(DeleteResponse),
    DeleteByQuery(DeleteByQueryResponse),
    Get(GetResponse),
    Count(CountResponse),
    Search(SearchResponse),
    Terms(TermsResponse),
    ClearRealmCache(ClearRealmCacheResponse),
}

impl OperationResponse {
    pub fn variant_name(&self) -> &'static str {
        match self {
            OperationResponse::Index(_) => "index",
            OperationResponse::Delete(_) => "delete",
            OperationResponse::DeleteByQuery(_) => "delete_by_query",
            OperationResponse::Get(_) => "get",
            OperationResponse::Count(_) => "count",
            OperationResponse::Search(_) => "search",
            OperationResponse::Terms(_) => "terms",
            OperationResponse::ClearRealmCache(_) => "clear_realm_cache",
        }
    }

    /// Apply the outcome rules that do not depend on the caller's typed view.
    ///
    /// A cache clear that failed on every targeted node becomes a transport
    /// fault; everything else passes through.
    pub fn classify(self) -> GatewayResult<OperationResponse> {
        match self {
            OperationResponse::ClearRealmCache(inner) => {
                inner.into_outcome().map(OperationResponse::ClearRealmCache)
            }
            other => Ok(other),
        }
    }
}

/// Immutable description of one submitted operation.
///
/// Created once per submission and shared with the transport behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDescriptor {
    operation_id: Uuid,
    kind: OperationKind,
    request: OperationRequest,
    submitted_at: DateTime<Utc>,
}

impl OperationDescriptor {
    pub fn new(request: OperationRequest) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            kind: request.kind(),
            request,
            submitted_at: Utc::now(),
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn request(&self) -> &OperationRequest {
        &self.request
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Typed mapping from a request to the response it produces.
///
/// Every gateway method pair routes through this trait, so a single generic
/// submission path serves all operation kinds.
pub trait GatewayAction: Send + 'static {
    type Response: Clone + Send + Sync + 'static;

    const KIND: OperationKind;

    fn into_request(self) -> OperationRequest;

    /// Convert the transport's answer into the typed response
    fn from_response(response: OperationResponse) -> GatewayResult<Self::Response>;
}

fn unexpected_response(kind: OperationKind, response: &OperationResponse) -> GatewayError {
    GatewayError::dispatch(format!(
        "transport answered {kind} with a {} response",
        response.variant_name()
    ))
}

macro_rules! gateway_action {
    ($request:ty => $response:ty, $kind:ident, $response_variant:ident) => {
        impl GatewayAction for $request {
            type Response = $response;

            const KIND: OperationKind = OperationKind::$kind;

            fn into_request(self) -> OperationRequest {
                OperationRequest::$kind(self)
            }

            fn from_response(response: OperationResponse) -> GatewayResult<Self::Response> {
                match response {
                    OperationResponse::$response_variant(inner) => Ok(inner),
                    other => Err(unexpected_response(Self::KIND, &other)),
                }
            }
        }
    };
}

gateway_action!(IndexRequest => IndexResponse, Index, Index);
gateway_action!(DeleteRequest => DeleteResponse, Delete, Delete);
gateway_action!(DeleteByQueryRequest => DeleteByQueryResponse, DeleteByQuery, DeleteByQuery);
gateway_action!(GetRequest => GetResponse, Get, Get);
gateway_action!(CountRequest => CountResponse, Count, Count);
gateway_action!(SearchRequest => SearchResponse, Search, Search);
gateway_action!(SearchScrollRequest => SearchResponse, SearchScroll, Search);
gateway_action!(TermsRequest => TermsResponse, Terms, Terms);
gateway_action!(MoreLikeThisRequest => SearchResponse, MoreLikeThis, Search);

impl GatewayAction for ClearRealmCacheRequest {
    type Response = ClearRealmCacheResponse;

    const KIND: OperationKind = OperationKind::ClearRealmCache;

    fn into_request(self) -> OperationRequest {
        OperationRequest::ClearRealmCache(self)
    }

    fn from_response(response: OperationResponse) -> GatewayResult<Self::Response> {
        match response {
            OperationResponse::ClearRealmCache(inner) => inner.into_outcome(),
            other => Err(unexpected_response(Self::KIND, &other)),
        }
    }
}
