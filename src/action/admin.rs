//! Realm authentication cache clearing across cluster nodes.
//!
//! The response carries one entry per targeted node. Some nodes failing is a
//! normal, successful response; only a response in which every targeted node
//! failed is turned into a transport fault (see
//! [`ClearRealmCacheResponse::into_outcome`]).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearRealmCacheRequest {
    /// Realms to clear; empty clears every realm
    pub realms: BTreeSet<String>,
    /// Users to evict; empty evicts every cached user
    pub usernames: BTreeSet<String>,
    /// Nodes to target; empty targets every node
    pub nodes: BTreeSet<String>,
}

/// Acknowledgement of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCacheClearStatus {
    pub cleared: bool,
    pub error: Option<String>,
}

impl NodeCacheClearStatus {
    pub fn cleared() -> Self {
        Self {
            cleared: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            cleared: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearRealmCacheResponse {
    pub cluster_name: String,
    /// Node identifier to acknowledgement
    pub nodes: BTreeMap<String, NodeCacheClearStatus>,
}

impl ClearRealmCacheResponse {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn with_node(mut self, node_id: impl Into<String>, status: NodeCacheClearStatus) -> Self {
        self.nodes.insert(node_id.into(), status);
        self
    }

    /// Nodes that cleared their cache
    pub fn acknowledged(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, status)| status.cleared)
            .map(|(node, _)| node.as_str())
    }

    /// Nodes that failed, with their error
    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().filter(|(_, status)| !status.cleared).map(|(node, status)| {
            (
                node.as_str(),
                status.error.as_deref().unwrap_or("unknown error"),
            )
        })
    }

    pub fn is_partial(&self) -> bool {
        self.acknowledged().next().is_some() && self.failed().next().is_some()
    }

    /// Classify the cluster's answer.
    ///
    /// At least one acknowledging node (or no node targeted at all) is a
    /// success; every targeted node failing is a transport fault.
    pub fn into_outcome(self) -> GatewayResult<Self> {
        if self.nodes.is_empty() || self.acknowledged().next().is_some() {
            return Ok(self);
        }

        let summary = self
            .failed()
            .map(|(node, error)| format!("{node}: {error}"))
            .collect::<Vec<_>>()
            .join(", ");
        Err(GatewayError::transport(format!(
            "realm cache clear failed on all {} nodes ({summary})",
            self.nodes.len()
        )))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClearRealmCacheRequestBuilder {
    request: ClearRealmCacheRequest,
}

impl ClearRealmCacheRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realms<I, S>(mut self, realms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.realms.extend(realms.into_iter().map(Into::into));
        self
    }

    pub fn usernames<I, S>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request
            .usernames
            .extend(usernames.into_iter().map(Into::into));
        self
    }

    pub fn nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<ClearRealmCacheRequest, ValidationError> {
        let request = self.request;
        let mut validation = ValidationError::new();
        for (field, names) in [
            ("realms", &request.realms),
            ("usernames", &request.usernames),
            ("nodes", &request.nodes),
        ] {
            if names.iter().any(|name| name.trim().is_empty()) {
                validation.add(format!("{field} must not contain blank names"));
            }
        }
        validation.into_result()?;
        Ok(request)
    }
}
