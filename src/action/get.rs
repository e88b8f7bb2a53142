//! Fetch a document's source (or selected fields) by index, type and id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{collect_names, require_names, require_non_empty, DEFAULT_DOC_TYPE};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    /// Stored fields to return; empty returns the source
    pub fields: Vec<String>,
    pub realtime: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub exists: bool,
    pub version: Option<u64>,
    pub source: Option<Value>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl GetResponse {
    /// Response for a document that does not exist
    pub fn missing(index: impl Into<String>, doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            exists: false,
            version: None,
            source: None,
            fields: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetRequestBuilder {
    index: String,
    doc_type: String,
    id: String,
    fields: Vec<String>,
    realtime: bool,
}

impl GetRequestBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            id: String::new(),
            fields: Vec::new(),
            realtime: true,
        }
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = collect_names(fields);
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn build(self) -> Result<GetRequest, ValidationError> {
        let mut validation = ValidationError::new();
        require_non_empty(&mut validation, "index", &self.index);
        require_non_empty(&mut validation, "type", &self.doc_type);
        require_non_empty(&mut validation, "id", &self.id);
        require_names(&mut validation, "fields", &self.fields);
        validation.into_result()?;

        Ok(GetRequest {
            index: self.index,
            doc_type: self.doc_type,
            id: self.id,
            fields: self.fields,
            realtime: self.realtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request_defaults() {
        let request = GetRequestBuilder::new("twitter").id("1").build().unwrap();
        assert!(request.realtime);
        assert!(request.fields.is_empty());
    }

    #[test]
    fn test_missing_response() {
        let response = GetResponse::missing("twitter", "_doc", "42");
        assert!(!response.exists);
        assert!(response.source.is_none());
    }
}
