//! Index a JSON document into an index, optionally under an explicit id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{require_non_empty, require_object, DEFAULT_DOC_TYPE};
use crate::error::ValidationError;

/// How an index request treats an existing document with the same id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    /// Replace any existing document
    #[default]
    Index,
    /// Fail if the document already exists
    Create,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub index: String,
    pub doc_type: String,
    /// Generated by the cluster when absent
    pub id: Option<String>,
    pub source: Value,
    pub op_type: OpType,
    pub refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub version: u64,
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct IndexRequestBuilder {
    index: String,
    doc_type: String,
    id: Option<String>,
    source: Option<Value>,
    op_type: OpType,
    refresh: bool,
}

impl IndexRequestBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            id: None,
            source: None,
            op_type: OpType::Index,
            refresh: false,
        }
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn source(mut self, source: Value) -> Self {
        self.source = Some(source);
        self
    }

    pub fn op_type(mut self, op_type: OpType) -> Self {
        self.op_type = op_type;
        self
    }

    pub fn create(self, create: bool) -> Self {
        self.op_type(if create { OpType::Create } else { OpType::Index })
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn build(self) -> Result<IndexRequest, ValidationError> {
        let mut validation = ValidationError::new();
        require_non_empty(&mut validation, "index", &self.index);
        require_non_empty(&mut validation, "type", &self.doc_type);
        if let Some(id) = &self.id {
            require_non_empty(&mut validation, "id", id);
        }
        match &self.source {
            Some(source) => require_object(&mut validation, "source", source),
            None => validation.add("source is missing"),
        }
        validation.into_result()?;

        Ok(IndexRequest {
            index: self.index,
            doc_type: self.doc_type,
            id: self.id,
            source: self.source.unwrap_or(Value::Null),
            op_type: self.op_type,
            refresh: self.refresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_request_without_id() {
        let request = IndexRequestBuilder::new("twitter")
            .source(json!({"user": "kimchy"}))
            .create(true)
            .build()
            .unwrap();
        assert_eq!(request.id, None);
        assert_eq!(request.op_type, OpType::Create);
        assert_eq!(request.doc_type, DEFAULT_DOC_TYPE);
    }

    #[test]
    fn test_index_request_reports_every_problem() {
        let err = IndexRequestBuilder::new("")
            .id("")
            .source(json!("not an object"))
            .build()
            .unwrap_err();
        assert_eq!(err.errors().len(), 3);
    }
}
