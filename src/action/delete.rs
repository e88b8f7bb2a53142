//! Delete a single document by index, type and id.

use serde::{Deserialize, Serialize};

use super::{require_non_empty, DEFAULT_DOC_TYPE};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub version: u64,
    /// False when there was no document to delete
    pub found: bool,
}

#[derive(Debug, Clone)]
pub struct DeleteRequestBuilder {
    index: String,
    doc_type: String,
    id: String,
    refresh: bool,
}

impl DeleteRequestBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            id: String::new(),
            refresh: false,
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

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn build(self) -> Result<DeleteRequest, ValidationError> {
        let mut validation = ValidationError::new();
        require_non_empty(&mut validation, "index", &self.index);
        require_non_empty(&mut validation, "type", &self.doc_type);
        require_non_empty(&mut validation, "id", &self.id);
        validation.into_result()?;

        Ok(DeleteRequest {
            index: self.index,
            doc_type: self.doc_type,
            id: self.id,
            refresh: self.refresh,
        })
    }
}
