//! More-like-this: search for documents similar to an existing one.
//!
//! The response is a regular [`SearchResponse`](super::SearchResponse).

use serde::{Deserialize, Serialize};

use super::{collect_names, require_names, require_non_empty, DEFAULT_DOC_TYPE};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoreLikeThisRequest {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    /// Fields to derive terms from; empty uses all fields
    pub fields: Vec<String>,
    pub percent_terms_to_match: f32,
    pub min_term_freq: u32,
    pub max_query_terms: u32,
    pub min_doc_freq: u32,
    /// Indices to search for similar documents; empty searches the source index
    pub search_indices: Vec<String>,
    pub search_from: usize,
    pub search_size: usize,
}

#[derive(Debug, Clone)]
pub struct MoreLikeThisRequestBuilder {
    request: MoreLikeThisRequest,
}

impl MoreLikeThisRequestBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            request: MoreLikeThisRequest {
                index: index.into(),
                doc_type: DEFAULT_DOC_TYPE.to_string(),
                id: String::new(),
                fields: Vec::new(),
                percent_terms_to_match: 0.3,
                min_term_freq: 2,
                max_query_terms: 25,
                min_doc_freq: 5,
                search_indices: Vec::new(),
                search_from: 0,
                search_size: 10,
            },
        }
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.request.doc_type = doc_type.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.request.id = id.into();
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.fields = collect_names(fields);
        self
    }

    pub fn percent_terms_to_match(mut self, percent: f32) -> Self {
        self.request.percent_terms_to_match = percent;
        self
    }

    pub fn min_term_freq(mut self, min_term_freq: u32) -> Self {
        self.request.min_term_freq = min_term_freq;
        self
    }

    pub fn max_query_terms(mut self, max_query_terms: u32) -> Self {
        self.request.max_query_terms = max_query_terms;
        self
    }

    pub fn min_doc_freq(mut self, min_doc_freq: u32) -> Self {
        self.request.min_doc_freq = min_doc_freq;
        self
    }

    pub fn search_indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.search_indices = collect_names(indices);
        self
    }

    pub fn search_from(mut self, from: usize) -> Self {
        self.request.search_from = from;
        self
    }

    pub fn search_size(mut self, size: usize) -> Self {
        self.request.search_size = size;
        self
    }

    pub fn build(self) -> Result<MoreLikeThisRequest, ValidationError> {
        let request = self.request;
        let mut validation = ValidationError::new();
        require_non_empty(&mut validation, "index", &request.index);
        require_non_empty(&mut validation, "type", &request.doc_type);
        require_non_empty(&mut validation, "id", &request.id);
        require_names(&mut validation, "fields", &request.fields);
        require_names(&mut validation, "search_indices", &request.search_indices);
        if !(0.0..=1.0).contains(&request.percent_terms_to_match) {
            validation.add("percent_terms_to_match must be between 0 and 1");
        }
        if request.max_query_terms == 0 {
            validation.add("max_query_terms must be greater than zero");
        }
        validation.into_result()?;
        Ok(request)
    }
}
