//! Term statistics: the terms of one or more fields with their document frequencies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{collect_names, require_names, ShardStats};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermsSort {
    #[default]
    Term,
    Freq,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsRequest {
    pub indices: Vec<String>,
    pub fields: Vec<String>,
    /// Lower bound (inclusive) of the term range
    pub from: Option<String>,
    /// Upper bound (exclusive) of the term range
    pub to: Option<String>,
    pub prefix: Option<String>,
    pub regexp: Option<String>,
    pub min_freq: Option<u32>,
    pub max_freq: Option<u32>,
    pub size: usize,
    pub sort: TermsSort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFreq {
    pub term: String,
    pub doc_freq: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsResponse {
    pub shards: ShardStats,
    pub fields: BTreeMap<String, Vec<TermFreq>>,
}

impl TermsResponse {
    pub fn field(&self, name: &str) -> &[TermFreq] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct TermsRequestBuilder {
    request: TermsRequest,
}

impl TermsRequestBuilder {
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            request: TermsRequest {
                indices: collect_names(indices),
                fields: Vec::new(),
                from: None,
                to: None,
                prefix: None,
                regexp: None,
                min_freq: None,
                max_freq: None,
                size: 10,
                sort: TermsSort::default(),
            },
        }
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.fields = collect_names(fields);
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.request.from = Some(from.into());
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.request.to = Some(to.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.request.prefix = Some(prefix.into());
        self
    }

    pub fn regexp(mut self, regexp: impl Into<String>) -> Self {
        self.request.regexp = Some(regexp.into());
        self
    }

    pub fn min_freq(mut self, min_freq: u32) -> Self {
        self.request.min_freq = Some(min_freq);
        self
    }

    pub fn max_freq(mut self, max_freq: u32) -> Self {
        self.request.max_freq = Some(max_freq);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.request.size = size;
        self
    }

    pub fn sort(mut self, sort: TermsSort) -> Self {
        self.request.sort = sort;
        self
    }

    pub fn build(self) -> Result<TermsRequest, ValidationError> {
        let request = self.request;
        let mut validation = ValidationError::new();
        if request.fields.is_empty() {
            validation.add("at least one field is required");
        }
        require_names(&mut validation, "indices", &request.indices);
        require_names(&mut validation, "fields", &request.fields);
        if request.size == 0 {
            validation.add("size must be greater than zero");
        }
        if let (Some(min), Some(max)) = (request.min_freq, request.max_freq) {
            if min > max {
                validation.add(format!("min_freq ({min}) is greater than max_freq ({max})"));
            }
        }
        validation.into_result()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_requires_fields() {
        let err = TermsRequestBuilder::new(["twitter"]).build().unwrap_err();
        assert_eq!(err.errors(), ["at least one field is required"]);
    }

    #[test]
    fn test_terms_freq_bounds() {
        let err = TermsRequestBuilder::new(["twitter"])
            .fields(["user"])
            .min_freq(10)
            .max_freq(2)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("min_freq (10)"));
    }

    #[test]
    fn test_field_lookup() {
        let mut response = TermsResponse::default();
        response.fields.insert(
            "user".to_string(),
            vec![TermFreq {
                term: "kimchy".to_string(),
                doc_freq: 3,
            }],
        );
        assert_eq!(response.field("user").len(), 1);
        assert!(response.field("message").is_empty());
    }
}
