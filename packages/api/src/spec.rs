//! The parsed request specification.

use serde::{Deserialize, Serialize};

/// One fully-shaped HTTP request: target URL, method, query parameters and
/// headers.
///
/// Query and headers are multimaps kept as ordered pairs, so repeated keys
/// survive and values are sent in the order they were written. The method
/// is carried as an opaque token and validated when the request is built,
/// which lets nonstandard methods flow through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestSpec {
    pub url: String,
    pub method: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    /// A default `GET` specification for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        RequestSpec {
            url: url.into(),
            method: "GET".to_string(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
