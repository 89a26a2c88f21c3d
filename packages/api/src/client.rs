//! HTTP execution abstraction.
//!
//! The filesystem core never talks to the network directly; it holds an
//! [`HttpClient`] and hands it one [`RequestSpec`] per connection. The
//! production implementation is backed by `reqwest`; tests substitute
//! in-memory implementations.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::HttpError;
use crate::spec::RequestSpec;

/// The byte stream a request resolves to. Consumed to completion by the
/// caller and then dropped.
pub type BodyStream = Box<dyn Read + Send>;

/// Capability to execute one HTTP request.
///
/// Implementations must honor the method, append the query parameters
/// URL-encoded, and send multi-valued headers in insertion order.
pub trait HttpClient: Send + Sync {
    fn execute(&self, spec: &RequestSpec) -> Result<BodyStream, HttpError>;
}

/// Production client backed by `reqwest::blocking`.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ReqwestClient { client })
    }

    /// Create a client with the default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, HttpError> {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, spec: &RequestSpec) -> Result<BodyStream, HttpError> {
        let url = url::Url::parse(&spec.url)?;

        let method = http::Method::from_bytes(spec.method.as_bytes()).map_err(|_| {
            HttpError::InvalidMethod {
                method: spec.method.clone(),
            }
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &spec.headers {
            let name = HeaderName::try_from(name.as_str())?;
            let value = HeaderValue::try_from(value.as_str())?;
            headers.append(name, value);
        }

        log::debug!("{} {} ({} query params)", method, url, spec.query.len());

        let mut request = self.client.request(method, url).headers(headers);
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }

        let response = request.send()?;
        Ok(Box::new(response))
    }
}
