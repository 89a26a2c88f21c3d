//! Error types for parsing and execution.

/// Errors from the control grammar parser.
///
/// `Clone` because a parse outcome is delivered to two parties: the writer
/// releasing the control file and the reader of the paired body file.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A line with the wrong number of tokens.
    #[error("malformed line {line}: expected 2 or 3 tokens, got {tokens}")]
    MalformedLine { line: usize, tokens: usize },

    /// The buffer is not valid UTF-8.
    #[error("specification is not valid utf-8")]
    InvalidUtf8,
}

/// Errors from building or executing an HTTP request.
#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("invalid HTTP method: {method}")]
    InvalidMethod { method: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
}
