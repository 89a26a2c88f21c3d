//! # apifs-api
//!
//! The request side of apifs: the textual control grammar, the parsed
//! [`RequestSpec`], and the [`HttpClient`] capability that executes one.
//!
//! ## Control grammar
//!
//! A specification is line-oriented text. Each non-empty line is a
//! directive followed by one or two whitespace-separated arguments:
//!
//! ```text
//! method POST
//! query sort name
//! query limit 10
//! header Authorization token123
//! ```
//!
//! | Directive | Arguments | Effect |
//! |-----------|-----------|--------|
//! | `method`  | 1         | Sets the HTTP method. |
//! | `query`   | 1 or 2    | Appends a query parameter (empty value with 1). |
//! | `header`  | 1 or 2    | Appends a header (empty value with 1). |
//!
//! Unknown directives are ignored for forward compatibility. A missing
//! `method` means `GET`. The target URL is not part of the grammar; it
//! comes from where the specification was written.
//!
//! ## Executing
//!
//! ```ignore
//! use apifs_api::{HttpClient, ReqwestClient, RequestSpec};
//!
//! let spec = RequestSpec::parse("http://example.com/users", b"query sort name\n")?;
//! let client = ReqwestClient::with_default_timeout()?;
//! let mut body = client.execute(&spec)?;   // impl std::io::Read
//! ```

pub mod client;
pub mod error;
pub mod parse;
pub mod spec;

pub use client::{HttpClient, ReqwestClient};
pub use error::{HttpError, ParseError};
pub use spec::RequestSpec;
