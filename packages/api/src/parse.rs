//! Parser for the control-file grammar.

use crate::error::ParseError;
use crate::spec::RequestSpec;

impl RequestSpec {
    /// Parse an accumulated control-file buffer into a specification.
    ///
    /// Lines are separated by `\n`; empty lines are skipped. Each remaining
    /// line must split into 2 or 3 whitespace-separated tokens. Unknown
    /// directives are ignored. If no `method` directive appears the method
    /// is `GET`.
    pub fn parse(url: impl Into<String>, data: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(data).map_err(|_| ParseError::InvalidUtf8)?;

        let mut spec = RequestSpec::get(url);

        for (idx, line) in text.split('\n').enumerate() {
            let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < 2 || tokens.len() > 3 {
                return Err(ParseError::MalformedLine {
                    line: idx + 1,
                    tokens: tokens.len(),
                });
            }

            let value = tokens.get(2).copied().unwrap_or("");
            match tokens[0] {
                "method" => {
                    if tokens.len() != 2 {
                        return Err(ParseError::MalformedLine {
                            line: idx + 1,
                            tokens: tokens.len(),
                        });
                    }
                    spec.method = tokens[1].to_string();
                }
                "query" => spec.query.push((tokens[1].to_string(), value.to_string())),
                "header" => spec
                    .headers
                    .push((tokens[1].to_string(), value.to_string())),
                other => {
                    log::debug!("ignoring unknown directive {:?}", other);
                }
            }
        }

        Ok(spec)
    }
}
