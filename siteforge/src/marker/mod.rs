//! Marker-delimited payload extraction.
//!
//! Stage processes interleave free-form logging with exactly one JSON
//! result on standard output. The result is framed by a sentinel pair:
//!
//! ```text
//! SERVICE_JSON_START
//! { ...json... }
//! SERVICE_JSON_END
//! ```
//!
//! [`extract`] pulls out the substring strictly between the first start
//! token and the first subsequent end token, trims it, and parses it as
//! JSON. Stages that emit no markers but whose entire output is valid
//! JSON are accepted via the raw-parse fallback.
//!
//! Tokens are assumed not to occur inside legitimate payload content.
//! Deployments that cannot guarantee this should supply long
//! random-looking sentinels through [`MarkerPair::new`] (or move to
//! length-prefixed framing at the stage boundary).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffix appended to a token base to form the start sentinel.
pub const START_SUFFIX: &str = "_START";

/// Suffix appended to a token base to form the end sentinel.
pub const END_SUFFIX: &str = "_END";

/// A start/end sentinel pair framing one JSON payload in a text stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPair {
    /// The start sentinel.
    pub start: String,
    /// The end sentinel.
    pub end: String,
}

impl MarkerPair {
    /// Creates a marker pair from explicit sentinels.
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Creates the conventional pair for a token base, e.g.
    /// `for_token("SERVICE_JSON")` yields `SERVICE_JSON_START` /
    /// `SERVICE_JSON_END`.
    #[must_use]
    pub fn for_token(token: &str) -> Self {
        Self {
            start: format!("{token}{START_SUFFIX}"),
            end: format!("{token}{END_SUFFIX}"),
        }
    }
}

/// Why a payload could not be extracted from a stage's output.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A sentinel token does not occur anywhere in the stream.
    #[error("marker '{token}' not found in output")]
    MarkerNotFound {
        /// The absent token.
        token: String,
    },

    /// The end token occurs only before the start token.
    #[error("marker '{end}' occurs before '{start}'")]
    MarkerOrderInvalid {
        /// The start token.
        start: String,
        /// The end token.
        end: String,
    },

    /// The framed substring is not valid JSON.
    #[error("payload is not valid JSON: {message}")]
    PayloadParse {
        /// Parser failure detail.
        message: String,
    },

    /// An expected output file was not produced (file-paths contract).
    #[error("expected output file missing: {path}")]
    MissingOutputFile {
        /// The missing path.
        path: std::path::PathBuf,
    },
}

impl ExtractError {
    /// Creates a marker-not-found error.
    #[must_use]
    pub fn marker_not_found(token: impl Into<String>) -> Self {
        Self::MarkerNotFound {
            token: token.into(),
        }
    }
}

/// Extracts the JSON payload framed by `pair` from `stream`.
///
/// The substring strictly between the first occurrence of the start
/// token and the first subsequent occurrence of the end token is
/// trimmed and parsed. Surrounding log noise is ignored.
///
/// # Errors
///
/// - [`ExtractError::MarkerNotFound`] when either token is absent.
/// - [`ExtractError::MarkerOrderInvalid`] when the only end token
///   precedes the start token.
/// - [`ExtractError::PayloadParse`] when the framed text is not JSON.
pub fn extract_between(stream: &str, pair: &MarkerPair) -> Result<serde_json::Value, ExtractError> {
    let start_idx = stream
        .find(&pair.start)
        .ok_or_else(|| ExtractError::marker_not_found(&pair.start))?;

    let after_start = start_idx + pair.start.len();
    match stream[after_start..].find(&pair.end) {
        Some(rel) => {
            let body = stream[after_start..after_start + rel].trim();
            serde_json::from_str(body).map_err(|e| ExtractError::PayloadParse {
                message: e.to_string(),
            })
        }
        None => {
            // An end token earlier in the stream means the pair is out of
            // order; no end token at all means it is missing.
            if stream[..start_idx].contains(&pair.end) {
                Err(ExtractError::MarkerOrderInvalid {
                    start: pair.start.clone(),
                    end: pair.end.clone(),
                })
            } else {
                Err(ExtractError::marker_not_found(&pair.end))
            }
        }
    }
}

/// Extracts a payload with the raw-parse fallback applied.
///
/// Runs [`extract_between`]; if that fails but the entire trimmed
/// stream parses as JSON on its own, the whole stream is accepted as
/// the payload. This accommodates stages that never learned to emit
/// markers.
///
/// # Errors
///
/// Returns the original marker failure when the fallback also fails.
pub fn extract(stream: &str, pair: &MarkerPair) -> Result<serde_json::Value, ExtractError> {
    match extract_between(stream, pair) {
        Ok(value) => Ok(value),
        Err(marker_err) => match serde_json::from_str(stream.trim()) {
            Ok(value) => Ok(value),
            Err(_) => Err(marker_err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pair() -> MarkerPair {
        MarkerPair::for_token("SERVICE_JSON")
    }

    #[test]
    fn test_for_token_convention() {
        let p = pair();
        assert_eq!(p.start, "SERVICE_JSON_START");
        assert_eq!(p.end, "SERVICE_JSON_END");
    }

    #[test]
    fn test_extract_amid_log_noise() {
        let stream = "\
[Services] loading template\n\
  - Generating blocks for Metal Roofing\n\
SERVICE_JSON_START\n\
{\"residential\": [], \"commercial\": [{\"id\": \"metal-roofing\"}]}\n\
SERVICE_JSON_END\n\
[Services] Emitted to STDOUT (memory mode)\n";

        let value = extract(stream, &pair()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"residential": [], "commercial": [{"id": "metal-roofing"}]})
        );
    }

    #[test]
    fn test_extract_first_pair_wins() {
        let stream = "SERVICE_JSON_START\n1\nSERVICE_JSON_END\nSERVICE_JSON_START\n2\nSERVICE_JSON_END\n";
        let value = extract(stream, &pair()).unwrap();
        assert_eq!(value, serde_json::json!(1));
    }

    #[test]
    fn test_missing_start_token() {
        let err = extract_between("no markers here", &pair()).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MarkerNotFound { token } if token == "SERVICE_JSON_START"
        ));
    }

    #[test]
    fn test_missing_end_token() {
        let err = extract_between("SERVICE_JSON_START\n{}", &pair()).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MarkerNotFound { token } if token == "SERVICE_JSON_END"
        ));
    }

    #[test]
    fn test_end_before_start_is_order_invalid() {
        let stream = "SERVICE_JSON_END\nnoise\nSERVICE_JSON_START\n{}";
        let err = extract_between(stream, &pair()).unwrap_err();
        assert!(matches!(err, ExtractError::MarkerOrderInvalid { .. }));
    }

    #[test]
    fn test_malformed_payload() {
        let stream = "SERVICE_JSON_START\n{not json\nSERVICE_JSON_END";
        let err = extract_between(stream, &pair()).unwrap_err();
        assert!(matches!(err, ExtractError::PayloadParse { .. }));
    }

    #[test]
    fn test_raw_parse_fallback() {
        let stream = "  {\"x\": 1}\n";
        let value = extract(stream, &pair()).unwrap();
        assert_eq!(value, serde_json::json!({"x": 1}));
    }

    #[test]
    fn test_raw_parse_fallback_failure_keeps_marker_error() {
        let err = extract("plain log text only", &pair()).unwrap_err();
        assert!(matches!(err, ExtractError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_whitespace_trimmed_before_parse() {
        let stream = "SERVICE_JSON_START\n\n   [1, 2, 3]  \n\nSERVICE_JSON_END";
        let value = extract_between(stream, &pair()).unwrap();
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }
}
