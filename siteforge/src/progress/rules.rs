//! Line-pattern rules mapping stage output to item transitions.
//!
//! The default rule set recognizes only the structured event lines a
//! stage may emit alongside its normal logging:
//!
//! ```text
//! PROGRESS_EVENT start Metal Roofing
//! PROGRESS_EVENT done Metal Roofing
//! ```
//!
//! Progress semantics are thereby decoupled from incidental log
//! phrasing. Custom rules can still be supplied to match legacy
//! free-text lines, but that coupling is opt-in.

use regex::Regex;

use super::state::ProgressStatus;

/// Prefix of the structured progress event lines.
pub const EVENT_PREFIX: &str = "PROGRESS_EVENT";

/// Formats the structured line marking an item as started.
#[must_use]
pub fn start_line(key: &str) -> String {
    format!("{EVENT_PREFIX} start {key}")
}

/// Formats the structured line marking an item as completed.
#[must_use]
pub fn done_line(key: &str) -> String {
    format!("{EVENT_PREFIX} done {key}")
}

/// One pattern rule: a regex with a `key` capture and a target status.
#[derive(Debug, Clone)]
pub struct ProgressRule {
    pattern: Regex,
    status: ProgressStatus,
}

impl ProgressRule {
    /// Creates a rule. The pattern must capture the item key in a
    /// group named `key` or in the first capture group.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error for an invalid pattern.
    pub fn new(pattern: &str, status: ProgressStatus) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            status,
        })
    }

    /// The status this rule transitions matched items to.
    #[must_use]
    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    /// Extracts the item key when the rule matches the line.
    #[must_use]
    pub fn key_from(&self, line: &str) -> Option<String> {
        let captures = self.pattern.captures(line)?;
        captures
            .name("key")
            .or_else(|| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

/// The default structured-event rule set.
#[must_use]
pub fn default_rules() -> Vec<ProgressRule> {
    // Both patterns are compile-time constants; failure here would be a
    // bug in this module, so fall back to an empty rule set.
    [
        (
            format!(r"^{EVENT_PREFIX}\s+start\s+(?P<key>.+)$"),
            ProgressStatus::InProgress,
        ),
        (
            format!(r"^{EVENT_PREFIX}\s+done\s+(?P<key>.+)$"),
            ProgressStatus::Completed,
        ),
    ]
    .into_iter()
    .filter_map(|(pattern, status)| ProgressRule::new(&pattern, status).ok())
    .collect()
}
