//! External capability detection.
//!
//! Stages that call paid or optional services (AI completion, image
//! generation) declare a capability name; the invoker consults a
//! [`CapabilitySet`] before launching them and takes the documented
//! fallback path when the capability is missing.

use std::collections::HashSet;

/// The set of external capabilities available to a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    names: HashSet<String>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from capability names.
    #[must_use]
    pub fn from_names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Detects capabilities from the process environment.
    ///
    /// Each `(capability, env_var)` pair grants the capability when the
    /// environment variable is set to a non-empty value, e.g.
    /// `[("ai-completion", "OPENAI_API_KEY")]`.
    #[must_use]
    pub fn from_env<'a>(mappings: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let names = mappings
            .into_iter()
            .filter(|(_, var)| std::env::var(var).is_ok_and(|v| !v.trim().is_empty()))
            .map(|(cap, _)| cap.to_string())
            .collect();
        Self { names }
    }

    /// Grants a capability.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    /// Returns true when the capability is available.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of available capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no capabilities are available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_names_and_contains() {
        let caps = CapabilitySet::from_names(["ai-completion", "image-generation"]);
        assert!(caps.contains("ai-completion"));
        assert!(!caps.contains("web-search"));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn test_with() {
        let caps = CapabilitySet::new().with("ai-completion");
        assert!(caps.contains("ai-completion"));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("SITEFORGE_TEST_CAP_SET", "key-value");
        std::env::set_var("SITEFORGE_TEST_CAP_BLANK", "   ");
        std::env::remove_var("SITEFORGE_TEST_CAP_UNSET");

        let caps = CapabilitySet::from_env([
            ("set", "SITEFORGE_TEST_CAP_SET"),
            ("blank", "SITEFORGE_TEST_CAP_BLANK"),
            ("unset", "SITEFORGE_TEST_CAP_UNSET"),
        ]);

        assert!(caps.contains("set"));
        assert!(!caps.contains("blank"));
        assert!(!caps.contains("unset"));
    }
}
