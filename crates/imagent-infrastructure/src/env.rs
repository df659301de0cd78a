//! Environment variable source.
//!
//! Loaders read variables through [`Environment`] rather than `std::env`
//! directly, so tests can supply fixed values without touching the process
//! environment.

use std::collections::HashMap;
use std::sync::Arc;

/// A read-only view of environment variables.
#[derive(Clone)]
pub struct Environment {
    lookup: Arc<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl Environment {
    /// Reads from the process environment.
    pub fn process() -> Self {
        Self {
            lookup: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Reads from a fixed set of pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            lookup: Arc::new(move |key| vars.get(key).cloned()),
        }
    }

    /// An environment with no variables set.
    pub fn empty() -> Self {
        Self::from_pairs(std::iter::empty::<(String, String)>())
    }

    /// Returns the trimmed value of `key`, treating blank values as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::process()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_unset() {
        let env = Environment::from_pairs([("A", " x "), ("B", "   ")]);
        assert_eq!(env.get("A").as_deref(), Some("x"));
        assert_eq!(env.get("B"), None);
        assert_eq!(env.get("C"), None);
        assert_eq!(Environment::empty().get("A"), None);
    }
}
