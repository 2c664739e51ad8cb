//! Conformance harness configuration

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

pub const STRING_LENGTH_ENV: &str = "KEYSTASH_STRING_LENGTH";
pub const SEED_ENV: &str = "KEYSTASH_SEED";

const DEFAULT_STRING_LENGTH: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(len) => len,
    None => panic!("default string length must be non-zero"),
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Length in characters of every generated service, username and password
    pub string_length: NonZeroUsize,
    /// Fixed RNG seed; a random one is drawn per suite when unset
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            string_length: DEFAULT_STRING_LENGTH,
            seed: None,
        }
    }
}

impl HarnessConfig {
    /// Read overrides from `KEYSTASH_STRING_LENGTH` and `KEYSTASH_SEED`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(STRING_LENGTH_ENV) {
            match raw.trim().parse::<NonZeroUsize>() {
                Ok(len) => config.string_length = len,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid {}", STRING_LENGTH_ENV),
            }
        }

        if let Some(raw) = lookup(SEED_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.seed = Some(seed),
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid {}", SEED_ENV),
            }
        }

        tracing::debug!(string_length = config.string_length, seed = ?config.seed, "Harness config");
        config
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_string_length(mut self, string_length: NonZeroUsize) -> Self {
        self.string_length = string_length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::from_lookup(lookup(&[]));
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.string_length.get(), 20);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_overrides() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (STRING_LENGTH_ENV, "32"),
            (SEED_ENV, " 99 "),
        ]));
        assert_eq!(config.string_length.get(), 32);
        assert_eq!(config.seed, Some(99));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (STRING_LENGTH_ENV, "0"),
            (SEED_ENV, "not-a-number"),
        ]));
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn test_from_json_partial() {
        let config = HarnessConfig::from_json(r#"{"seed": 7}"#).unwrap();
        assert_eq!(config, HarnessConfig::default().with_seed(7));

        let config = HarnessConfig::from_json(r#"{"string_length": 8}"#).unwrap();
        assert_eq!(
            config,
            HarnessConfig::default().with_string_length(NonZeroUsize::new(8).unwrap())
        );
    }

    #[test]
    fn test_from_json_rejects_zero_length() {
        assert!(HarnessConfig::from_json(r#"{"string_length": 0}"#).is_err());
    }
}
