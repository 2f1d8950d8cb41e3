//! Program configuration

use serde::{Deserialize, Serialize};
use zkprogram_core::{MaxProofsVerified, Result, ZkProgramError, DEFAULT_DUMMY_DOMAIN_LOG2};

/// Environment variable overriding the wrap domain
pub const WRAP_DOMAIN_ENV: &str = "ZKPROGRAM_WRAP_DOMAIN";
/// Environment variable overriding the dummy proof domain size
pub const DUMMY_DOMAIN_LOG2_ENV: &str = "ZKPROGRAM_DUMMY_DOMAIN_LOG2";

/// Configuration for compiling a program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Wrap domain to use instead of the one derived from the recursion bound
    pub override_wrap_domain: Option<u8>,
    /// Domain size (log2) of dummy proofs
    pub dummy_domain_log2: u32,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            override_wrap_domain: None,
            dummy_domain_log2: DEFAULT_DUMMY_DOMAIN_LOG2,
        }
    }
}

impl ProgramConfig {
    /// Defaults, overridden by `ZKPROGRAM_WRAP_DOMAIN` and
    /// `ZKPROGRAM_DUMMY_DOMAIN_LOG2` when set
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup(WRAP_DOMAIN_ENV) {
            let domain = value
                .trim()
                .parse::<u8>()
                .map_err(|e| ZkProgramError::Config(format!("{}: {}", WRAP_DOMAIN_ENV, e)))?;
            if domain > 2 {
                return Err(ZkProgramError::Config(format!(
                    "{} must be 0, 1 or 2, got {}",
                    WRAP_DOMAIN_ENV, domain
                )));
            }
            config.override_wrap_domain = Some(domain);
        }
        if let Some(value) = lookup(DUMMY_DOMAIN_LOG2_ENV) {
            config.dummy_domain_log2 = value.trim().parse::<u32>().map_err(|e| {
                ZkProgramError::Config(format!("{}: {}", DUMMY_DOMAIN_LOG2_ENV, e))
            })?;
        }
        Ok(config)
    }

    /// Wrap domain for a program with the given recursion bound
    pub fn wrap_domain(&self, max_proofs_verified: MaxProofsVerified) -> u8 {
        self.override_wrap_domain
            .unwrap_or(match max_proofs_verified {
                MaxProofsVerified::Zero => 0,
                MaxProofsVerified::One => 1,
                MaxProofsVerified::Two => 1,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_wrap_domain_mapping() {
        let config = ProgramConfig::default();
        assert_eq!(config.wrap_domain(MaxProofsVerified::Zero), 0);
        assert_eq!(config.wrap_domain(MaxProofsVerified::One), 1);
        assert_eq!(config.wrap_domain(MaxProofsVerified::Two), 1);
        assert_eq!(config.dummy_domain_log2, 14);
    }

    #[test]
    fn test_env_overrides() {
        let config = ProgramConfig::from_lookup(lookup(&[
            (WRAP_DOMAIN_ENV, "2"),
            (DUMMY_DOMAIN_LOG2_ENV, " 15 "),
        ]))
        .unwrap();
        assert_eq!(config.wrap_domain(MaxProofsVerified::Zero), 2);
        assert_eq!(config.dummy_domain_log2, 15);
        assert_eq!(
            ProgramConfig::from_lookup(lookup(&[])).unwrap(),
            ProgramConfig::default()
        );
    }

    #[test]
    fn test_invalid_env_values() {
        assert!(matches!(
            ProgramConfig::from_lookup(lookup(&[(WRAP_DOMAIN_ENV, "3")])),
            Err(ZkProgramError::Config(_))
        ));
        assert!(matches!(
            ProgramConfig::from_lookup(lookup(&[(DUMMY_DOMAIN_LOG2_ENV, "big")])),
            Err(ZkProgramError::Config(_))
        ));
    }
}
