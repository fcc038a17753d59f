//! Environment-driven ledger configuration.

use storyloom_core::error::DomainError;

use crate::domain::aggregates::RewardRules;
use crate::domain::state::STARTING_POINTS;

/// Point values of the economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Points for the first visit of a node.
    pub visit_reward: u64,
    /// Points per distinct node of a completed route.
    pub route_bonus_per_node: u64,
    /// Points per story node once every ending is unlocked.
    pub completion_bonus_per_node: u64,
    /// Balance of a fresh record.
    pub starting_points: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            visit_reward: 5,
            route_bonus_per_node: 10,
            completion_bonus_per_node: 20,
            starting_points: STARTING_POINTS,
        }
    }
}

impl LedgerConfig {
    /// Reads overrides from `STORYLOOM_VISIT_REWARD`,
    /// `STORYLOOM_ROUTE_BONUS_PER_NODE`, `STORYLOOM_COMPLETION_BONUS_PER_NODE`
    /// and `STORYLOOM_STARTING_POINTS`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if a variable is not an unsigned
    /// integer.
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`], reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if a value is not an unsigned
    /// integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let defaults = Self::default();
        let read = |name: &str, default: u64| -> Result<u64, DomainError> {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| DomainError::Configuration(format!("{name}: {e}"))),
                None => Ok(default),
            }
        };
        Ok(Self {
            visit_reward: read("STORYLOOM_VISIT_REWARD", defaults.visit_reward)?,
            route_bonus_per_node: read(
                "STORYLOOM_ROUTE_BONUS_PER_NODE",
                defaults.route_bonus_per_node,
            )?,
            completion_bonus_per_node: read(
                "STORYLOOM_COMPLETION_BONUS_PER_NODE",
                defaults.completion_bonus_per_node,
            )?,
            starting_points: read("STORYLOOM_STARTING_POINTS", defaults.starting_points)?,
        })
    }

    /// The reward part of the configuration.
    #[must_use]
    pub fn rules(&self) -> RewardRules {
        RewardRules {
            visit_reward: self.visit_reward,
            route_bonus_per_node: self.route_bonus_per_node,
            completion_bonus_per_node: self.completion_bonus_per_node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_economy() {
        let config = LedgerConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.visit_reward, 5);
        assert_eq!(config.starting_points, 500);
    }

    #[test]
    fn test_overrides_and_errors() {
        let config = LedgerConfig::from_lookup(|name| {
            (name == "STORYLOOM_VISIT_REWARD").then(|| "7".to_owned())
        })
        .unwrap();
        let invalid = LedgerConfig::from_lookup(|name| {
            (name == "STORYLOOM_STARTING_POINTS").then(|| "-1".to_owned())
        });

        assert_eq!(config.visit_reward, 7);
        assert_eq!(config.route_bonus_per_node, 10);
        assert!(matches!(invalid, Err(DomainError::Configuration(_))));
    }
}
