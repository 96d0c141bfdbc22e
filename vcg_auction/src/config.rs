//! Run configuration
//!
//! Loaded from command-line counts or a TOML file such as:
//!
//! ```toml
//! num_agents = 3
//! num_items = 4
//! seed = 42
//! search = "parallel"      # or "sequential"
//! pricing = "clarke"       # or "runner_up"
//! ```

use crate::{AuctionError, MAX_ITEMS, PricingRule, Result, SearchMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Instance size and solver settings for one auction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuctionConfig {
    pub num_agents: usize,
    pub num_items: usize,
    /// Seed for bid generation; wall-clock time when absent
    pub seed: Option<u64>,
    pub search: SearchMode,
    pub pricing: PricingRule,
}

impl AuctionConfig {
    /// Counts as supplied by embedding code; zero is allowed, negatives are not
    pub fn new(num_agents: i64, num_items: i64) -> Result<Self> {
        let num_agents =
            usize::try_from(num_agents).map_err(|_| AuctionError::InvalidAgentCount(num_agents))?;
        let num_items =
            usize::try_from(num_items).map_err(|_| AuctionError::InvalidItemCount(num_items))?;
        let config = AuctionConfig {
            num_agents,
            num_items,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Counts as typed on the command line, where both must be positive
    pub fn from_cli(num_agents: i64, num_items: i64) -> Result<Self> {
        if num_agents <= 0 {
            return Err(AuctionError::InvalidAgentCount(num_agents));
        }
        if num_items <= 0 {
            return Err(AuctionError::InvalidItemCount(num_items));
        }
        Self::new(num_agents, num_items)
    }

    /// Small reproducible instance used for demonstrations
    pub fn demo() -> Self {
        AuctionConfig {
            num_agents: 3,
            num_items: 4,
            seed: Some(42),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = search;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingRule) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_items > MAX_ITEMS {
            return Err(AuctionError::TooManyItems {
                items: self.num_items,
                max: MAX_ITEMS,
            });
        }
        Ok(())
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AuctionConfig = toml::from_str(source)
            .map_err(|e| AuctionError::Configuration(format!("invalid TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            AuctionError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// The configured seed, or one derived from the wall clock
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos() as u64)
                .unwrap_or_default()
        })
    }
}

impl Default for AuctionConfig {
    fn default() -> Self {
        AuctionConfig {
            num_agents: 2,
            num_items: 2,
            seed: None,
            search: SearchMode::Parallel,
            pricing: PricingRule::Clarke,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_counts_are_configuration_errors() {
        assert_eq!(
            AuctionConfig::new(-1, 2),
            Err(AuctionError::InvalidAgentCount(-1))
        );
        assert_eq!(
            AuctionConfig::new(2, -3),
            Err(AuctionError::InvalidItemCount(-3))
        );
        assert!(AuctionConfig::new(-1, 2).unwrap_err().is_configuration());
    }

    #[test]
    fn zero_counts_are_allowed_for_embedding_code_only() {
        let config = AuctionConfig::new(0, 0).unwrap();
        assert_eq!((config.num_agents, config.num_items), (0, 0));
        assert_eq!(
            AuctionConfig::from_cli(0, 3),
            Err(AuctionError::InvalidAgentCount(0))
        );
        assert_eq!(
            AuctionConfig::from_cli(3, 0),
            Err(AuctionError::InvalidItemCount(0))
        );
    }

    #[test]
    fn item_count_is_capped() {
        assert_eq!(
            AuctionConfig::from_cli(2, MAX_ITEMS as i64 + 1),
            Err(AuctionError::TooManyItems {
                items: MAX_ITEMS + 1,
                max: MAX_ITEMS
            })
        );
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config = AuctionConfig::from_toml_str(
            r#"
            num_agents = 4
            num_items = 3
            pricing = "runner_up"
            "#,
        )
        .unwrap();
        assert_eq!(config.num_agents, 4);
        assert_eq!(config.num_items, 3);
        assert_eq!(config.pricing, PricingRule::RunnerUp);
        assert_eq!(config.search, SearchMode::Parallel);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = AuctionConfig::from_toml_str("num_agents = \"three\"").unwrap_err();
        assert!(err.is_configuration());

        let err = AuctionConfig::from_toml_str("search = \"breadth_first\"").unwrap_err();
        assert!(err.is_configuration());

        let err = AuctionConfig::from_toml_str("agents = 3").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AuctionConfig::from_toml_file("/nonexistent/auction.toml").unwrap_err();
        assert!(matches!(err, AuctionError::Configuration(msg) if msg.contains("cannot read")));
    }

    #[test]
    fn explicit_seed_wins() {
        assert_eq!(AuctionConfig::demo().resolve_seed(), 42);
        assert_eq!(AuctionConfig::default().with_seed(7).resolve_seed(), 7);
    }
}
