//! Error types for auction solving

use crate::{AgentId, Bundle};
use thiserror::Error;

/// Errors raised while configuring or solving an auction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuctionError {
    #[error("Invalid agent count: {0}")]
    InvalidAgentCount(i64),
    #[error("Invalid item count: {0}")]
    InvalidItemCount(i64),
    #[error("Too many items: {items} (at most {max} supported)")]
    TooManyItems { items: usize, max: usize },
    #[error("Agent count mismatch: expected {expected}, bid set has {actual}")]
    AgentCountMismatch { expected: usize, actual: usize },
    #[error("Item count mismatch: expected {expected}, got {actual}")]
    ItemCountMismatch { expected: usize, actual: usize },
    #[error("Bid of agent {agent} covers {actual} items, expected {expected}")]
    BidItemMismatch {
        agent: AgentId,
        expected: usize,
        actual: usize,
    },
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Agent {agent} has no utility for bundle {bundle}")]
    UndefinedBundle { agent: AgentId, bundle: Bundle },
    #[error("Bid leaves bundle {0} undefined")]
    MissingBundle(Bundle),
    #[error("Bid defines {actual} bundles, expected {expected}")]
    BidSizeMismatch { expected: usize, actual: usize },
    #[error("Bundle {bundle} lies outside the lattice of {num_items} items")]
    BundleOutOfRange { bundle: Bundle, num_items: usize },
    #[error("Invalid utility {utility} for bundle {bundle}")]
    InvalidUtility { bundle: Bundle, utility: f64 },
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),
    #[error("Allocation covers {actual} items, expected {expected}")]
    AllocationSizeMismatch { expected: usize, actual: usize },
    #[error("Search finished without an incumbent allocation")]
    MissingIncumbent,
}

impl AuctionError {
    /// Whether this error stems from bad input rather than a failed computation
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AuctionError::InvalidAgentCount(_)
                | AuctionError::InvalidItemCount(_)
                | AuctionError::TooManyItems { .. }
                | AuctionError::AgentCountMismatch { .. }
                | AuctionError::ItemCountMismatch { .. }
                | AuctionError::BidItemMismatch { .. }
                | AuctionError::Configuration(_)
        )
    }
}

/// A specialized Result type for auction operations
pub type Result<T> = std::result::Result<T, AuctionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_configuration_errors() {
        assert!(AuctionError::InvalidAgentCount(-1).is_configuration());
        assert!(AuctionError::TooManyItems { items: 40, max: 20 }.is_configuration());
        assert!(!AuctionError::UnknownAgent(3).is_configuration());
        assert!(
            !AuctionError::UndefinedBundle {
                agent: 1,
                bundle: Bundle::EMPTY,
            }
            .is_configuration()
        );
    }

    #[test]
    fn messages_name_the_offending_values() {
        let err = AuctionError::BidItemMismatch {
            agent: 2,
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Bid of agent 2 covers 4 items, expected 3");

        let err = AuctionError::UndefinedBundle {
            agent: 1,
            bundle: Bundle::from_items([0, 2]),
        };
        assert_eq!(err.to_string(), "Agent 1 has no utility for bundle {0, 2}");
    }
}
