//! Search and pricing wired together

use crate::config::AuctionConfig;
use crate::generator::seeded_bid_set;
use crate::pricing::{self, PricingRule};
use crate::search::{SearchMode, SearchStats, Searcher};
use crate::{AuctionError, BidSet, Result, Solution};
use std::time::{Duration, Instant};
use tracing::info;

/// Timings and counters of one solve
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveStats {
    pub search: SearchStats,
    pub pricing_elapsed: Duration,
    /// Full searches performed, including one per bidder under Clarke pricing
    pub searches_run: usize,
}

/// A sealed-bid combinatorial auction over a fixed bid set
#[derive(Debug, Clone)]
pub struct Auction {
    bids: BidSet,
    search: SearchMode,
    pricing: PricingRule,
}

impl Auction {
    pub fn new(bids: BidSet) -> Self {
        Auction {
            bids,
            search: SearchMode::default(),
            pricing: PricingRule::default(),
        }
    }

    /// Use `config`'s solver settings; its counts must describe `bids`
    pub fn from_config(bids: BidSet, config: &AuctionConfig) -> Result<Self> {
        config.validate()?;
        if bids.num_agents() != config.num_agents {
            return Err(AuctionError::AgentCountMismatch {
                expected: config.num_agents,
                actual: bids.num_agents(),
            });
        }
        if bids.num_items() != config.num_items {
            return Err(AuctionError::ItemCountMismatch {
                expected: config.num_items,
                actual: bids.num_items(),
            });
        }
        Ok(Auction::new(bids)
            .search_mode(config.search)
            .pricing(config.pricing))
    }

    /// Random instance drawn from `config` (seeded from the clock if unset)
    pub fn random(config: &AuctionConfig) -> Result<Self> {
        config.validate()?;
        let bids = seeded_bid_set(config.num_agents, config.num_items, config.resolve_seed())?;
        Auction::from_config(bids, config)
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search = mode;
        self
    }

    pub fn pricing(mut self, rule: PricingRule) -> Self {
        self.pricing = rule;
        self
    }

    pub fn bids(&self) -> &BidSet {
        &self.bids
    }

    pub fn solve(&self) -> Result<Solution> {
        self.solve_with_stats().map(|(solution, _)| solution)
    }

    pub fn solve_with_stats(&self) -> Result<(Solution, SolveStats)> {
        let num_agents = self.bids.num_agents();
        let outcome = Searcher::new(&self.bids, num_agents, self.bids.num_items())?
            .with_runner_up(self.pricing == PricingRule::RunnerUp)
            .run(self.search)?;

        let start = Instant::now();
        let payments = pricing::price(&self.bids, &outcome, self.pricing, self.search)?;
        let pricing_elapsed = start.elapsed();

        let searches_run = match self.pricing {
            PricingRule::Clarke => 1 + num_agents,
            PricingRule::RunnerUp => 1,
        };
        info!(
            agents = num_agents,
            items = self.bids.num_items(),
            welfare = outcome.best.welfare,
            pricing = %self.pricing,
            searches_run,
            "auction solved"
        );

        let solution = Solution {
            allocation: outcome.best.allocation,
            welfare: outcome.best.welfare,
            payments,
            pricing: self.pricing,
        };
        let stats = SolveStats {
            search: outcome.stats,
            pricing_elapsed,
            searches_run,
        };
        Ok((solution, stats))
    }
}
