//! VCG payments
//!
//! A bidder pays the welfare the others lose because it takes part:
//!
//! ```text
//! payment_i = W(best allocation without i) - (W(chosen allocation) - v_i(S_i))
//! ```
//!
//! [`PricingRule::Clarke`] computes the first term exactly by re-solving the
//! auction once per bidder. [`PricingRule::RunnerUp`] substitutes the welfare
//! of the globally second-best allocation for every bidder; that allocation is
//! generally not the optimum without any particular bidder, so those payments
//! are an approximation and may even be negative.

use crate::search::{SearchMode, SearchOutcome, solve_allocation};
use crate::{AgentId, Allocation, BidSet, NOBODY, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// How the "without this bidder" welfare is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingRule {
    /// Re-solve without each bidder (exact VCG)
    #[default]
    Clarke,
    /// Reuse the runner-up welfare of the single search (approximate)
    RunnerUp,
}

impl PricingRule {
    pub fn is_exact(self) -> bool {
        matches!(self, PricingRule::Clarke)
    }
}

impl fmt::Display for PricingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingRule::Clarke => write!(f, "Clarke pivot (exact)"),
            PricingRule::RunnerUp => write!(f, "runner-up (approximate)"),
        }
    }
}

/// Exact VCG payments, indexed `0..=n` with entry 0 fixed at 0
///
/// Every bidder costs one extra search over `n - 1` agents; in parallel mode
/// those searches run concurrently.
pub fn clarke_payments(bids: &BidSet, allocation: &Allocation, mode: SearchMode) -> Result<Vec<f64>> {
    let externality = |agent| clarke_externality(bids, allocation, agent, mode);
    let externalities: Vec<f64> = match mode {
        SearchMode::Sequential => bids.agents().map(externality).collect::<Result<_>>()?,
        SearchMode::Parallel => bids
            .agents()
            .into_par_iter()
            .map(externality)
            .collect::<Result<_>>()?,
    };
    Ok(with_nobody(externalities))
}

/// Payment of a single bidder under the Clarke pivot rule
pub fn clarke_externality(
    bids: &BidSet,
    allocation: &Allocation,
    agent: AgentId,
    mode: SearchMode,
) -> Result<f64> {
    let reduced = bids.without_agent(agent)?;
    let without = solve_allocation(&reduced, reduced.num_agents(), reduced.num_items(), mode)?
        .best
        .welfare;
    let others = allocation.welfare_excluding(bids, agent)?;
    debug!(agent, without, others, "re-solved without agent");
    Ok(without - others)
}

/// Approximate payments using `runner_up_welfare` as every bidder's
/// "without me" welfare; a missing runner-up (single-leaf search) counts as 0
pub fn runner_up_payments(
    bids: &BidSet,
    allocation: &Allocation,
    runner_up_welfare: Option<f64>,
) -> Result<Vec<f64>> {
    let without = runner_up_welfare.unwrap_or(0.0);
    let payments = bids
        .agents()
        .map(|agent| -> Result<f64> { Ok(without - allocation.welfare_excluding(bids, agent)?) })
        .collect::<Result<Vec<f64>>>()?;
    Ok(with_nobody(payments))
}

/// Payments for the best allocation of `outcome` under `rule`
pub fn price(
    bids: &BidSet,
    outcome: &SearchOutcome,
    rule: PricingRule,
    mode: SearchMode,
) -> Result<Vec<f64>> {
    match rule {
        PricingRule::Clarke => clarke_payments(bids, &outcome.best.allocation, mode),
        PricingRule::RunnerUp => runner_up_payments(
            bids,
            &outcome.best.allocation,
            outcome.runner_up.as_ref().map(|candidate| candidate.welfare),
        ),
    }
}

fn with_nobody(bidder_payments: Vec<f64>) -> Vec<f64> {
    let mut payments = Vec::with_capacity(bidder_payments.len() + 1);
    payments.push(0.0);
    payments.extend(bidder_payments);
    debug_assert_eq!(payments[NOBODY], 0.0);
    payments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Searcher;
    use crate::{AuctionError, Bid, Bundle};

    /// Two items; agent 1 only values the pair, agents 2 and 3 each want one item
    fn complements_bids() -> BidSet {
        let pair_lover = Bid::from_values(2, vec![0.0, 0.0, 0.0, 10.0]).unwrap();
        let wants_item0 = Bid::from_fn(2, |b| if b.contains(0) { 6.0 } else { 0.0 }).unwrap();
        let wants_item1 = Bid::from_fn(2, |b| if b.contains(1) { 6.0 } else { 0.0 }).unwrap();
        BidSet::new(2, vec![pair_lover, wants_item0, wants_item1]).unwrap()
    }

    #[test]
    fn clarke_charges_winners_their_externality() {
        let bids = complements_bids();
        let outcome = solve_allocation(&bids, 3, 2, SearchMode::Sequential).unwrap();
        assert_eq!(outcome.best.allocation.owners(), &[2, 3]);
        assert_eq!(outcome.best.welfare, 12.0);

        let payments = clarke_payments(&bids, &outcome.best.allocation, SearchMode::Sequential).unwrap();
        // Without agent 2: agent 1 takes the pair (10), agent 3 currently gets 6 -> pays 4
        assert_eq!(payments, vec![0.0, 0.0, 4.0, 4.0]);
    }

    #[test]
    fn clarke_is_the_same_in_both_modes() {
        let bids = complements_bids();
        let allocation = Allocation::from_owners(vec![2, 3], 3).unwrap();
        assert_eq!(
            clarke_payments(&bids, &allocation, SearchMode::Sequential).unwrap(),
            clarke_payments(&bids, &allocation, SearchMode::Parallel).unwrap()
        );
    }

    #[test]
    fn runner_up_uses_one_welfare_for_everyone() {
        let bids = complements_bids();
        let outcome = Searcher::new(&bids, 3, 2)
            .unwrap()
            .with_runner_up(true)
            .run(SearchMode::Sequential)
            .unwrap();
        // Runner-up is the pair going to agent 1
        assert_eq!(outcome.runner_up.as_ref().unwrap().welfare, 10.0);

        let payments = price(&bids, &outcome, PricingRule::RunnerUp, SearchMode::Sequential).unwrap();
        assert_eq!(payments, vec![0.0, -2.0, 4.0, 4.0]);
    }

    #[test]
    fn missing_runner_up_counts_as_zero() {
        let bids = BidSet::new(0, vec![Bid::from_values(0, vec![0.0]).unwrap()]).unwrap();
        let payments = runner_up_payments(&bids, &Allocation::unallocated(0), None).unwrap();
        assert_eq!(payments, vec![0.0, 0.0]);
    }

    #[test]
    fn pricing_an_allocation_of_the_wrong_size_fails() {
        let bids = complements_bids();
        let result = clarke_payments(&bids, &Allocation::unallocated(1), SearchMode::Sequential);
        assert_eq!(
            result,
            Err(AuctionError::AllocationSizeMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn removing_the_only_bidder_leaves_zero_welfare() {
        let bids = BidSet::new(1, vec![Bid::from_values(1, vec![0.0, 5.0]).unwrap()]).unwrap();
        let allocation = Allocation::from_owners(vec![1], 1).unwrap();
        assert_eq!(
            clarke_externality(&bids, &allocation, 1, SearchMode::Parallel).unwrap(),
            0.0
        );
        assert_eq!(allocation.bundle_of(1), Bundle::from_bits(1));
    }
}
