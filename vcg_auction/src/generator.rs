//! Random bid sets over the full bundle lattice
//!
//! Every bundle `S` receives `|S| * u` with a fresh `u ~ U[0, 1)`. Utility grows
//! with bundle size in expectation only: each bundle is drawn independently, so
//! a superset can end up worth less than one of its subsets.

use crate::{Bid, BidSet, Bundle, Result, check_item_count};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One random bid over `num_items` items
pub fn random_bid<R: Rng>(num_items: usize, rng: &mut R) -> Result<Bid> {
    check_item_count(num_items)?;
    let utilities = Bundle::lattice(num_items)
        .map(|bundle| bundle.len() as f64 * rng.random::<f64>())
        .collect();
    Bid::from_values(num_items, utilities)
}

/// Random bids for agents `1..=num_agents`
pub fn random_bid_set<R: Rng>(
    num_agents: usize,
    num_items: usize,
    rng: &mut R,
) -> Result<BidSet> {
    let bids = (0..num_agents)
        .map(|_| random_bid(num_items, &mut *rng))
        .collect::<Result<Vec<Bid>>>()?;
    BidSet::new(num_items, bids)
}

/// Reproducible bid set drawn from `StdRng::seed_from_u64(seed)`
pub fn seeded_bid_set(num_agents: usize, num_items: usize, seed: u64) -> Result<BidSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_bid_set(num_agents, num_items, &mut rng)
}
