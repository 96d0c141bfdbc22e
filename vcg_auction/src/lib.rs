//! Combinatorial auction solver with Vickrey–Clarke–Groves pricing
//!
//! Allocates `m` indivisible items among `n` bidders so that total welfare is
//! maximal, then charges every bidder the externality its presence imposes on
//! the others.
//!
//! Key pieces:
//! - [`generator`]: random bid sets covering the full bundle lattice
//! - [`search`]: exhaustive backtracking over all `(n+1)^m` allocations
//! - [`pricing`]: Clarke pivot payments (exact) or the runner-up approximation
//! - [`auction`]: search and pricing wired together behind one call
//!
//! Agent 0 is the "nobody" sentinel: items assigned to it stay unallocated and
//! it never bids, contributes welfare, or pays.

use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

pub mod auction;
pub mod config;
pub mod error;
pub mod generator;
pub mod logger;
pub mod pricing;
pub mod report;
pub mod search;

pub use error::{AuctionError, Result};
pub use pricing::PricingRule;
pub use search::SearchMode;

/// Bidder identifier; bidders are `1..=n`
pub type AgentId = usize;

/// Sentinel owner for items that go to nobody
pub const NOBODY: AgentId = 0;

/// Largest supported item count (every bid stores `2^m` utilities)
pub const MAX_ITEMS: usize = 20;

/// Number of bundles over `num_items` items
pub const fn lattice_size(num_items: usize) -> usize {
    1usize << num_items
}

pub(crate) fn check_item_count(num_items: usize) -> Result<()> {
    if num_items > MAX_ITEMS {
        return Err(AuctionError::TooManyItems {
            items: num_items,
            max: MAX_ITEMS,
        });
    }
    Ok(())
}

/// A subset of items; bit `i` is set iff item `i` is included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Bundle(u64);

impl Bundle {
    pub const EMPTY: Bundle = Bundle(0);

    pub const fn from_bits(bits: u64) -> Self {
        Bundle(bits)
    }

    pub fn from_items<I: IntoIterator<Item = usize>>(items: I) -> Self {
        items
            .into_iter()
            .fold(Bundle::EMPTY, |bundle, item| bundle.with_item(item))
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Items past the last bit are ignored
    pub const fn with_item(self, item: usize) -> Self {
        Bundle(self.0 | Self::bit(item))
    }

    pub const fn without_item(self, item: usize) -> Self {
        Bundle(self.0 & !Self::bit(item))
    }

    pub const fn contains(self, item: usize) -> bool {
        self.0 & Self::bit(item) != 0
    }

    const fn bit(item: usize) -> u64 {
        if item < u64::BITS as usize {
            1 << item
        } else {
            0
        }
    }

    /// Number of items in the bundle
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Items in ascending order
    pub fn items(self) -> impl Iterator<Item = usize> {
        (0..u64::BITS as usize).filter(move |&item| self.contains(item))
    }

    /// Every bundle over `num_items` items, in bit-pattern order
    pub fn lattice(num_items: usize) -> impl Iterator<Item = Bundle> {
        (0..lattice_size(num_items) as u64).map(Bundle)
    }

    /// Binary rendering padded to `num_items` digits (item 0 is the rightmost digit)
    pub fn to_binary(self, num_items: usize) -> String {
        format!("{:0width$b}", self.0, width = num_items.max(1))
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.items().map(|item| item.to_string()).collect();
        write!(f, "{{{}}}", items.join(", "))
    }
}

/// One agent's utility for every bundle over `num_items` items
///
/// Bids are total: a bid cannot be built with a gap in its lattice, so every
/// lookup inside the lattice succeeds and no default utility is ever substituted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bid {
    num_items: usize,
    utilities: Vec<f64>,
}

impl Bid {
    /// Build from utilities listed in bundle bit-pattern order (`2^m` values)
    pub fn from_values(num_items: usize, utilities: Vec<f64>) -> Result<Self> {
        check_item_count(num_items)?;
        let expected = lattice_size(num_items);
        if utilities.len() != expected {
            return Err(AuctionError::BidSizeMismatch {
                expected,
                actual: utilities.len(),
            });
        }
        for (bundle, &utility) in Bundle::lattice(num_items).zip(&utilities) {
            if !utility.is_finite() || utility < 0.0 {
                return Err(AuctionError::InvalidUtility { bundle, utility });
            }
        }
        Ok(Bid {
            num_items,
            utilities,
        })
    }

    /// Build from explicit `(bundle, utility)` pairs; every bundle must appear
    pub fn from_pairs<I>(num_items: usize, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Bundle, f64)>,
    {
        check_item_count(num_items)?;
        let mut utilities = vec![None; lattice_size(num_items)];
        for (bundle, utility) in pairs {
            let slot = utilities
                .get_mut(bundle.index())
                .ok_or(AuctionError::BundleOutOfRange { bundle, num_items })?;
            *slot = Some(utility);
        }
        let utilities = Bundle::lattice(num_items)
            .zip(utilities)
            .map(|(bundle, utility)| utility.ok_or(AuctionError::MissingBundle(bundle)))
            .collect::<Result<Vec<f64>>>()?;
        Bid::from_values(num_items, utilities)
    }

    /// Build by evaluating `utility` on every bundle
    pub fn from_fn<F>(num_items: usize, utility: F) -> Result<Self>
    where
        F: FnMut(Bundle) -> f64,
    {
        check_item_count(num_items)?;
        Bid::from_values(num_items, Bundle::lattice(num_items).map(utility).collect())
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Utility of `bundle`, or `None` if it lies outside this bid's lattice
    pub fn utility(&self, bundle: Bundle) -> Option<f64> {
        self.utilities.get(bundle.index()).copied()
    }

    /// `(bundle, utility)` for the whole lattice
    pub fn iter(&self) -> impl Iterator<Item = (Bundle, f64)> + '_ {
        Bundle::lattice(self.num_items).zip(self.utilities.iter().copied())
    }
}

/// Bids for agents `1..=n`; agent 0 has no bid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidSet {
    num_items: usize,
    bids: Vec<Bid>,
}

impl BidSet {
    /// `bids[k]` becomes the bid of agent `k + 1`
    pub fn new(num_items: usize, bids: Vec<Bid>) -> Result<Self> {
        check_item_count(num_items)?;
        for (index, bid) in bids.iter().enumerate() {
            if bid.num_items != num_items {
                return Err(AuctionError::BidItemMismatch {
                    agent: index + 1,
                    expected: num_items,
                    actual: bid.num_items,
                });
            }
        }
        Ok(BidSet { num_items, bids })
    }

    pub fn num_agents(&self) -> usize {
        self.bids.len()
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Bidder ids `1..=n`
    pub fn agents(&self) -> RangeInclusive<AgentId> {
        1..=self.num_agents()
    }

    pub fn bid(&self, agent: AgentId) -> Result<&Bid> {
        agent
            .checked_sub(1)
            .and_then(|index| self.bids.get(index))
            .ok_or(AuctionError::UnknownAgent(agent))
    }

    /// Utility `agent` assigns to `bundle`; fails loudly on any lookup gap
    pub fn utility(&self, agent: AgentId, bundle: Bundle) -> Result<f64> {
        self.bid(agent)?
            .utility(bundle)
            .ok_or(AuctionError::UndefinedBundle { agent, bundle })
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Bid)> {
        self.bids.iter().enumerate().map(|(index, bid)| (index + 1, bid))
    }

    /// Copy without `agent`; later agents shift down by one, order preserved
    pub fn without_agent(&self, agent: AgentId) -> Result<BidSet> {
        self.bid(agent)?;
        let bids = self
            .iter()
            .filter(|&(other, _)| other != agent)
            .map(|(_, bid)| bid.clone())
            .collect();
        Ok(BidSet {
            num_items: self.num_items,
            bids,
        })
    }
}

/// Owner of every item (`NOBODY` for unallocated items)
///
/// Stored as one owner per item, so each item belongs to exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Allocation {
    owners: Vec<AgentId>,
}

impl Allocation {
    /// Every item unallocated
    pub fn unallocated(num_items: usize) -> Self {
        Allocation {
            owners: vec![NOBODY; num_items],
        }
    }

    /// `owners[i]` receives item `i`; owners must be at most `num_agents`
    pub fn from_owners(owners: Vec<AgentId>, num_agents: usize) -> Result<Self> {
        check_item_count(owners.len())?;
        if let Some(&unknown) = owners.iter().find(|&&owner| owner > num_agents) {
            return Err(AuctionError::UnknownAgent(unknown));
        }
        Ok(Allocation { owners })
    }

    pub(crate) fn from_owners_unchecked(owners: Vec<AgentId>) -> Self {
        Allocation { owners }
    }

    pub fn num_items(&self) -> usize {
        self.owners.len()
    }

    pub fn owner(&self, item: usize) -> Option<AgentId> {
        self.owners.get(item).copied()
    }

    pub fn owners(&self) -> &[AgentId] {
        &self.owners
    }

    /// Items held by `agent`
    pub fn bundle_of(&self, agent: AgentId) -> Bundle {
        self.owners
            .iter()
            .enumerate()
            .filter(|&(_, &owner)| owner == agent)
            .fold(Bundle::EMPTY, |bundle, (item, _)| bundle.with_item(item))
    }

    /// One bundle per agent `0..=num_agents`
    pub fn bundles(&self, num_agents: usize) -> Result<Vec<Bundle>> {
        let mut bundles = vec![Bundle::EMPTY; num_agents + 1];
        for (item, &owner) in self.owners.iter().enumerate() {
            let bundle = bundles
                .get_mut(owner)
                .ok_or(AuctionError::UnknownAgent(owner))?;
            *bundle = bundle.with_item(item);
        }
        Ok(bundles)
    }

    /// Total utility of all bidders
    pub fn welfare(&self, bids: &BidSet) -> Result<f64> {
        self.welfare_excluding(bids, NOBODY)
    }

    /// Total utility of all bidders except `excluded`
    pub fn welfare_excluding(&self, bids: &BidSet, excluded: AgentId) -> Result<f64> {
        if self.num_items() != bids.num_items() {
            return Err(AuctionError::AllocationSizeMismatch {
                expected: bids.num_items(),
                actual: self.num_items(),
            });
        }
        let bundles = self.bundles(bids.num_agents())?;
        let mut welfare = 0.0;
        for agent in bids.agents().filter(|&agent| agent != excluded) {
            welfare += bids.utility(agent, bundles[agent])?;
        }
        Ok(welfare)
    }

    /// Utility `agent` derives from its own bundle
    pub fn value_of(&self, bids: &BidSet, agent: AgentId) -> Result<f64> {
        if agent == NOBODY {
            return Ok(0.0);
        }
        bids.utility(agent, self.bundle_of(agent))
    }
}

/// Chosen allocation, its welfare and every bidder's payment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub allocation: Allocation,
    pub welfare: f64,
    /// Indexed by agent `0..=n`; entry 0 is always 0
    pub payments: Vec<f64>,
    pub pricing: PricingRule,
}

impl Solution {
    pub fn num_agents(&self) -> usize {
        self.payments.len().saturating_sub(1)
    }

    /// Externality attributed to `agent`, whether or not it wins anything
    pub fn payment(&self, agent: AgentId) -> f64 {
        if agent == NOBODY {
            return 0.0;
        }
        self.payments.get(agent).copied().unwrap_or(0.0)
    }

    /// Amount actually charged: bidders who receive nothing pay nothing
    pub fn charge(&self, agent: AgentId) -> f64 {
        if self.allocation.bundle_of(agent).is_empty() {
            0.0
        } else {
            self.payment(agent)
        }
    }

    /// Agents holding a non-empty bundle
    pub fn winners(&self) -> impl Iterator<Item = AgentId> + '_ {
        (1..=self.num_agents()).filter(|&agent| !self.allocation.bundle_of(agent).is_empty())
    }

    /// Sum of all charges
    pub fn revenue(&self) -> f64 {
        self.winners().map(|agent| self.charge(agent)).sum()
    }

    /// Bidder surplus: value of its bundle minus its charge
    pub fn surplus(&self, bids: &BidSet, agent: AgentId) -> Result<f64> {
        Ok(self.allocation.value_of(bids, agent)? - self.charge(agent))
    }
}
