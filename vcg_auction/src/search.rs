//! Exhaustive allocation search
//!
//! Walks every assignment of items to agents `0..=n` depth-first: item 0 is
//! decided first, and for each item agents are tried in ascending order, so
//! the first leaf visited is the all-unallocated allocation. A leaf replaces
//! the incumbent only when its welfare is strictly greater, which makes the
//! earliest-enumerated allocation win every tie.
//!
//! # Parallel search
//!
//! `SearchMode::Parallel` hands each choice for item 0 to its own rayon task.
//! Every task owns a private partial allocation and a local incumbent; the
//! local incumbents are merged in agent order once all tasks have joined, so
//! the result (including which of several tied allocations is returned) is
//! identical to a sequential run.

use crate::{AgentId, Allocation, AuctionError, BidSet, Bundle, NOBODY, Result, check_item_count};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How the search tree is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Single depth-first walk on the calling thread
    Sequential,
    /// One rayon task per top-level branch
    #[default]
    Parallel,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Sequential => write!(f, "sequential"),
            SearchMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// An allocation together with its welfare
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub allocation: Allocation,
    pub welfare: f64,
}

/// Counters collected during one search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    pub leaves_evaluated: u64,
    pub incumbent_updates: u64,
    pub elapsed: Duration,
}

impl SearchStats {
    fn absorb(&mut self, other: &SearchStats) {
        self.leaves_evaluated += other.leaves_evaluated;
        self.incumbent_updates += other.incumbent_updates;
    }
}

/// Result of a completed search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Candidate,
    /// Second-best allocation over the whole search space, when tracked
    pub runner_up: Option<Candidate>,
    pub stats: SearchStats,
}

/// Best and runner-up allocations seen so far
#[derive(Debug, Default)]
struct Incumbent {
    best: Option<Candidate>,
    runner_up: Option<Candidate>,
    track_runner_up: bool,
    updates: u64,
}

impl Incumbent {
    fn new(track_runner_up: bool) -> Self {
        Incumbent {
            track_runner_up,
            ..Default::default()
        }
    }

    /// Consider an allocation of the given welfare; `allocation` is only
    /// materialized when the candidate is kept
    fn offer<F>(&mut self, welfare: f64, allocation: F)
    where
        F: FnOnce() -> Allocation,
    {
        if self.best.as_ref().is_none_or(|best| welfare > best.welfare) {
            let candidate = Candidate {
                allocation: allocation(),
                welfare,
            };
            let displaced = self.best.replace(candidate);
            if self.track_runner_up && displaced.is_some() {
                self.runner_up = displaced;
            }
            self.updates += 1;
            trace!(welfare, "new incumbent");
        } else if self.track_runner_up
            && self
                .runner_up
                .as_ref()
                .is_none_or(|runner_up| welfare > runner_up.welfare)
        {
            self.runner_up = Some(Candidate {
                allocation: allocation(),
                welfare,
            });
        }
    }

    /// Fold in the incumbent of a branch enumerated after everything seen so far
    fn merge(&mut self, other: Incumbent) {
        let updates = self.updates + other.updates;
        if let Some(best) = other.best {
            self.offer(best.welfare, || best.allocation);
        }
        if let Some(runner_up) = other.runner_up {
            self.offer(runner_up.welfare, || runner_up.allocation);
        }
        self.updates = updates;
    }
}

/// Item assignment under construction; per-agent bundles are kept in step with
/// the owners so a leaf can be scored without re-folding bit vectors
#[derive(Debug, Clone)]
struct PartialAllocation {
    owners: Vec<AgentId>,
    bundles: Vec<Bundle>,
}

impl PartialAllocation {
    fn new(num_agents: usize, num_items: usize) -> Self {
        PartialAllocation {
            owners: vec![NOBODY; num_items],
            bundles: vec![Bundle::EMPTY; num_agents + 1],
        }
    }

    /// Give `item` to `agent` until the returned guard is dropped
    fn assign(&mut self, item: usize, agent: AgentId) -> Assigned<'_> {
        self.owners[item] = agent;
        self.bundles[agent] = self.bundles[agent].with_item(item);
        Assigned {
            partial: self,
            item,
            agent,
        }
    }

    fn snapshot(&self) -> Allocation {
        Allocation::from_owners_unchecked(self.owners.clone())
    }
}

/// Scoped assignment: undone on drop, whichever way the scope is left
struct Assigned<'a> {
    partial: &'a mut PartialAllocation,
    item: usize,
    agent: AgentId,
}

impl Deref for Assigned<'_> {
    type Target = PartialAllocation;

    fn deref(&self) -> &PartialAllocation {
        self.partial
    }
}

impl DerefMut for Assigned<'_> {
    fn deref_mut(&mut self) -> &mut PartialAllocation {
        self.partial
    }
}

impl Drop for Assigned<'_> {
    fn drop(&mut self) {
        let (item, agent) = (self.item, self.agent);
        self.partial.bundles[agent] = self.partial.bundles[agent].without_item(item);
        self.partial.owners[item] = NOBODY;
    }
}

/// Exhaustive search over one bid set
pub struct Searcher<'a> {
    bids: &'a BidSet,
    num_agents: usize,
    num_items: usize,
    track_runner_up: bool,
}

impl<'a> Searcher<'a> {
    /// `num_agents` and `num_items` must describe `bids`
    pub fn new(bids: &'a BidSet, num_agents: usize, num_items: usize) -> Result<Self> {
        check_item_count(num_items)?;
        if num_agents != bids.num_agents() {
            return Err(AuctionError::AgentCountMismatch {
                expected: num_agents,
                actual: bids.num_agents(),
            });
        }
        if num_items != bids.num_items() {
            return Err(AuctionError::ItemCountMismatch {
                expected: num_items,
                actual: bids.num_items(),
            });
        }
        Ok(Searcher {
            bids,
            num_agents,
            num_items,
            track_runner_up: false,
        })
    }

    /// Also keep the second-best allocation of the whole search space
    pub fn with_runner_up(mut self, track: bool) -> Self {
        self.track_runner_up = track;
        self
    }

    /// Number of leaves the search visits: `(n+1)^m`, saturating
    pub fn search_space(&self) -> u128 {
        (self.num_agents as u128 + 1).saturating_pow(self.num_items as u32)
    }

    pub fn run(&self, mode: SearchMode) -> Result<SearchOutcome> {
        let start = Instant::now();
        let (incumbent, mut stats) = match mode {
            SearchMode::Sequential => self.run_sequential()?,
            SearchMode::Parallel => self.run_parallel()?,
        };
        stats.incumbent_updates = incumbent.updates;
        stats.elapsed = start.elapsed();

        let best = incumbent.best.ok_or(AuctionError::MissingIncumbent)?;
        debug!(
            agents = self.num_agents,
            items = self.num_items,
            %mode,
            leaves = stats.leaves_evaluated,
            welfare = best.welfare,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "search complete"
        );

        Ok(SearchOutcome {
            best,
            runner_up: incumbent.runner_up,
            stats,
        })
    }

    fn run_sequential(&self) -> Result<(Incumbent, SearchStats)> {
        let mut partial = PartialAllocation::new(self.num_agents, self.num_items);
        let mut incumbent = Incumbent::new(self.track_runner_up);
        let mut stats = SearchStats::default();
        self.descend(&mut partial, 0, &mut incumbent, &mut stats)?;
        Ok((incumbent, stats))
    }

    fn run_parallel(&self) -> Result<(Incumbent, SearchStats)> {
        if self.num_items == 0 || self.num_agents == 0 {
            return self.run_sequential();
        }

        let branches: Vec<(Incumbent, SearchStats)> = (NOBODY..=self.num_agents)
            .into_par_iter()
            .map(|agent| -> Result<(Incumbent, SearchStats)> {
                let mut partial = PartialAllocation::new(self.num_agents, self.num_items);
                let mut local = Incumbent::new(self.track_runner_up);
                let mut stats = SearchStats::default();
                let mut assigned = partial.assign(0, agent);
                self.descend(&mut assigned, 1, &mut local, &mut stats)?;
                Ok((local, stats))
            })
            .collect::<Result<_>>()?;

        let mut incumbent = Incumbent::new(self.track_runner_up);
        let mut stats = SearchStats::default();
        for (local, branch_stats) in branches {
            incumbent.merge(local);
            stats.absorb(&branch_stats);
        }
        Ok((incumbent, stats))
    }

    fn descend(
        &self,
        partial: &mut PartialAllocation,
        item: usize,
        incumbent: &mut Incumbent,
        stats: &mut SearchStats,
    ) -> Result<()> {
        if item == self.num_items {
            return self.evaluate_leaf(partial, incumbent, stats);
        }
        for agent in NOBODY..=self.num_agents {
            let mut assigned = partial.assign(item, agent);
            self.descend(&mut assigned, item + 1, incumbent, stats)?;
        }
        Ok(())
    }

    fn evaluate_leaf(
        &self,
        partial: &PartialAllocation,
        incumbent: &mut Incumbent,
        stats: &mut SearchStats,
    ) -> Result<()> {
        stats.leaves_evaluated += 1;
        let mut welfare = 0.0;
        for agent in 1..=self.num_agents {
            welfare += self.bids.utility(agent, partial.bundles[agent])?;
        }
        incumbent.offer(welfare, || partial.snapshot());
        Ok(())
    }
}

/// Welfare-maximizing allocation of `bids` (no runner-up tracking)
pub fn solve_allocation(
    bids: &BidSet,
    num_agents: usize,
    num_items: usize,
    mode: SearchMode,
) -> Result<SearchOutcome> {
    Searcher::new(bids, num_agents, num_items)?.run(mode)
}
