//! Human-readable and JSON views of bids and solutions

use crate::auction::SolveStats;
use crate::{AgentId, BidSet, NOBODY, PricingRule, Result, Solution};
use serde::Serialize;
use std::time::Duration;

/// One bidder's line in a solution report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReport {
    pub agent: AgentId,
    /// Binary bundle, item 0 rightmost
    pub bundle: String,
    pub items: Vec<usize>,
    pub value: f64,
    pub payment: f64,
    pub charge: f64,
}

/// Wall-clock cost of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timings {
    pub generation_ms: f64,
    pub search_ms: f64,
    pub pricing_ms: f64,
    pub leaves_evaluated: u64,
    pub searches_run: usize,
}

impl Timings {
    pub fn new(generation: Duration, stats: &SolveStats) -> Self {
        Timings {
            generation_ms: millis(generation),
            search_ms: millis(stats.search.elapsed),
            pricing_ms: millis(stats.pricing_elapsed),
            leaves_evaluated: stats.search.leaves_evaluated,
            searches_run: stats.searches_run,
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionReport {
    pub num_agents: usize,
    pub num_items: usize,
    pub pricing: PricingRule,
    pub exact_pricing: bool,
    pub welfare: f64,
    pub revenue: f64,
    pub unallocated: Vec<usize>,
    pub agents: Vec<AgentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings: Option<Timings>,
}

impl SolutionReport {
    pub fn new(bids: &BidSet, solution: &Solution) -> Result<Self> {
        let num_items = bids.num_items();
        let agents = bids
            .agents()
            .map(|agent| -> Result<AgentReport> {
                let bundle = solution.allocation.bundle_of(agent);
                Ok(AgentReport {
                    agent,
                    bundle: bundle.to_binary(num_items),
                    items: bundle.items().collect(),
                    value: solution.allocation.value_of(bids, agent)?,
                    payment: solution.payment(agent),
                    charge: solution.charge(agent),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SolutionReport {
            num_agents: bids.num_agents(),
            num_items,
            pricing: solution.pricing,
            exact_pricing: solution.pricing.is_exact(),
            welfare: solution.welfare,
            revenue: solution.revenue(),
            unallocated: solution.allocation.bundle_of(NOBODY).items().collect(),
            agents,
            timings: None,
        })
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = Some(timings);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render(&self) -> String {
        let mut out = format!("Optimal allocation (welfare {:.6})\n", self.welfare);
        for line in &self.agents {
            out.push_str(&format!(
                "  Agent {:>3}: {} value {:>10.6}  payment {:>10.6}  charged {:>10.6}\n",
                line.agent, line.bundle, line.value, line.payment, line.charge
            ));
        }
        out.push_str(&format!("  Unallocated items: {:?}\n", self.unallocated));
        out.push_str(&format!("Pricing: {}\n", self.pricing));
        if !self.exact_pricing {
            out.push_str(
                "  (runner-up payments approximate VCG and may differ from the exact externality)\n",
            );
        }
        out.push_str(&format!("Revenue: {:.6}\n", self.revenue));
        if let Some(timings) = &self.timings {
            out.push_str(&format!(
                "Generating bids took {:.3} ms; search took {:.3} ms over {} leaves; pricing took {:.3} ms ({} searches)\n",
                timings.generation_ms,
                timings.search_ms,
                timings.leaves_evaluated,
                timings.pricing_ms,
                timings.searches_run
            ));
        }
        out
    }
}

/// Every bidder's utility for every bundle, one bundle per line
pub fn render_bids(bids: &BidSet) -> String {
    let mut out = String::new();
    for (agent, bid) in bids.iter() {
        out.push_str(&format!("Bids for Agent {}\n", agent));
        for (bundle, utility) in bid.iter() {
            out.push_str(&format!(
                "  {} => {:.6}\n",
                bundle.to_binary(bids.num_items()),
                utility
            ));
        }
    }
    out
}
