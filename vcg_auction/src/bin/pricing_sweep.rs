//! Pricing sweep
//!
//! Solves many seeded random instances and measures how far the runner-up
//! approximation lands from exact Clarke payments. Each instance is solved
//! twice (sequential + Clarke, parallel + runner-up), which also checks that
//! both search modes pick the same allocation.
//!
//! Usage:
//!   cargo run --release --bin pricing_sweep -- <instances> <n> <m> [out.csv]

use rayon::prelude::*;
use serde::Serialize;
use std::env;
use std::process;
use std::time::Instant;
use vcg_auction::auction::Auction;
use vcg_auction::config::AuctionConfig;
use vcg_auction::generator::seeded_bid_set;
use vcg_auction::{PricingRule, SearchMode, logger};

const GAP_TOLERANCE: f64 = 1e-9;

/// One CSV row per instance
#[derive(Debug, Clone, Serialize)]
struct InstanceRow {
    seed: u64,
    welfare: f64,
    clarke_revenue: f64,
    runner_up_revenue: f64,
    mean_abs_gap: f64,
    max_abs_gap: f64,
    modes_agree: bool,
}

fn run_instance(config: &AuctionConfig, seed: u64) -> vcg_auction::Result<InstanceRow> {
    let bids = seeded_bid_set(config.num_agents, config.num_items, seed)?;

    let exact = Auction::new(bids.clone())
        .search_mode(SearchMode::Sequential)
        .pricing(PricingRule::Clarke)
        .solve()?;
    let approximate = Auction::new(bids)
        .search_mode(SearchMode::Parallel)
        .pricing(PricingRule::RunnerUp)
        .solve()?;

    let gaps: Vec<f64> = (1..=config.num_agents)
        .map(|agent| (exact.payment(agent) - approximate.payment(agent)).abs())
        .collect();
    let mean_abs_gap = if gaps.is_empty() {
        0.0
    } else {
        gaps.iter().sum::<f64>() / gaps.len() as f64
    };

    Ok(InstanceRow {
        seed,
        welfare: exact.welfare,
        clarke_revenue: exact.revenue(),
        runner_up_revenue: approximate.revenue(),
        mean_abs_gap,
        max_abs_gap: gaps.iter().copied().fold(0.0, f64::max),
        modes_agree: exact.allocation == approximate.allocation
            && exact.welfare == approximate.welfare,
    })
}

fn write_csv(rows: &[InstanceRow], path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(name: &str, raw: &str) -> T {
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Error: {} must be a non-negative integer, got '{}'", name, raw);
        process::exit(1);
    })
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 && args.len() != 5 {
        eprintln!("Usage: {} <instances> <n> <m> [out.csv]", args[0]);
        process::exit(1);
    }

    let instances: u64 = parse_arg("instances", &args[1]);
    let n: i64 = parse_arg("n", &args[2]);
    let m: i64 = parse_arg("m", &args[3]);
    let config = AuctionConfig::from_cli(n, m).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    if let Err(e) = logger::init("warn") {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    println!(
        "Pricing sweep: {} instances, n = {}, m = {}",
        instances, config.num_agents, config.num_items
    );
    let start = Instant::now();

    let results: Vec<vcg_auction::Result<InstanceRow>> = (0..instances)
        .into_par_iter()
        .map(|seed| run_instance(&config, seed))
        .collect();

    // Failed instances are excluded from the summary
    let rows: Vec<InstanceRow> = results
        .into_iter()
        .zip(0..instances)
        .filter_map(|(result, seed)| match result {
            Ok(row) => Some(row),
            Err(e) => {
                eprintln!("  Warning: skipping instance {} - {}", seed, e);
                None
            }
        })
        .collect();

    if rows.is_empty() {
        eprintln!("Error: no instance completed");
        process::exit(1);
    }

    let count = rows.len() as f64;
    let differing = rows.iter().filter(|r| r.max_abs_gap > GAP_TOLERANCE).count();
    let disagreements = rows.iter().filter(|r| !r.modes_agree).count();
    let mean_gap = rows.iter().map(|r| r.mean_abs_gap).sum::<f64>() / count;
    let worst_gap = rows.iter().map(|r| r.max_abs_gap).fold(0.0, f64::max);
    let clarke_revenue = rows.iter().map(|r| r.clarke_revenue).sum::<f64>() / count;
    let runner_up_revenue = rows.iter().map(|r| r.runner_up_revenue).sum::<f64>() / count;

    println!("\nResults ({} instances in {:.2?})", rows.len(), start.elapsed());
    println!("  Mean welfare:               {:.4}", rows.iter().map(|r| r.welfare).sum::<f64>() / count);
    println!("  Mean Clarke revenue:        {:.4}", clarke_revenue);
    println!("  Mean runner-up revenue:     {:.4}", runner_up_revenue);
    println!("  Mean |payment gap|:         {:.4}", mean_gap);
    println!("  Worst |payment gap|:        {:.4}", worst_gap);
    println!(
        "  Instances where pricing differs: {}/{} ({:.1}%)",
        differing,
        rows.len(),
        100.0 * differing as f64 / count
    );
    if disagreements > 0 {
        eprintln!(
            "  Warning: sequential and parallel search disagreed on {} instances",
            disagreements
        );
    } else {
        println!("  Sequential and parallel search agreed on every instance");
    }

    if let Some(path) = args.get(4) {
        match write_csv(&rows, path) {
            Ok(()) => println!("\nWrote {}", path),
            Err(e) => {
                eprintln!("Error writing {}: {}", path, e);
                process::exit(1);
            }
        }
    }
}
