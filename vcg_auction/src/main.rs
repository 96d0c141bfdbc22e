//! Solve a random combinatorial auction and print VCG payments
//!
//! Usage:
//!   vcg_auction <n> <m> [--seed S] [--sequential] [--runner-up] [--json] [--quiet-bids]
//!   vcg_auction --config auction.toml [flags]

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::env;
use std::process;
use std::time::Instant;
use vcg_auction::auction::Auction;
use vcg_auction::config::AuctionConfig;
use vcg_auction::generator::random_bid_set;
use vcg_auction::logger;
use vcg_auction::report::{SolutionReport, Timings, render_bids};
use vcg_auction::{PricingRule, SearchMode};

struct CliArgs {
    config: AuctionConfig,
    json: bool,
    show_bids: bool,
}

fn usage(program: &str) {
    eprintln!(
        "Usage: {} <n> <m> [--seed S] [--sequential] [--runner-up] [--json] [--quiet-bids]",
        program
    );
    eprintln!("       {} --config <auction.toml> [flags]", program);
}

fn parse_count(name: &str, raw: &str) -> Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|_| format!("{} must be an integer, got '{}'", name, raw))
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut positional = Vec::new();
    let mut config_path = None;
    let mut seed = None;
    let mut search = None;
    let mut pricing = None;
    let mut json = false;
    let mut show_bids = true;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => {
                let raw = iter.next().ok_or("--seed needs a value")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("seed must be a non-negative integer, got '{}'", raw))?;
                seed = Some(value);
            }
            "--config" => {
                config_path = Some(iter.next().ok_or("--config needs a path")?.clone());
            }
            "--sequential" => search = Some(SearchMode::Sequential),
            "--runner-up" => pricing = Some(PricingRule::RunnerUp),
            "--json" => json = true,
            "--quiet-bids" => show_bids = false,
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{}'", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    let mut config = match (config_path, positional.as_slice()) {
        (Some(path), []) => {
            let config = AuctionConfig::from_toml_file(&path).map_err(|e| e.to_string())?;
            // The command-line positivity rule applies to file counts as well
            AuctionConfig::from_cli(config.num_agents as i64, config.num_items as i64)
                .map_err(|e| e.to_string())?;
            config
        }
        (Some(_), _) => return Err("pass either <n> <m> or --config, not both".to_string()),
        (None, [n, m]) => {
            let n = parse_count("n", n)?;
            let m = parse_count("m", m)?;
            AuctionConfig::from_cli(n, m).map_err(|e| e.to_string())?
        }
        (None, _) => return Err("pass n and m as arguments".to_string()),
    };

    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(search) = search {
        config = config.with_search(search);
    }
    if let Some(pricing) = pricing {
        config = config.with_pricing(pricing);
    }

    Ok(CliArgs {
        config,
        json,
        show_bids,
    })
}

fn run(cli: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = &cli.config;
    let seed = config.resolve_seed();

    if !cli.json {
        println!(
            "Using n = {} agents and m = {} items (seed {}, {} search)",
            config.num_agents, config.num_items, seed, config.search
        );
        println!("Generating agents' utilities for every bundle of items.");
    }

    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let bids = random_bid_set(config.num_agents, config.num_items, &mut rng)?;
    let generation = start.elapsed();

    if cli.show_bids && !cli.json {
        print!("{}", render_bids(&bids));
    }

    let auction = Auction::from_config(bids, config)?;
    let (solution, stats) = auction.solve_with_stats()?;
    let report =
        SolutionReport::new(auction.bids(), &solution)?.with_timings(Timings::new(generation, &stats));

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("vcg_auction");

    let cli = parse_args(args.get(1..).unwrap_or_default()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        usage(program);
        process::exit(1);
    });

    if let Err(e) = logger::init("warn") {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
