// Properties that hold for every seeded random instance

use approx::assert_relative_eq;
use vcg_auction::auction::Auction;
use vcg_auction::generator::seeded_bid_set;
use vcg_auction::pricing::clarke_externality;
use vcg_auction::search::{SearchMode, Searcher, solve_allocation};
use vcg_auction::{BidSet, Bundle, NOBODY, PricingRule, lattice_size};

const SEEDS: std::ops::Range<u64> = 0..8;

fn instances() -> impl Iterator<Item = (usize, usize, BidSet)> {
    SEEDS.flat_map(|seed| {
        [(1, 3), (2, 2), (3, 3), (2, 4)]
            .into_iter()
            .map(move |(n, m)| (n, m, seeded_bid_set(n, m, seed).unwrap()))
    })
}

#[test]
fn generated_bids_have_no_lookup_gaps() {
    for (_, m, bids) in instances() {
        for (agent, bid) in bids.iter() {
            assert_eq!(bid.iter().count(), lattice_size(m));
            for bundle in Bundle::lattice(m) {
                assert!(bids.utility(agent, bundle).is_ok());
            }
        }
    }
}

#[test]
fn every_item_has_exactly_one_owner() {
    for (n, m, bids) in instances() {
        let outcome = solve_allocation(&bids, n, m, SearchMode::Parallel).unwrap();
        let allocation = &outcome.best.allocation;
        assert_eq!(allocation.num_items(), m);

        let bundles = allocation.bundles(n).unwrap();
        let union = bundles
            .iter()
            .fold(0u64, |acc, bundle| {
                assert_eq!(acc & bundle.bits(), 0, "item assigned twice");
                acc | bundle.bits()
            });
        assert_eq!(union, (1u64 << m) - 1, "item left unassigned");
    }
}

#[test]
fn optimum_is_at_least_the_trivial_allocation_and_no_worse_than_any_leaf() {
    for (n, m, bids) in instances() {
        let outcome = solve_allocation(&bids, n, m, SearchMode::Sequential).unwrap();
        assert!(outcome.best.welfare >= 0.0);

        // Any bidder taking every item is a valid candidate
        let everything = Bundle::lattice(m).last().unwrap();
        for agent in bids.agents() {
            assert!(outcome.best.welfare >= bids.utility(agent, everything).unwrap());
        }
        assert_relative_eq!(
            outcome.best.allocation.welfare(&bids).unwrap(),
            outcome.best.welfare
        );
    }
}

#[test]
fn sequential_and_parallel_agree_and_repeat() {
    for (n, m, bids) in instances() {
        let sequential = solve_allocation(&bids, n, m, SearchMode::Sequential).unwrap();
        let parallel = solve_allocation(&bids, n, m, SearchMode::Parallel).unwrap();
        let again = solve_allocation(&bids, n, m, SearchMode::Parallel).unwrap();

        assert_eq!(sequential.best.welfare, parallel.best.welfare);
        assert_eq!(sequential.best.allocation, parallel.best.allocation);
        assert_eq!(parallel.best, again.best);
    }
}

#[test]
fn clarke_payments_match_the_externality_formula() {
    for (n, m, bids) in instances() {
        let solution = Auction::new(bids.clone()).solve().unwrap();
        assert_eq!(solution.payment(NOBODY), 0.0);

        for agent in bids.agents() {
            let reduced = bids.without_agent(agent).unwrap();
            let without = solve_allocation(&reduced, n - 1, m, SearchMode::Sequential)
                .unwrap()
                .best
                .welfare;
            let own = solution.allocation.value_of(&bids, agent).unwrap();
            let expected = without - (solution.welfare - own);

            assert_relative_eq!(solution.payment(agent), expected, epsilon = 1e-9);
            assert_relative_eq!(
                clarke_externality(&bids, &solution.allocation, agent, SearchMode::Sequential)
                    .unwrap(),
                expected,
                epsilon = 1e-9
            );
            // Exact VCG never pays bidders and never charges more than their value
            assert!(solution.payment(agent) >= -1e-9);
            assert!(solution.charge(agent) <= own + 1e-9);
        }
    }
}

#[test]
fn runner_up_welfare_never_exceeds_the_optimum() {
    for (n, m, bids) in instances() {
        let outcome = Searcher::new(&bids, n, m)
            .unwrap()
            .with_runner_up(true)
            .run(SearchMode::Parallel)
            .unwrap();
        let runner_up = outcome.runner_up.expect("more than one leaf");
        assert!(runner_up.welfare <= outcome.best.welfare);
        assert_ne!(runner_up.allocation, outcome.best.allocation);
    }
}

#[test]
fn both_pricing_rules_choose_the_same_allocation() {
    for (_, _, bids) in instances() {
        let exact = Auction::new(bids.clone()).solve().unwrap();
        let approximate = Auction::new(bids)
            .pricing(PricingRule::RunnerUp)
            .solve()
            .unwrap();
        assert_eq!(exact.allocation, approximate.allocation);
        assert_eq!(exact.welfare, approximate.welfare);
    }
}
