/*!

Tabulation of multi-winner contests with the single transferable vote.

The count uses a Droop quota computed once from the number of ballots, and a
one-shot fractional (Gregory) transfer of the surplus of every elected
candidate. When nobody reaches the quota, the candidate with the fewest votes
is eliminated and its ballots move on at full weight. Weights are exact
decimals ([rust_decimal::Decimal]) and every comparison between vote totals
uses the precision of the rules.

```
use stv_rounds::builder::Builder;
use stv_rounds::VoteRules;
# use stv_rounds::TabulationError;

let mut builder = Builder::new(&VoteRules::with_seats(2))?;
builder.add_ballot_simple(&["Alice", "Bob"])?;
builder.add_ballot_simple(&["Alice", "Bob"])?;
builder.add_ballot_simple(&["Alice", "Charlie"])?;
builder.add_ballot_simple(&["Bob", "Alice"])?;
builder.add_ballot_simple(&["Charlie", "Alice"])?;
builder.add_ballot_simple(&["Bob"])?;

let result = builder.tabulate()?;
assert_eq!(result.winners, vec!["Alice".to_string(), "Bob".to_string()]);
# Ok::<(), TabulationError>(())
```

The result holds one [RoundSnapshot] per round, and the same data shaped as
two tables: [CandidateRound] rows and [RoundMetadata] rows.
*/

mod assembler;
pub mod builder;
mod config;
mod engine;
pub mod manual;
mod pool;
mod tiebreak;

use log::{debug, info};
use snafu::prelude::*;

use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, HashSet};

pub use crate::config::*;
pub use crate::tiebreak::{break_tie, tiebreak_order};

use crate::engine::RoundEngine;
use crate::pool::CandidateId;

struct CheckResult {
    // Sorted by name.
    candidates: Vec<String>,
    // One entry per ballot, in order of first appearance.
    ballots: Vec<Vec<CandidateId>>,
}

/// Runs the count for the given preferences and rules.
///
/// Arguments:
/// * `preferences` the ranked preferences of all the ballots. The preferences
/// of a ballot are grouped by ballot identifier and do not need to be adjacent.
/// * `rules` the rules that govern this contest
pub fn tabulate(
    preferences: &[BallotPreference],
    rules: &VoteRules,
) -> Result<TabulationResult, TabulationError> {
    info!(
        "Processing {:?} preferences, rules: {:?}",
        preferences.len(),
        rules
    );
    let cr = checks(preferences, rules)?;
    info!(
        "Processing {} ballots, {} candidates",
        cr.ballots.len(),
        cr.candidates.len()
    );
    for (idx, name) in cr.candidates.iter().enumerate() {
        debug!("Candidate: {}: {}", idx, name);
    }
    RoundEngine::new(cr.candidates, cr.ballots, rules).run()
}

// Validates the rules and the ballots, and groups the preferences by ballot.
fn checks(
    preferences: &[BallotPreference],
    rules: &VoteRules,
) -> Result<CheckResult, TabulationError> {
    ensure!(rules.seats > 0, InvalidSeatsSnafu);
    // Every total within the precision of the quota is above N / (seats + 1)
    // as long as the precision stays below 1 / (seats + 1). Then at most
    // `seats` candidates can reach the quota.
    let max_precision = Decimal::ONE / Decimal::from(rules.seats as u64 + 1);
    ensure!(
        rules.precision > Decimal::ZERO && rules.precision < max_precision,
        InvalidPrecisionSnafu {
            precision: rules.precision,
            seats: rules.seats
        }
    );

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&BallotPreference>> = HashMap::new();
    for p in preferences.iter() {
        ensure!(
            !p.candidate.is_empty(),
            EmptyCandidateNameSnafu {
                ballot_id: p.ballot_id.as_str()
            }
        );
        ensure!(
            p.rank > 0,
            InvalidRankSnafu {
                ballot_id: p.ballot_id.as_str(),
                candidate: p.candidate.as_str()
            }
        );
        groups
            .entry(p.ballot_id.as_str())
            .or_insert_with(|| {
                order.push(p.ballot_id.as_str());
                Vec::new()
            })
            .push(p);
    }
    ensure!(!order.is_empty(), EmptyElectionSnafu);

    let candidates: Vec<String> = preferences
        .iter()
        .map(|p| p.candidate.clone())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();
    let ids: HashMap<&str, CandidateId> = candidates
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), CandidateId(idx as u32)))
        .collect();

    let mut ballots: Vec<Vec<CandidateId>> = Vec::with_capacity(order.len());
    for ballot_id in order {
        let mut group: Vec<&BallotPreference> = groups.remove(ballot_id).unwrap_or_default();
        group.sort_by_key(|p| p.rank);
        let mut seen: HashSet<&str> = HashSet::new();
        for (prev, next) in group.iter().zip(group.iter().skip(1)) {
            ensure!(
                prev.rank != next.rank,
                DuplicateRankSnafu {
                    ballot_id,
                    rank: next.rank
                }
            );
        }
        let mut ranked: Vec<CandidateId> = Vec::with_capacity(group.len());
        for p in group {
            ensure!(
                seen.insert(p.candidate.as_str()),
                DuplicateCandidateSnafu {
                    ballot_id,
                    candidate: p.candidate.as_str()
                }
            );
            if let Some(cid) = ids.get(p.candidate.as_str()) {
                ranked.push(*cid);
            }
        }
        ballots.push(ranked);
    }

    Ok(CheckResult {
        candidates,
        ballots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // Ballots given as ranked lists of names. Identifiers are generated.
    fn prefs(ballots: &[&[&str]]) -> Vec<BallotPreference> {
        let mut res = Vec::new();
        for (idx, ballot) in ballots.iter().enumerate() {
            for (rank, name) in ballot.iter().enumerate() {
                res.push(BallotPreference::new(
                    &format!("b{}", idx),
                    name,
                    rank as u32 + 1,
                ));
            }
        }
        res
    }

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn assert_close(a: Decimal, b: Decimal) {
        assert!(
            (a - b).abs() <= VoteRules::DEFAULT_RULES.precision,
            "{} != {}",
            a,
            b
        );
    }

    // Rows of a round are pre-transfer, exhausted is post-transfer: the rows of
    // round r and the exhausted weight of round r - 1 account for all ballots.
    fn assert_conservation(res: &TabulationResult) {
        let total = Decimal::from(res.summary.ballot_count);
        let mut previous_exhausted = Decimal::ZERO;
        for r in res.rounds.iter() {
            let rows: Decimal = r.tally.iter().map(|(_, v, _)| *v).sum();
            assert_close(rows + previous_exhausted, total);
            assert!(r.exhausted >= previous_exhausted);
            previous_exhausted = r.exhausted;
        }
    }

    fn assert_monotonic(res: &TabulationResult) {
        for pair in res.rounds.windows(2) {
            for ((name, _, before), (_, _, after)) in pair[0].tally.iter().zip(pair[1].tally.iter()) {
                if *before != CandidateStatus::Standing {
                    assert_eq!(before, after, "status of {} changed", name);
                }
            }
        }
    }

    fn check_invariants(res: &TabulationResult) {
        assert_conservation(res);
        assert_monotonic(res);
        let quota = res.summary.first_round_quota;
        assert!(res.rounds.iter().all(|r| r.quota == quota));
        assert_eq!(res.summary.number_of_rounds as usize, res.rounds.len());
        assert_eq!(res.summary.winners, res.winners);
    }

    #[test]
    fn clean_majority() {
        init();
        let ballots = prefs(&[
            &["Alice", "Bob"],
            &["Alice", "Bob"],
            &["Alice", "Bob"],
            &["Bob", "Alice"],
            &["Bob", "Alice"],
            &["Charlie", "Alice"],
        ]);
        let res = tabulate(&ballots, &VoteRules::with_seats(2)).unwrap();
        check_invariants(&res);
        assert_eq!(res.summary.first_round_quota, Decimal::from(3));
        assert_eq!(res.round_metadata[0].elected_this_round, Some(names(&["Alice"])));
        // Exact quota: nothing moves.
        assert!(res.rounds[0].transfers.is_empty());
        assert_eq!(res.votes(2, "Alice"), Some(Decimal::from(3)));
        assert_eq!(res.votes(2, "Bob"), Some(Decimal::from(2)));
        assert_eq!(res.winners, names(&["Alice", "Bob"]));
    }

    #[test]
    fn surplus_transfer() {
        init();
        let ballots = prefs(&[
            &["Alice", "Bob"],
            &["Alice", "Bob"],
            &["Alice", "Charlie"],
            &["Alice", "Charlie"],
            &["Bob"],
            &["Charlie"],
        ]);
        let res = tabulate(&ballots, &VoteRules::with_seats(2)).unwrap();
        check_invariants(&res);
        assert_eq!(res.summary.first_round_quota, Decimal::from(3));
        assert_eq!(res.votes(1, "Alice"), Some(Decimal::from(4)));
        assert_eq!(res.votes(1, "Bob"), Some(Decimal::ONE));

        let transfer = &res.rounds[0].transfers[0];
        assert_eq!(transfer.from, "Alice");
        assert_eq!(transfer.weight_multiplier, Decimal::new(25, 2));
        assert_eq!(transfer.exhausted, Decimal::ZERO);

        // Two ballots at 0.25 each.
        let bob = res.votes(2, "Bob").unwrap();
        let charlie = res.votes(2, "Charlie").unwrap();
        assert_eq!(bob, Decimal::new(15, 1));
        assert_eq!(charlie, Decimal::new(15, 1));
        assert_eq!(res.votes(2, "Alice"), Some(Decimal::from(3)));
        // Bob and Charlie are tied below the quota: Bob sorts first and is
        // eliminated, his ballots have no further preference.
        assert_eq!(res.round_metadata[1].eliminated_this_round, Some(names(&["Bob"])));
        assert_eq!(res.round_metadata[1].exhausted, Decimal::new(15, 1));
        assert_eq!(res.winners, names(&["Alice", "Charlie"]));
    }

    #[test]
    fn elimination_tie_break() {
        init();
        let ballots = prefs(&[
            &["Winner"],
            &["Winner"],
            &["Winner"],
            &["Alpha"],
            &["Zebra"],
        ]);
        let res = tabulate(&ballots, &VoteRules::with_seats(2)).unwrap();
        check_invariants(&res);
        assert_eq!(res.summary.first_round_quota, Decimal::from(2));
        assert_eq!(res.round_metadata[0].elected_this_round, Some(names(&["Winner"])));
        assert_eq!(res.round_metadata[1].eliminated_this_round, Some(names(&["Alpha"])));
        assert!(res
            .round_metadata
            .iter()
            .all(|m| m.eliminated_this_round != Some(names(&["Zebra"]))));
        assert_eq!(res.winners, names(&["Winner", "Zebra"]));
    }

    #[test]
    fn more_seats_than_candidates() {
        init();
        let ballots = prefs(&[&["Ann"], &["Ben"]]);
        let res = tabulate(&ballots, &VoteRules::with_seats(3)).unwrap();
        check_invariants(&res);
        assert_eq!(res.winners.len(), 2);
        assert_eq!(res.summary.number_of_rounds, 1);
    }

    #[test]
    fn outright_election_without_quota() {
        init();
        // 7 ballots, 3 seats: quota is 2. Only two candidates can reach it.
        let ballots = prefs(&[
            &["A"],
            &["A"],
            &["A"],
            &["B"],
            &["B"],
            &["C"],
            &["D"],
        ]);
        let res = tabulate(&ballots, &VoteRules::with_seats(3)).unwrap();
        check_invariants(&res);
        assert_eq!(res.winners.len(), 3);
        assert_eq!(&res.winners[..2], &names(&["A", "B"])[..]);
    }

    #[test]
    fn exhausted_ballots() {
        init();
        let ballots = prefs(&[
            &["A"],
            &["A"],
            &["A"],
            &["B"],
            &["B"],
            &["C"],
            &["D", "B"],
        ]);
        let res = tabulate(&ballots, &VoteRules::with_seats(2)).unwrap();
        check_invariants(&res);
        let last = res.round_metadata.last().unwrap();
        assert!(last.exhausted > Decimal::ZERO);
        assert_eq!(res.winners, names(&["A", "B"]));
        // C is eliminated before D; its only ballot is exhausted.
        assert_eq!(res.round_metadata[1].eliminated_this_round, Some(names(&["C"])));
        assert_eq!(res.round_metadata[1].transfers[0].exhausted, Decimal::ONE);
    }

    #[test]
    fn simultaneous_elections_are_ordered_by_votes() {
        init();
        let ballots = prefs(&[
            &["Bea"],
            &["Bea"],
            &["Bea"],
            &["Bea"],
            &["Al"],
            &["Al"],
            &["Al"],
            &["Cy"],
        ]);
        // Quota 3: both Bea and Al are elected in round 1, Bea first.
        let res = tabulate(&ballots, &VoteRules::with_seats(2)).unwrap();
        check_invariants(&res);
        assert_eq!(res.summary.number_of_rounds, 1);
        assert_eq!(res.winners, names(&["Bea", "Al"]));
        assert_eq!(res.round_metadata[0].elected_this_round, Some(names(&["Bea", "Al"])));
    }

    #[test]
    fn surplus_skips_co_winners() {
        init();
        // Quota 3. A has a surplus of 2 whose next preferences are B, elected
        // in the same round: the surplus goes to C instead.
        let ballots = prefs(&[
            &["A", "B", "C"],
            &["A", "B", "C"],
            &["A", "B", "C"],
            &["A", "B", "C"],
            &["A", "B", "C"],
            &["B"],
            &["B"],
            &["B"],
            &["D"],
            &["D"],
            &["C"],
        ]);
        let res = tabulate(&ballots, &VoteRules::with_seats(3)).unwrap();
        check_invariants(&res);
        let a_transfer = &res.rounds[0].transfers[0];
        assert_eq!(a_transfer.from, "A");
        assert_eq!(a_transfer.transfers.len(), 1);
        assert_eq!(a_transfer.transfers[0].0, "C");
        assert_close(res.votes(2, "C").unwrap(), Decimal::from(3));
        assert_eq!(res.winners, names(&["A", "B", "C"]));
    }

    #[test]
    fn ballots_may_be_interleaved_and_skip_ranks() {
        init();
        let ballots = vec![
            BallotPreference::new("x", "B", 3),
            BallotPreference::new("y", "A", 1),
            BallotPreference::new("x", "A", 1),
            BallotPreference::new("z", "B", 2),
        ];
        let res = tabulate(&ballots, &VoteRules::with_seats(1)).unwrap();
        check_invariants(&res);
        assert_eq!(res.summary.ballot_count, 3);
        assert_eq!(res.votes(1, "A"), Some(Decimal::from(2)));
        assert_eq!(res.votes(1, "B"), Some(Decimal::ONE));
        assert_eq!(res.winners, names(&["A"]));
    }

    #[test]
    fn long_count_conserves_votes() {
        init();
        let ballots = prefs(&[
            &["A", "B", "C", "D"],
            &["A", "C", "B"],
            &["A", "D"],
            &["A", "B"],
            &["A", "E", "B"],
            &["A", "C"],
            &["A", "B", "E"],
            &["B", "C", "A"],
            &["B"],
            &["C", "E", "D"],
            &["C", "B"],
            &["D", "E", "C"],
            &["D", "C"],
            &["E", "D"],
            &["E", "A", "D"],
            &["F", "E"],
            &["F"],
        ]);
        let rules = VoteRules::with_seats(3);
        let res = tabulate(&ballots, &rules).unwrap();
        check_invariants(&res);
        assert_eq!(res.summary.first_round_quota, Decimal::from(5));
        assert_eq!(res.winners.len(), 3);
        assert_eq!(res.winners[0], "A");
        // Every candidate appears in every round.
        for r in res.rounds.iter() {
            assert_eq!(r.tally.len(), 6);
        }
        // Determinism.
        let again = tabulate(&ballots, &rules).unwrap();
        assert_eq!(res, again);
    }

    #[test]
    fn seeded_tie_break_is_deterministic() {
        init();
        let ballots = prefs(&[&["P"], &["Q"], &["R"], &["S"], &["T"], &["U"]]);
        for seed in [1, 7, 12345] {
            let rules = VoteRules {
                tiebreak_mode: TieBreakMode::RandomSeed(seed),
                ..VoteRules::with_seats(1)
            };
            let first = tabulate(&ballots, &rules).unwrap();
            let second = tabulate(&ballots, &rules).unwrap();
            check_invariants(&first);
            assert_eq!(first, second);
            assert_eq!(first.winners.len(), 1);
        }
    }

    #[test]
    fn winners_cardinality() {
        init();
        let ballots = prefs(&[&["A", "B"], &["B", "C"], &["C", "A"], &["A"]]);
        for seats in 1..6 {
            let res = tabulate(&ballots, &VoteRules::with_seats(seats)).unwrap();
            check_invariants(&res);
            assert_eq!(res.winners.len(), std::cmp::min(seats as usize, 3));
        }
    }

    #[test]
    fn configuration_errors() {
        let ballots = prefs(&[&["A"]]);
        assert_eq!(
            tabulate(&ballots, &VoteRules::with_seats(0)),
            Err(TabulationError::InvalidSeats {})
        );
        let rules = VoteRules {
            precision: Decimal::ZERO,
            ..VoteRules::DEFAULT_RULES
        };
        assert!(matches!(
            tabulate(&ballots, &rules),
            Err(TabulationError::InvalidPrecision { .. })
        ));
        assert_eq!(
            tabulate(&[], &VoteRules::DEFAULT_RULES),
            Err(TabulationError::EmptyElection {})
        );
    }

    #[test]
    fn coarse_precision_is_rejected() {
        init();
        let ballots = prefs(&[&["A"], &["A"], &["B"], &["B"], &["C"], &["C"]]);
        // With a precision of 1, the three candidates would all be within
        // reach of the quota of 3.
        let rules = VoteRules {
            precision: Decimal::ONE,
            ..VoteRules::with_seats(2)
        };
        assert_eq!(
            tabulate(&ballots, &rules),
            Err(TabulationError::InvalidPrecision {
                precision: Decimal::ONE,
                seats: 2
            })
        );
        // 1/3 is the bound for 2 seats.
        let rules = VoteRules {
            precision: Decimal::new(34, 2),
            ..VoteRules::with_seats(2)
        };
        assert!(matches!(
            tabulate(&ballots, &rules),
            Err(TabulationError::InvalidPrecision { .. })
        ));
        let rules = VoteRules {
            precision: Decimal::new(3, 1),
            ..VoteRules::with_seats(2)
        };
        let res = tabulate(&ballots, &rules).unwrap();
        check_invariants(&res);
        assert_eq!(res.winners, names(&["B", "C"]));
    }

    #[test]
    fn malformed_ballots_are_rejected() {
        let rules = VoteRules::DEFAULT_RULES;
        let dup_rank = vec![
            BallotPreference::new("b1", "A", 1),
            BallotPreference::new("b1", "B", 1),
        ];
        assert_eq!(
            tabulate(&dup_rank, &rules),
            Err(TabulationError::DuplicateRank {
                ballot_id: "b1".to_string(),
                rank: 1
            })
        );
        let dup_candidate = vec![
            BallotPreference::new("b1", "A", 1),
            BallotPreference::new("b1", "A", 2),
        ];
        assert_eq!(
            tabulate(&dup_candidate, &rules),
            Err(TabulationError::DuplicateCandidate {
                ballot_id: "b1".to_string(),
                candidate: "A".to_string()
            })
        );
        let zero_rank = vec![BallotPreference::new("b1", "A", 0)];
        assert!(matches!(
            tabulate(&zero_rank, &rules),
            Err(TabulationError::InvalidRank { .. })
        ));
        let no_name = vec![BallotPreference::new("b1", "", 1)];
        assert!(matches!(
            tabulate(&no_name, &rules),
            Err(TabulationError::EmptyCandidateName { .. })
        ));
    }
}
