use std::collections::BTreeMap;

use log::debug;
use rust_decimal::Decimal;

use crate::config::CandidateStatus;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) struct CandidateId(pub(crate) u32);

impl CandidateId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

// Where a ballot currently stands.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Position {
    // Index into the preferences. The candidate there is standing.
    Live(usize),
    // Kept by a candidate elected without surplus transfer.
    Held(CandidateId),
    Exhausted,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct PooledBallot {
    // Guaranteed to never be empty at construction.
    preferences: Vec<CandidateId>,
    weight: Decimal,
    position: Position,
}

/// The vote totals of one tally.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct PoolTally {
    /// Indexed by candidate id. Only standing candidates receive votes.
    pub(crate) votes: Vec<Decimal>,
    pub(crate) exhausted: Decimal,
}

/// The result of moving the ballots of a decided candidate.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub(crate) struct TransferOutcome {
    pub(crate) received: BTreeMap<CandidateId, Decimal>,
    pub(crate) exhausted: Decimal,
}

/// The working set of ballots of one contest.
#[derive(Debug, Clone)]
pub(crate) struct BallotPool {
    ballots: Vec<PooledBallot>,
    num_candidates: usize,
}

impl BallotPool {
    /// All the candidates are expected to be standing.
    pub(crate) fn new(preferences: Vec<Vec<CandidateId>>, num_candidates: usize) -> BallotPool {
        let ballots = preferences
            .into_iter()
            .filter(|prefs| !prefs.is_empty())
            .map(|preferences| PooledBallot {
                preferences,
                weight: Decimal::ONE,
                position: Position::Live(0),
            })
            .collect();
        BallotPool {
            ballots,
            num_candidates,
        }
    }

    pub(crate) fn ballot_count(&self) -> usize {
        self.ballots.len()
    }

    /// The candidate a ballot currently supports, if it is still live.
    fn current(ballot: &PooledBallot) -> Option<CandidateId> {
        match ballot.position {
            Position::Live(idx) => ballot.preferences.get(idx).copied(),
            _ => None,
        }
    }

    pub(crate) fn tally(&self, status: &[CandidateStatus]) -> PoolTally {
        let mut votes = vec![Decimal::ZERO; self.num_candidates];
        let mut exhausted = Decimal::ZERO;
        for b in self.ballots.iter() {
            match (b.position, BallotPool::current(b)) {
                (Position::Exhausted, _) => exhausted += b.weight,
                (Position::Live(_), Some(cid)) if status[cid.idx()] == CandidateStatus::Standing => {
                    votes[cid.idx()] += b.weight;
                }
                (Position::Live(_), _) => {
                    // Pointers are moved as soon as a candidate is decided.
                    debug_assert!(false, "live ballot on a decided candidate: {:?}", b);
                }
                (Position::Held(_), _) => {}
            }
        }
        PoolTally { votes, exhausted }
    }

    /// Moves every ballot currently on `decided` to its next standing
    /// preference, after multiplying its weight.
    ///
    /// The status of `decided` must already be updated. Candidates that are
    /// elected or eliminated are skipped. A ballot with no standing preference
    /// left is exhausted.
    pub(crate) fn advance_past(
        &mut self,
        decided: CandidateId,
        weight_multiplier: Decimal,
        status: &[CandidateStatus],
    ) -> TransferOutcome {
        let mut outcome = TransferOutcome::default();
        let mut moved = 0_usize;
        for b in self.ballots.iter_mut() {
            let idx = match b.position {
                Position::Live(idx) if b.preferences[idx] == decided => idx,
                _ => continue,
            };
            moved += 1;
            b.weight *= weight_multiplier;
            let next = b.preferences[idx + 1..]
                .iter()
                .position(|cid| status[cid.idx()] == CandidateStatus::Standing)
                .map(|offset| idx + 1 + offset);
            match next {
                Some(next_idx) => {
                    b.position = Position::Live(next_idx);
                    *outcome
                        .received
                        .entry(b.preferences[next_idx])
                        .or_insert(Decimal::ZERO) += b.weight;
                }
                None => {
                    b.position = Position::Exhausted;
                    outcome.exhausted += b.weight;
                }
            }
        }
        debug!(
            "advance_past: {:?}: moved {} ballots with multiplier {}: {:?}",
            decided, moved, weight_multiplier, outcome
        );
        outcome
    }

    /// Parks the ballots of an elected candidate that does not transfer a
    /// surplus. Returns the weight kept by the candidate.
    pub(crate) fn hold(&mut self, elected: CandidateId) -> Decimal {
        let mut held = Decimal::ZERO;
        for b in self.ballots.iter_mut() {
            if BallotPool::current(b) == Some(elected) {
                b.position = Position::Held(elected);
                held += b.weight;
            }
        }
        held
    }

    /// The weight of the ballots still supporting a standing candidate.
    pub(crate) fn live_weight(&self) -> Decimal {
        self.ballots
            .iter()
            .filter(|b| matches!(b.position, Position::Live(_)))
            .map(|b| b.weight)
            .sum()
    }

    pub(crate) fn exhausted_weight(&self) -> Decimal {
        self.ballots
            .iter()
            .filter(|b| b.position == Position::Exhausted)
            .map(|b| b.weight)
            .sum()
    }
}
