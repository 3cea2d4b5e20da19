use log::{debug, info};
use rust_decimal::Decimal;
use snafu::prelude::*;

use crate::assembler::ResultAssembler;
use crate::config::*;
use crate::pool::{BallotPool, CandidateId, TransferOutcome};
use crate::tiebreak::tiebreak_order;

type RoundId = u32;

/// Drives the rounds of one contest, from the first tally to the last seat.
pub(crate) struct RoundEngine<'a> {
    rules: &'a VoteRules,
    // Sorted by name. The position is the candidate id.
    names: Vec<String>,
    status: Vec<CandidateStatus>,
    // The votes kept by each elected candidate.
    retained: Vec<Decimal>,
    pool: BallotPool,
    quota: Decimal,
    total: Decimal,
    winners: Vec<CandidateId>,
    // Every round elects or eliminates at least one candidate.
    max_rounds: RoundId,
    assembler: ResultAssembler,
}

/// Droop quota: floor(ballots / (seats + 1)) + 1.
pub(crate) fn droop_quota(num_ballots: u64, seats: u32) -> Decimal {
    Decimal::from(num_ballots / (seats as u64 + 1) + 1)
}

impl<'a> RoundEngine<'a> {
    pub(crate) fn new(
        names: Vec<String>,
        ballots: Vec<Vec<CandidateId>>,
        rules: &'a VoteRules,
    ) -> RoundEngine<'a> {
        let num_candidates = names.len();
        let pool = BallotPool::new(ballots, num_candidates);
        let num_ballots = pool.ballot_count() as u64;
        let quota = match rules.quota_method {
            QuotaMethod::Droop => droop_quota(num_ballots, rules.seats),
        };
        RoundEngine {
            rules,
            names,
            status: vec![CandidateStatus::Standing; num_candidates],
            retained: vec![Decimal::ZERO; num_candidates],
            pool,
            quota,
            total: Decimal::from(num_ballots),
            winners: Vec::new(),
            max_rounds: 2 * num_candidates as RoundId + 1,
            assembler: ResultAssembler::new(),
        }
    }

    pub(crate) fn run(mut self) -> Result<TabulationResult, TabulationError> {
        info!(
            "Tabulating {} ballots, {} candidates, {} seats, quota {}",
            self.total,
            self.names.len(),
            self.rules.seats,
            self.quota
        );
        let mut round_id: RoundId = 1;
        loop {
            ensure!(
                round_id <= self.max_rounds,
                NoConvergenceSnafu {
                    rounds: self.max_rounds
                }
            );
            let terminal = self.run_one_round(round_id)?;
            if terminal {
                break;
            }
            round_id += 1;
        }

        let winners: Vec<String> = self
            .winners
            .iter()
            .map(|cid| self.names[cid.idx()].clone())
            .collect();
        info!(
            "Tabulation finished after {} rounds, winners: {:?}",
            self.assembler.num_rounds(),
            winners
        );
        let ballot_count = self.pool.ballot_count() as u64;
        Ok(self
            .assembler
            .finish(winners, self.rules, self.quota, ballot_count))
    }

    fn candidates_with(&self, status: CandidateStatus) -> Vec<CandidateId> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == status)
            .map(|(idx, _)| CandidateId(idx as u32))
            .collect()
    }

    fn retained_total(&self) -> Decimal {
        self.candidates_with(CandidateStatus::Elected)
            .iter()
            .map(|cid| self.retained[cid.idx()])
            .sum()
    }

    fn check_conservation(
        &self,
        round_id: RoundId,
        stage: &str,
        actual: Decimal,
    ) -> Result<(), TabulationError> {
        ensure!(
            (actual - self.total).abs() <= self.rules.precision,
            VoteConservationSnafu {
                round: round_id,
                stage,
                expected: self.total,
                actual,
            }
        );
        Ok(())
    }

    /// Runs one round. Returns true if the count is over.
    fn run_one_round(&mut self, round_id: RoundId) -> Result<bool, TabulationError> {
        let tally = self.pool.tally(&self.status);
        let standing = self.candidates_with(CandidateStatus::Standing);
        debug!("run_one_round: {}: tally: {:?}", round_id, tally);

        let standing_votes: Decimal = standing.iter().map(|cid| tally.votes[cid.idx()]).sum();
        self.check_conservation(
            round_id,
            "tally",
            standing_votes + self.retained_total() + tally.exhausted,
        )?;

        // Votes as seen at the start of the round, before any transfer.
        let round_votes: Vec<Decimal> = self
            .status
            .iter()
            .enumerate()
            .map(|(idx, s)| match s {
                CandidateStatus::Standing => tally.votes[idx],
                CandidateStatus::Elected => self.retained[idx],
                CandidateStatus::Eliminated => Decimal::ZERO,
            })
            .collect();

        let threshold = self.quota - self.rules.precision;
        let reaching: Vec<CandidateId> = standing
            .iter()
            .filter(|cid| tally.votes[cid.idx()] >= threshold)
            .copied()
            .collect();
        let elected_now = self.order_by_votes(&reaching, &tally.votes);
        // All the winners of the round are marked before any transfer, so that
        // no surplus flows between them.
        for cid in elected_now.iter() {
            self.status[cid.idx()] = CandidateStatus::Elected;
        }

        let mut transfers: Vec<TransferStats> = Vec::new();
        for cid in elected_now.iter() {
            let votes = tally.votes[cid.idx()];
            let surplus = votes - self.quota;
            if surplus > self.rules.precision {
                let multiplier = match self.rules.surplus_method {
                    SurplusMethod::Fractional => surplus / votes,
                };
                debug!(
                    "run_one_round: {} elected with surplus {}, transfer weight {}",
                    self.names[cid.idx()],
                    surplus,
                    multiplier
                );
                let outcome = self.pool.advance_past(*cid, multiplier, &self.status);
                self.retained[cid.idx()] = votes - surplus;
                transfers.push(self.transfer_stats(*cid, multiplier, outcome));
            } else {
                debug!(
                    "run_one_round: {} elected at quota, no transfer",
                    self.names[cid.idx()]
                );
                self.retained[cid.idx()] = self.pool.hold(*cid);
            }
        }
        self.winners.extend(elected_now.iter().copied());
        let mut elected_round = elected_now;
        let mut eliminated_round: Vec<CandidateId> = Vec::new();

        let seats = self.rules.seats as usize;
        let mut terminal = self.winners.len() >= seats;
        if !terminal {
            let remaining = self.candidates_with(CandidateStatus::Standing);
            let unfilled = seats - self.winners.len();
            if remaining.len() <= unfilled {
                debug!(
                    "run_one_round: {} standing candidates for {} seats, electing all",
                    remaining.len(),
                    unfilled
                );
                let outright = self.order_by_votes(&remaining, &tally.votes);
                for cid in outright.iter() {
                    self.status[cid.idx()] = CandidateStatus::Elected;
                    self.retained[cid.idx()] = self.pool.hold(*cid);
                }
                self.winners.extend(outright.iter().copied());
                elected_round.extend(outright);
                terminal = true;
            } else if elected_round.is_empty() {
                let loser = self.find_eliminated(&remaining, &tally.votes);
                self.status[loser.idx()] = CandidateStatus::Eliminated;
                let outcome = self.pool.advance_past(loser, Decimal::ONE, &self.status);
                transfers.push(self.transfer_stats(loser, Decimal::ONE, outcome));
                eliminated_round.push(loser);
            }
        }

        let exhausted = self.pool.exhausted_weight();
        self.check_conservation(
            round_id,
            "transfer",
            self.pool.live_weight() + self.retained_total() + exhausted,
        )?;

        let snapshot = RoundSnapshot {
            round: round_id,
            quota: self.quota,
            tally: self
                .names
                .iter()
                .zip(round_votes.iter())
                .zip(self.status.iter())
                .map(|((name, votes), status)| (name.clone(), *votes, *status))
                .collect(),
            exhausted,
            elected: self.to_names(&elected_round),
            eliminated: self.to_names(&eliminated_round),
            transfers,
        };
        log_round(&snapshot);
        self.assembler.push_round(snapshot);
        Ok(terminal)
    }

    /// Highest votes first. Candidates within the precision of each other are
    /// ordered by the tie-break.
    fn order_by_votes(&self, candidates: &[CandidateId], votes: &[Decimal]) -> Vec<CandidateId> {
        let mut rest: Vec<CandidateId> = candidates.to_vec();
        let mut res: Vec<CandidateId> = Vec::new();
        loop {
            let top = match rest.iter().map(|cid| votes[cid.idx()]).max() {
                Some(top) => top,
                None => break,
            };
            let tied: Vec<CandidateId> = rest
                .iter()
                .filter(|cid| votes[cid.idx()] >= top - self.rules.precision)
                .copied()
                .collect();
            let ordered = self.resolve_tie(&tied, TieBreakPurpose::Elect);
            rest.retain(|cid| !ordered.contains(cid));
            res.extend(ordered);
        }
        res
    }

    fn find_eliminated(&self, candidates: &[CandidateId], votes: &[Decimal]) -> CandidateId {
        let lowest = candidates
            .iter()
            .map(|cid| votes[cid.idx()])
            .min()
            .unwrap_or(Decimal::ZERO);
        let tied: Vec<CandidateId> = candidates
            .iter()
            .filter(|cid| votes[cid.idx()] <= lowest + self.rules.precision)
            .copied()
            .collect();
        if tied.len() > 1 {
            debug!(
                "find_eliminated: tie between {:?} at {}",
                self.to_names(&tied),
                lowest
            );
        }
        self.resolve_tie(&tied, TieBreakPurpose::Eliminate)[0]
    }

    // Callers never pass an empty set.
    fn resolve_tie(&self, tied: &[CandidateId], purpose: TieBreakPurpose) -> Vec<CandidateId> {
        if tied.len() <= 1 {
            return tied.to_vec();
        }
        let names: Vec<&str> = tied.iter().map(|cid| self.names[cid.idx()].as_str()).collect();
        tiebreak_order(self.rules.tiebreak_mode, &names, purpose)
            .into_iter()
            .filter_map(|name| self.id_of(name))
            .collect()
    }

    fn id_of(&self, name: &str) -> Option<CandidateId> {
        self.names
            .binary_search_by(|n| n.as_str().cmp(name))
            .ok()
            .map(|idx| CandidateId(idx as u32))
    }

    fn to_names(&self, cids: &[CandidateId]) -> Vec<String> {
        cids.iter().map(|cid| self.names[cid.idx()].clone()).collect()
    }

    fn transfer_stats(
        &self,
        from: CandidateId,
        weight_multiplier: Decimal,
        outcome: TransferOutcome,
    ) -> TransferStats {
        TransferStats {
            from: self.names[from.idx()].clone(),
            weight_multiplier,
            transfers: outcome
                .received
                .into_iter()
                .map(|(cid, weight)| (self.names[cid.idx()].clone(), weight))
                .collect(),
            exhausted: outcome.exhausted,
        }
    }
}

fn log_round(snapshot: &RoundSnapshot) {
    info!("Round {} (quota {})", snapshot.round, snapshot.quota);
    for (name, votes, status) in snapshot.tally.iter() {
        let decision = if snapshot.elected.contains(name) {
            " -> elected"
        } else if snapshot.eliminated.contains(name) {
            " -> eliminated"
        } else {
            ""
        };
        if *status != CandidateStatus::Eliminated || !decision.is_empty() {
            info!("{:>12} {}{}", votes.round_dp(4), name, decision);
        }
    }
    info!("{:>12} exhausted", snapshot.exhausted.round_dp(4));
}
