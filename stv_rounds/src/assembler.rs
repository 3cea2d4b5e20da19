use rust_decimal::Decimal;

use crate::config::*;

/// Accumulates the round snapshots and shapes them into the output tables.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResultAssembler {
    rounds: Vec<RoundSnapshot>,
}

fn non_empty(names: &[String]) -> Option<Vec<String>> {
    if names.is_empty() {
        None
    } else {
        Some(names.to_vec())
    }
}

impl ResultAssembler {
    pub(crate) fn new() -> ResultAssembler {
        ResultAssembler::default()
    }

    pub(crate) fn push_round(&mut self, snapshot: RoundSnapshot) {
        self.rounds.push(snapshot);
    }

    pub(crate) fn num_rounds(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub(crate) fn finish(
        self,
        winners: Vec<String>,
        rules: &VoteRules,
        quota: Decimal,
        ballot_count: u64,
    ) -> TabulationResult {
        let candidate_rounds: Vec<CandidateRound> = self
            .rounds
            .iter()
            .flat_map(|r| {
                r.tally.iter().map(move |(name, votes, status)| CandidateRound {
                    round: r.round,
                    candidate_name: name.clone(),
                    votes: *votes,
                    status: *status,
                })
            })
            .collect();

        let round_metadata: Vec<RoundMetadata> = self
            .rounds
            .iter()
            .map(|r| RoundMetadata {
                round: r.round,
                quota: r.quota,
                exhausted: r.exhausted,
                elected_this_round: non_empty(&r.elected),
                eliminated_this_round: non_empty(&r.eliminated),
                transfers: r.transfers.clone(),
            })
            .collect();

        let first_round_quota = self.rounds.first().map(|r| r.quota).unwrap_or(quota);
        let summary = TabulationSummary {
            number_of_rounds: self.rounds.len() as u32,
            winners: winners.clone(),
            seats: rules.seats,
            first_round_quota,
            precision: rules.precision,
            ballot_count,
        };

        TabulationResult {
            rounds: self.rounds,
            candidate_rounds,
            round_metadata,
            summary,
            winners,
        }
    }
}
