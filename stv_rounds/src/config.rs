// ********* Input data structures ***********

use rust_decimal::Decimal;
use serde::Serialize;
use snafu::Snafu;

/// One ranked preference on one ballot, as produced by ballot ingestion.
///
/// A ballot is the group of all the preferences sharing the same `ballot_id`.
/// Within a ballot, ranks and candidates are expected to be unique. Gaps in the
/// ranks are accepted and simply skipped.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct BallotPreference {
    pub ballot_id: String,
    pub candidate: String,
    pub rank: u32,
}

impl BallotPreference {
    pub fn new(ballot_id: &str, candidate: &str, rank: u32) -> BallotPreference {
        BallotPreference {
            ballot_id: ballot_id.to_string(),
            candidate: candidate.to_string(),
            rank,
        }
    }
}

// ******** Output data structures *********

/// The status of a candidate at the end of a round.
///
/// Once a candidate is elected or eliminated, it never goes back to standing.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Standing,
    Elected,
    Eliminated,
}

/// Where the ballots of a decided candidate went during a round.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct TransferStats {
    /// The elected or eliminated candidate whose ballots moved.
    pub from: String,
    /// The factor applied to the weight of every moved ballot.
    pub weight_multiplier: Decimal,
    pub transfers: Vec<(String, Decimal)>,
    pub exhausted: Decimal,
}

/// Statistics for one round, as seen by the round engine.
///
/// The vote totals are the ones tallied at the start of the round, before
/// any transfer. The exhausted total is measured after the transfers of the
/// round.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub round: u32,
    pub quota: Decimal,
    /// One entry per candidate, sorted by name.
    pub tally: Vec<(String, Decimal, CandidateStatus)>,
    pub exhausted: Decimal,
    /// In election order.
    pub elected: Vec<String>,
    pub eliminated: Vec<String>,
    pub transfers: Vec<TransferStats>,
}

/// A row of the per-round, per-candidate table.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CandidateRound {
    pub round: u32,
    pub candidate_name: String,
    pub votes: Decimal,
    pub status: CandidateStatus,
}

/// A row of the per-round metadata table.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RoundMetadata {
    pub round: u32,
    pub quota: Decimal,
    pub exhausted: Decimal,
    pub elected_this_round: Option<Vec<String>>,
    pub eliminated_this_round: Option<Vec<String>>,
    pub transfers: Vec<TransferStats>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct TabulationSummary {
    pub number_of_rounds: u32,
    pub winners: Vec<String>,
    pub seats: u32,
    pub first_round_quota: Decimal,
    pub precision: Decimal,
    /// The number of ballots with at least one preference.
    pub ballot_count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct TabulationResult {
    pub rounds: Vec<RoundSnapshot>,
    pub candidate_rounds: Vec<CandidateRound>,
    pub round_metadata: Vec<RoundMetadata>,
    pub summary: TabulationSummary,
    /// In the order of election.
    pub winners: Vec<String>,
}

impl TabulationResult {
    /// The votes recorded for a candidate in a given round (1-based).
    pub fn votes(&self, round: u32, candidate: &str) -> Option<Decimal> {
        self.candidate_rounds
            .iter()
            .find(|r| r.round == round && r.candidate_name == candidate)
            .map(|r| r.votes)
    }

    pub fn status(&self, round: u32, candidate: &str) -> Option<CandidateStatus> {
        self.candidate_rounds
            .iter()
            .find(|r| r.round == round && r.candidate_name == candidate)
            .map(|r| r.status)
    }
}

/// Errors that prevent the tabulation from completing.
///
/// Configuration errors are detected before the first round. The other ones
/// indicate a defect in the data or in the engine and stop the count.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabulationError {
    #[snafu(display("The number of seats must be positive"))]
    InvalidSeats {},
    #[snafu(display(
        "The precision must be positive and below 1 / (seats + 1), got {precision} for {seats} seats"
    ))]
    InvalidPrecision { precision: Decimal, seats: u32 },
    #[snafu(display("No ballot with a valid preference"))]
    EmptyElection {},
    #[snafu(display("Ballot {ballot_id} has a preference without candidate name"))]
    EmptyCandidateName { ballot_id: String },
    #[snafu(display("Ballot {ballot_id} ranks {candidate} at position 0"))]
    InvalidRank { ballot_id: String, candidate: String },
    #[snafu(display("Ballot {ballot_id} uses rank {rank} more than once"))]
    DuplicateRank { ballot_id: String, rank: u32 },
    #[snafu(display("Ballot {ballot_id} ranks {candidate} more than once"))]
    DuplicateCandidate { ballot_id: String, candidate: String },
    #[snafu(display(
        "Vote conservation violated in round {round} ({stage}): expected {expected}, found {actual}"
    ))]
    VoteConservation {
        round: u32,
        stage: String,
        expected: Decimal,
        actual: Decimal,
    },
    #[snafu(display("The count did not terminate after {rounds} rounds"))]
    NoConvergence { rounds: u32 },
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum QuotaMethod {
    /// floor(ballots / (seats + 1)) + 1, computed once before the first round.
    Droop,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SurplusMethod {
    /// Gregory transfer: every ballot of an elected candidate moves on once,
    /// at the weight surplus / votes.
    Fractional,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum TieBreakMode {
    /// The candidate whose name sorts first is picked.
    Lexicographic,
    /// A permutation derived from a SHA-256 hash of the seed and the names.
    /// The same seed always gives the same choice.
    RandomSeed(u64),
}

/// The decision a tie-break is resolving.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum TieBreakPurpose {
    Elect,
    Eliminate,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRules {
    pub seats: u32,
    pub quota_method: QuotaMethod,
    pub surplus_method: SurplusMethod,
    /// Tolerance for all the comparisons between vote totals.
    pub precision: Decimal,
    pub tiebreak_mode: TieBreakMode,
}

impl VoteRules {
    pub const DEFAULT_RULES: VoteRules = VoteRules {
        seats: 1,
        quota_method: QuotaMethod::Droop,
        surplus_method: SurplusMethod::Fractional,
        // 0.000001
        precision: Decimal::from_parts(1, 0, 0, false, 6),
        tiebreak_mode: TieBreakMode::Lexicographic,
    };

    pub fn with_seats(seats: u32) -> VoteRules {
        VoteRules {
            seats,
            ..VoteRules::DEFAULT_RULES
        }
    }
}

impl Default for VoteRules {
    fn default() -> Self {
        VoteRules::DEFAULT_RULES
    }
}
