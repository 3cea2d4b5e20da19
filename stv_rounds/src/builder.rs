pub use crate::config::*;

/// A builder for adding ballots.
///
/// ```
/// pub use stv_rounds::builder::Builder;
/// pub use stv_rounds::VoteRules;
/// # use stv_rounds::TabulationError;
///
/// let mut builder = Builder::new(&VoteRules::with_seats(2))?;
///
/// builder.add_ballot("ballot-1", &["Anna", "Clara"])?;
/// builder.add_preference("ballot-2", "Bob", 1)?;
/// builder.add_ballot_simple(&["Clara"])?;
///
/// assert_eq!(builder.preferences().len(), 4);
/// # Ok::<(), TabulationError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: VoteRules,
    pub(crate) _preferences: Vec<BallotPreference>,
    pub(crate) _num_anonymous: usize,
}

impl Builder {
    pub fn new(rules: &VoteRules) -> Result<Builder, TabulationError> {
        Ok(Builder {
            _rules: rules.clone(),
            _preferences: Vec::new(),
            _num_anonymous: 0,
        })
    }

    /// Adds a single ranked preference to a ballot.
    ///
    /// Preferences of the same ballot can be added in any order. Ranks and
    /// candidates are checked for duplicates when tabulating.
    pub fn add_preference(
        &mut self,
        ballot_id: &str,
        candidate: &str,
        rank: u32,
    ) -> Result<(), TabulationError> {
        self.add_preference_record(&BallotPreference::new(ballot_id, candidate, rank))
    }

    /// Adds a preference that was already built, for example by a file reader.
    pub fn add_preference_record(&mut self, preference: &BallotPreference) -> Result<(), TabulationError> {
        self._preferences.push(preference.clone());
        Ok(())
    }

    /// Adds a full ballot. The first candidate gets rank 1, the second rank 2
    /// and so on. Empty names leave a gap in the ranks.
    pub fn add_ballot(&mut self, ballot_id: &str, candidates: &[&str]) -> Result<(), TabulationError> {
        for (idx, name) in candidates.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            self.add_preference(ballot_id, name, idx as u32 + 1)?;
        }
        Ok(())
    }

    /// Adds a full ballot with a generated identifier.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_ballot_simple(&mut self, candidates: &[&str]) -> Result<(), TabulationError> {
        self._num_anonymous += 1;
        let ballot_id = format!("ballot-{:08}", self._num_anonymous);
        self.add_ballot(ballot_id.as_str(), candidates)
    }

    pub fn preferences(&self) -> &[BallotPreference] {
        &self._preferences
    }

    pub fn tabulate(&self) -> Result<TabulationResult, TabulationError> {
        crate::tabulate(&self._preferences, &self._rules)
    }
}
