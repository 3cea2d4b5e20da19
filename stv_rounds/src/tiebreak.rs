use log::debug;

use crate::config::{TieBreakMode, TieBreakPurpose};

/// Orders tied candidates, the first one being the one picked by the tie-break.
///
/// The ordering only depends on the mode and on the set of names: the order of
/// the input does not matter, and elections and eliminations are ordered the
/// same way. With [TieBreakMode::Lexicographic], the name
/// sorting first comes first. With [TieBreakMode::RandomSeed], the names are
/// sorted by the SHA-256 digest of the seed and the name, which is
/// reproducible across runs and platforms.
///
/// ```
/// use stv_rounds::{tiebreak_order, TieBreakMode, TieBreakPurpose};
///
/// let order = tiebreak_order(
///     TieBreakMode::Lexicographic,
///     &["Zebra", "Alpha"],
///     TieBreakPurpose::Eliminate,
/// );
/// assert_eq!(order, vec!["Alpha", "Zebra"]);
/// ```
pub fn tiebreak_order<'a>(
    mode: TieBreakMode,
    candidates: &[&'a str],
    purpose: TieBreakPurpose,
) -> Vec<&'a str> {
    let mut res: Vec<&'a str> = candidates.to_vec();
    match mode {
        TieBreakMode::Lexicographic => {
            res.sort_unstable();
        }
        TieBreakMode::RandomSeed(seed) => {
            let mut keyed: Vec<(String, &'a str)> = res
                .iter()
                .map(|name| (seeded_key(seed, name), *name))
                .collect();
            keyed.sort();
            res = keyed.into_iter().map(|(_, name)| name).collect();
        }
    }
    res.dedup();
    debug!(
        "tiebreak_order: mode {:?} purpose {:?}: {:?}",
        mode, purpose, res
    );
    res
}

/// Picks a single candidate among tied candidates.
///
/// Returns `None` only when there is no candidate to choose from.
pub fn break_tie<'a>(
    mode: TieBreakMode,
    candidates: &[&'a str],
    purpose: TieBreakPurpose,
) -> Option<&'a str> {
    tiebreak_order(mode, candidates, purpose).first().copied()
}

fn seeded_key(seed: u64, name: &str) -> String {
    let data = format!("{:020}:{}", seed, name);
    sha256::digest(data.as_str())
}
