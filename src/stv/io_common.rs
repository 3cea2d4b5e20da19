use std::path::Path;

use crate::stv::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Identifiers for the rows that do not carry a ballot id.
pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// The raw content of the three columns of one row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawRecord<'a> {
    pub ballot_id: &'a str,
    pub candidate: &'a str,
    pub rank: &'a str,
}

/// Turns one row of a preference file into a preference.
///
/// Rows without candidate are skipped. Ranks are 1-based and bounded by
/// `max_rank`.
pub fn make_preference(
    path: &str,
    lineno: usize,
    record: &RawRecord,
    max_rank: u32,
    default_id: &impl Fn(usize) -> String,
) -> StvResult<Option<BallotPreference>> {
    let candidate = record.candidate.trim();
    if candidate.is_empty() {
        debug!("make_preference: {}:{}: no candidate, skipping", path, lineno);
        return Ok(None);
    }
    let rank_s = record.rank.trim();
    // Excel writes integers as 2.0
    let rank_s = rank_s.strip_suffix(".0").unwrap_or(rank_s);
    let rank: u32 = rank_s
        .parse::<u32>()
        .ok()
        .filter(|r| *r >= 1)
        .context(InvalidRankSnafu {
            path,
            lineno,
            value: record.rank,
        })?;
    ensure!(
        rank <= max_rank,
        RankTooHighSnafu {
            path,
            lineno,
            rank,
            max: max_rank
        }
    );
    let ballot_id = match record.ballot_id.trim() {
        "" => default_id(lineno),
        s => s.to_string(),
    };
    Ok(Some(BallotPreference {
        ballot_id,
        candidate: candidate.to_string(),
        rank,
    }))
}
