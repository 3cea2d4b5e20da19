// Primitives for reading CSV files.

use std::io::Read;

use crate::stv::{
    io_common::{make_default_id, make_preference, RawRecord},
    *,
};

pub fn read_csv_preferences(
    path: &str,
    cfs: &FileSource,
    max_rank: u32,
) -> StvResult<Vec<BallotPreference>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_csv_records(rdr, path, cfs, max_rank)
}

pub fn read_csv_records<R: Read>(
    rdr: csv::Reader<R>,
    path: &str,
    cfs: &FileSource,
    max_rank: u32,
) -> StvResult<Vec<BallotPreference>> {
    let layout = cfs.layout()?;
    let default_id = make_default_id(path);
    let mut res: Vec<BallotPreference> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let line = line_r.context(CsvLineParseSnafu {
            path,
            lineno: idx + 1,
        })?;
        // The csv reader skips empty lines: rows are counted with its own
        // line numbers, blank lines included.
        let lineno = line
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 1);
        if lineno <= layout.skipped_rows || line.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        let cell = |col: usize| line.get(col).context(LineTooShortSnafu { path, lineno });
        let record = RawRecord {
            ballot_id: cell(layout.ballot_id)?,
            candidate: cell(layout.candidate)?,
            rank: cell(layout.rank)?,
        };
        debug!("read_csv_records: lineno: {:?} record: {:?}", lineno, record);
        if let Some(p) = make_preference(path, lineno, &record, max_rank, &default_id)? {
            res.push(p);
        }
    }
    info!("Read {} preferences from {}", res.len(), path);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(content: &str, cfs: &FileSource) -> StvResult<Vec<BallotPreference>> {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());
        read_csv_records(rdr, "test.csv", cfs, 10)
    }

    #[test]
    fn reads_with_header() {
        let cfs = FileSource::new("csv", "test.csv");
        let res = read(
            "ballot_id,candidate,rank\nb1,Alice,1\nb1,Bob,2\n\nb2,,1\nb3,Bob,1\n",
            &cfs,
        )
        .unwrap();
        assert_eq!(
            res,
            vec![
                BallotPreference::new("b1", "Alice", 1),
                BallotPreference::new("b1", "Bob", 2),
                BallotPreference::new("b3", "Bob", 1),
            ]
        );
    }

    #[test]
    fn reads_custom_columns() {
        let mut cfs = FileSource::new("csv", "test.csv");
        cfs.ballot_id_column = Some(JSValue::from(3));
        cfs.candidate_column = Some(JSValue::from(1));
        cfs.rank_column = Some(JSValue::from(2));
        cfs.first_row_index = Some(JSValue::from(1));
        let res = read("Alice,1,b1\nBob,1,b2\n", &cfs).unwrap();
        assert_eq!(res[1], BallotPreference::new("b2", "Bob", 1));
    }

    #[test]
    fn first_row_counts_blank_lines() {
        let mut cfs = FileSource::new("csv", "test.csv");
        cfs.first_row_index = Some(JSValue::from(3));
        let res = read("\nballot_id,candidate,rank\nb1,Alice,1\n", &cfs).unwrap();
        assert_eq!(res, vec![BallotPreference::new("b1", "Alice", 1)]);

        let err = read("\nballot_id,candidate,rank\nb1,Alice,1\n\nb2,Bob,x\n", &cfs).unwrap_err();
        assert!(matches!(err, StvError::InvalidRank { lineno: 5, .. }));

        // Blank lines after the header do not shift the data.
        let cfs = FileSource::new("csv", "test.csv");
        let res = read("ballot_id,candidate,rank\n\nb1,Alice,1\n", &cfs).unwrap();
        assert_eq!(res, vec![BallotPreference::new("b1", "Alice", 1)]);
    }

    #[test]
    fn reports_line_numbers() {
        let cfs = FileSource::new("csv", "test.csv");
        let err = read("id,candidate,rank\nb1,Alice,1\nb2,Bob\n", &cfs).unwrap_err();
        assert!(matches!(err, StvError::LineTooShort { lineno: 3, .. }));
        let err = read("id,candidate,rank\nb1,Alice,12\n", &cfs).unwrap_err();
        assert!(matches!(err, StvError::RankTooHigh { lineno: 2, .. }));
    }
}
