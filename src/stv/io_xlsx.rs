// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::stv::{
    io_common::{make_default_id, make_preference, RawRecord},
    *,
};

pub fn read_xlsx_preferences(
    path: &str,
    cfs: &FileSource,
    max_rank: u32,
) -> StvResult<Vec<BallotPreference>> {
    let wrange = get_range(path, cfs)?;
    read_range(&wrange, path, cfs, max_rank)
}

pub fn read_range(
    wrange: &Range<DataType>,
    path: &str,
    cfs: &FileSource,
    max_rank: u32,
) -> StvResult<Vec<BallotPreference>> {
    let layout = cfs.layout()?;
    let default_id = make_default_id(path);
    let mut res: Vec<BallotPreference> = Vec::new();
    // The range starts at the first used cell, not at A1.
    let (first_row, first_col) = wrange
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    for (idx, row) in wrange.rows().enumerate() {
        let lineno = first_row + idx + 1;
        if lineno <= layout.skipped_rows || row.iter().all(|c| *c == DataType::Empty) {
            continue;
        }
        let cell = |col: usize| -> StvResult<String> {
            if col < first_col {
                return Ok("".to_string());
            }
            match row.get(col - first_col) {
                Some(c) => read_cell(c, lineno),
                None => LineTooShortSnafu { path, lineno }.fail(),
            }
        };
        let ballot_id = cell(layout.ballot_id)?;
        let candidate = cell(layout.candidate)?;
        let rank = cell(layout.rank)?;
        let record = RawRecord {
            ballot_id: ballot_id.as_str(),
            candidate: candidate.as_str(),
            rank: rank.as_str(),
        };
        debug!("read_range: lineno: {:?} record: {:?}", lineno, record);
        if let Some(p) = make_preference(path, lineno, &record, max_rank, &default_id)? {
            res.push(p);
        }
    }
    info!("Read {} preferences from {}", res.len(), path);
    Ok(res)
}

fn read_cell(cell: &DataType, lineno: usize) -> StvResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

fn get_range(path: &str, cfs: &FileSource) -> StvResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, &cfs.excel_worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.excel_worksheet_name {
        // A worksheet name was provided, use it.
        Some(worksheet_name) => workbook.worksheet_range(worksheet_name),
        None => workbook.worksheet_range_at(0),
    };
    wrange
        .context(EmptyExcelSnafu { path })?
        .context(OpeningExcelSnafu { path })
}
