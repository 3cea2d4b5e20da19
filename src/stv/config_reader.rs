use crate::stv::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    pub threshold: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "ballotIdColumn")]
    pub ballot_id_column: Option<JSValue>,
    #[serde(rename = "candidateColumn")]
    pub candidate_column: Option<JSValue>,
    #[serde(rename = "rankColumn")]
    pub rank_column: Option<JSValue>,
    #[serde(rename = "firstRowIndex")]
    pub first_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

/// 0-based positions of the columns of a preference file.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub ballot_id: usize,
    pub candidate: usize,
    pub rank: usize,
    /// Number of rows to skip before the data.
    pub skipped_rows: usize,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            ..FileSource::default()
        }
    }

    pub fn layout(&self) -> StvResult<ColumnLayout> {
        let ballot_id = read_js_index(&self.ballot_id_column, 1)?;
        let candidate = read_js_index(&self.candidate_column, 2)?;
        let rank = read_js_index(&self.rank_column, 3)?;
        let first_row = read_js_index(&self.first_row_index, 2)?;
        Ok(ColumnLayout {
            ballot_id: ballot_id - 1,
            candidate: candidate - 1,
            rank: rank - 1,
            skipped_rows: first_row - 1,
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StvRules {
    #[serde(rename = "numberOfWinners")]
    pub number_of_winners: JSValue,
    #[serde(rename = "quotaMethod")]
    pub quota_method: Option<String>,
    #[serde(rename = "surplusMethod")]
    pub surplus_method: Option<String>,
    #[serde(rename = "decimalPrecision")]
    pub decimal_precision: Option<String>,
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: String,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<JSValue>,
    #[serde(rename = "maxRankingsAllowed")]
    pub max_rankings_allowed: Option<JSValue>,
    #[serde(rename = "rulesDescription")]
    pub rules_description: Option<String>,
}

impl Default for StvRules {
    fn default() -> Self {
        StvRules {
            number_of_winners: JSValue::from(1),
            quota_method: None,
            surplus_method: None,
            decimal_precision: None,
            tiebreak_mode: "lexicographic".to_string(),
            random_seed: None,
            max_rankings_allowed: None,
            rules_description: None,
        }
    }
}

pub const DEFAULT_MAX_RANKINGS: u32 = 10;

impl StvRules {
    pub fn max_rankings(&self) -> StvResult<u32> {
        match &self.max_rankings_allowed {
            None => Ok(DEFAULT_MAX_RANKINGS),
            Some(JSValue::String(s)) if s == "max" => Ok(u32::MAX),
            x => {
                let max = read_js_u32(x)?;
                ensure!(
                    max > 0,
                    ParsingJsonNumberSnafu {
                        value: format!("{:?}", x)
                    }
                );
                Ok(max)
            }
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StvConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "ballotSources", default)]
    pub ballot_sources: Vec<FileSource>,
    #[serde(default)]
    pub rules: StvRules,
}

pub fn read_config(path: &str) -> StvResult<StvConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> StvResult<StvConfig> {
    serde_json::from_str(contents).context(ParsingJsonSnafu {})
}

/// Reads a reference summary produced by a previous run.
pub fn read_summary(path: &str) -> StvResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

pub(crate) fn read_js_int(x: &Option<JSValue>) -> StvResult<u64> {
    let value = format!("{:?}", x);
    match x {
        Some(JSValue::Number(n)) => n.as_u64().context(ParsingJsonNumberSnafu { value }),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<u64>()
            .ok()
            .context(ParsingJsonNumberSnafu { value }),
        _ => None.context(ParsingJsonNumberSnafu { value }),
    }
}

pub(crate) fn read_js_u32(x: &Option<JSValue>) -> StvResult<u32> {
    let n = read_js_int(x)?;
    u32::try_from(n).ok().context(ParsingJsonNumberSnafu {
        value: n.to_string(),
    })
}

// 1-based column or row index. Single letters are Excel-style columns.
fn read_js_index(x: &Option<JSValue>, default: usize) -> StvResult<usize> {
    let res = match x {
        None | Some(JSValue::Null) => default,
        Some(JSValue::String(s))
            if s.chars().count() == 1 && s.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            let c = s.to_ascii_uppercase().as_bytes()[0];
            (c - b'A') as usize + 1
        }
        _ => usize::try_from(read_js_int(x)?)
            .ok()
            .context(ParsingJsonNumberSnafu {
                value: format!("{:?}", x),
            })?,
    };
    ensure!(
        res >= 1,
        ParsingJsonNumberSnafu {
            value: format!("{:?}", x)
        }
    );
    Ok(res)
}
