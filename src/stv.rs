use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use stv_rounds::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;

pub use config_reader::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Unexpected cell on line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a non-negative integer, found {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Expected a decimal number, found {value}"))]
    ParsingDecimal {
        source: rust_decimal::Error,
        value: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Missing columns on line {lineno} of {path}"))]
    LineTooShort { path: String, lineno: usize },
    #[snafu(display("Invalid rank {value:?} on line {lineno} of {path}"))]
    InvalidRank {
        path: String,
        lineno: usize,
        value: String,
    },
    #[snafu(display("Rank {rank} on line {lineno} of {path} exceeds the maximum of {max}"))]
    RankTooHigh {
        path: String,
        lineno: usize,
        rank: u32,
        max: u32,
    },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Tabulation failed"))]
    Tabulation { source: TabulationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type StvResult<T> = Result<T, StvError>;

fn decision_transfers(name: &str, transfers: &[TransferStats]) -> JSMap<String, JSValue> {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    if let Some(ts) = transfers.iter().find(|ts| ts.from == name) {
        for (to, weight) in ts.transfers.iter() {
            res.insert(to.clone(), json!(weight.to_string()));
        }
        if ts.exhausted > Decimal::ZERO {
            res.insert("exhausted".to_string(), json!(ts.exhausted.to_string()));
        }
    }
    res
}

fn result_stats_to_json(rs: &TabulationResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.rounds.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, votes, status) in round_stat.tally.iter() {
            // Candidates eliminated in a previous round are not shown.
            if *status == CandidateStatus::Eliminated && !round_stat.eliminated.contains(name) {
                continue;
            }
            tally.insert(name.clone(), json!(votes.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        for name in round_stat.elected.iter() {
            tally_results.push(json!({
                "elected": name,
                "transfers": decision_transfers(name, &round_stat.transfers)
            }));
        }
        for name in round_stat.eliminated.iter() {
            tally_results.push(json!({
                "eliminated": name,
                "transfers": decision_transfers(name, &round_stat.transfers)
            }));
        }

        let js = json!({
            "round": round_stat.round,
            "tally": tally,
            "tallyResults": tally_results,
            "exhausted": round_stat.exhausted.to_string()
        });
        l.push(js);
    }
    l
}

fn build_summary_js(settings: &OutputSettings, rv: &TabulationResult) -> JSValue {
    let c = OutputConfig {
        contest: settings.contest_name.clone(),
        date: settings.contest_date.clone(),
        jurisdiction: settings.contest_jurisdiction.clone(),
        office: settings.contest_office.clone(),
        threshold: Some(rv.summary.first_round_quota.to_string()),
    };
    let summary = json!({
        "numberOfRounds": rv.summary.number_of_rounds,
        "winners": rv.summary.winners,
        "seats": rv.summary.seats,
        "firstRoundQuota": rv.summary.first_round_quota.to_string(),
        "precision": rv.summary.precision.to_string(),
        "ballotCount": rv.summary.ballot_count,
    });
    let rounds: Vec<JSValue> = rv
        .round_metadata
        .iter()
        .map(|m| {
            json!({
                "round": m.round,
                "quota": m.quota.to_string(),
                "exhausted": m.exhausted.to_string(),
                "electedThisRound": m.elected_this_round,
                "eliminatedThisRound": m.eliminated_this_round,
            })
        })
        .collect();
    let candidate_rounds: Vec<JSValue> = rv
        .candidate_rounds
        .iter()
        .map(|cr| {
            json!({
                "round": cr.round,
                "candidate": cr.candidate_name,
                "votes": cr.votes.to_string(),
                "status": cr.status,
            })
        })
        .collect();
    json!({
        "config": c,
        "summary": summary,
        "rounds": rounds,
        "candidateRounds": candidate_rounds,
        "results": result_stats_to_json(rv)
    })
}

fn validate_rules(stv_rules: &StvRules, seats_override: Option<u32>) -> StvResult<VoteRules> {
    let seats = match seats_override {
        Some(x) => x,
        None => read_js_u32(&Some(stv_rules.number_of_winners.clone()))?,
    };
    let quota_method = match stv_rules.quota_method.as_deref() {
        None | Some("droop") => QuotaMethod::Droop,
        Some(x) => {
            whatever!("Cannot use quota method {:?}: currently not implemented", x)
        }
    };
    let surplus_method = match stv_rules.surplus_method.as_deref() {
        None | Some("fractional") | Some("gregory") | Some("droop-surplus-first") => {
            SurplusMethod::Fractional
        }
        Some(x) => {
            whatever!(
                "Cannot use surplus method {:?}: currently not implemented",
                x
            )
        }
    };
    let precision = match &stv_rules.decimal_precision {
        None => VoteRules::DEFAULT_RULES.precision,
        Some(s) => Decimal::from_str(s.trim()).context(ParsingDecimalSnafu { value: s })?,
    };
    let tiebreak_mode = match stv_rules.tiebreak_mode.as_str() {
        "lexicographic" => TieBreakMode::Lexicographic,
        "random" => {
            if stv_rules.random_seed.is_none() {
                whatever!("Tiebreak mode random requires a randomSeed")
            }
            TieBreakMode::RandomSeed(read_js_int(&stv_rules.random_seed)?)
        }
        x => {
            whatever!(
                "Cannot use tiebreak mode {:?}: currently not implemented",
                x
            )
        }
    };
    Ok(VoteRules {
        seats,
        quota_method,
        surplus_method,
        precision,
        tiebreak_mode,
    })
}

fn read_preference_data(
    root_path: &Path,
    cfs: &FileSource,
    max_rank: u32,
) -> StvResult<Vec<BallotPreference>> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read preference file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_preferences(&p2, cfs, max_rank),
        "xlsx" => io_xlsx::read_xlsx_preferences(&p2, cfs, max_rank),
        x => {
            whatever!("Provider not implemented {:?}", x)
        }
    }
}

// The source described by --input, which replaces the sources of the config.
fn input_source(args: &Args, input: &str) -> FileSource {
    let provider = match args.input_type.as_deref() {
        Some(x) => x.to_string(),
        None if input.to_lowercase().ends_with(".xlsx") => "xlsx".to_string(),
        None => "csv".to_string(),
    };
    FileSource {
        excel_worksheet_name: args.excel_worksheet_name.clone(),
        ..FileSource::new(provider.as_str(), input)
    }
}

fn write_output(out: &str, content: &str) -> StvResult<()> {
    if out == "stdout" {
        println!("{}", content);
        return Ok(());
    }
    info!("Writing summary to {}", out);
    fs::write(out, content).context(WritingOutputSnafu { path: out })
}

pub fn run_election(args: &Args) -> StvResult<()> {
    let (config, root_p): (StvConfig, PathBuf) = match (&args.config, &args.input) {
        (Some(config_path), _) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root_p)
        }
        (None, Some(input)) => {
            let config = StvConfig {
                output_settings: OutputSettings {
                    contest_name: io_common::simplify_file_name(input),
                    ..OutputSettings::default()
                },
                ballot_sources: Vec::new(),
                rules: StvRules::default(),
            };
            (config, PathBuf::new())
        }
        (None, None) => {
            whatever!("Either a configuration or an input file must be provided")
        }
    };
    debug!("run_election: config: {:?}", config);

    let rules = validate_rules(&config.rules, args.seats)?;
    let max_rank = config.rules.max_rankings()?;

    let (sources, source_root): (Vec<FileSource>, PathBuf) = match &args.input {
        // The input path is taken as is, not relative to the config.
        Some(input) => (vec![input_source(args, input)], PathBuf::new()),
        None => (config.ballot_sources.clone(), root_p.clone()),
    };
    if sources.is_empty() {
        whatever!("No ballot source found in the configuration")
    }

    let mut data: Vec<BallotPreference> = Vec::new();
    for cfs in sources.iter() {
        let mut file_data = read_preference_data(&source_root, cfs, max_rank)?;
        data.append(&mut file_data);
    }
    info!("Read {} preferences in total", data.len());

    let result = tabulate(&data, &rules).context(TabulationSnafu {})?;
    info!("Winners: {:?}", result.winners);

    let result_js = build_summary_js(&config.output_settings, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match (&args.out, &config.output_settings.output_directory) {
        (Some(out), _) => write_output(out, &pretty_js_stats)?,
        (None, Some(dir)) => {
            let p = root_p.join(dir).join("summary.json");
            write_output(&p.display().to_string(), &pretty_js_stats)?
        }
        (None, None) => write_output("stdout", &pretty_js_stats)?,
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("The summary matches the reference {}", summary_p);
    }

    Ok(())
}
