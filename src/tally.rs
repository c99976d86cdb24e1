use log::{debug, info, warn};

use runoff_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::config_reader::*;

mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;
pub mod summary;

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive integer, found {content}"))]
    ParsingJsonNumber { content: String },

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("CSV line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("CSV line {lineno}: expected a number, found {content:?}"))]
    CsvWrongNumber { lineno: usize, content: String },

    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no worksheet or no header row"))]
    EmptyExcel {},
    #[snafu(display("Worksheet {name} not found"))]
    MissingWorksheet { name: String },
    #[snafu(display("Excel line {lineno}: could not understand cell {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Votes cannot start at row {first_row}: the first row holds the options"))]
    ExcelVotesOverHeader { first_row: usize },

    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("No vote source was provided"))]
    MissingSources {},
    #[snafu(display("Provider not implemented: {provider}"))]
    UnknownProvider { provider: String },

    #[snafu(display("Tabulation failed: {source}"))]
    Tabulation { source: TabulationErrors },
    #[snafu(display("Difference detected between the tabulated outcome and the reference {path}"))]
    ReferenceMismatch { path: String },
    #[snafu(display("Error writing the outcome to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;

/// A vote, as parsed by the readers.
/// This is before filtering drafts and dropping unknown options.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedVote {
    pub id: Option<String>,
    /// None when the source does not record it. Such votes count as submitted.
    pub submitted: Option<bool>,
    /// (option id, rank) pairs, in the order of the source.
    pub ranks: Vec<(u64, i64)>,
}

/// The content of a vote source.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SourceData {
    /// Only some sources describe the options of the poll.
    pub options: Vec<PollOption>,
    pub votes: Vec<ParsedVote>,
}

fn rounds_to_json(rounds: &[RoundRecord]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round in rounds.iter() {
        let mut results: JSMap<String, JSValue> = JSMap::new();
        for (oid, snap) in round.snapshot.iter() {
            results.insert(
                oid.to_string(),
                json!({"name": snap.name, "count": snap.count, "eliminated": snap.eliminated}),
            );
        }
        l.push(json!({"round": round.round, "results": results}));
    }
    l
}

/// The outcome of the poll, in the shape of the results endpoint.
pub fn result_to_json(res: &TabulationResult) -> JSValue {
    match res {
        TabulationResult::Winner {
            option_id,
            name,
            vote_count,
            total_votes,
            rounds,
        } => json!({
            "status": "winner",
            "optionId": option_id.to_string(),
            "name": name,
            "voteCount": vote_count,
            "totalVotes": total_votes,
            "rounds": rounds_to_json(rounds)
        }),
        TabulationResult::Tie {
            tied_options,
            total_votes,
            rounds,
        } => {
            let tied: Vec<JSValue> = tied_options
                .iter()
                .map(|t| {
                    json!({
                        "optionId": t.option_id.to_string(),
                        "name": t.name,
                        "voteCount": t.vote_count
                    })
                })
                .collect();
            json!({
                "status": "tie",
                "tiedOptions": tied,
                "totalVotes": total_votes,
                "rounds": rounds_to_json(rounds)
            })
        }
    }
}

fn build_output_js(config: &PollConfig, res: &TabulationResult) -> JSValue {
    let body = result_to_json(res);
    match &config.output_settings {
        Some(os) => {
            let c = OutputConfig {
                name: os.poll_name.clone(),
                id: os.poll_id,
                threshold: majority_threshold(res.total_votes()),
            };
            json!({ "poll": c, "result": body })
        }
        None => body,
    }
}

fn read_vote_source(root: &Path, source: &VoteSource) -> TallyResult<SourceData> {
    let p: PathBuf = root.join(&source.file_path);
    let path = p.as_path().display().to_string();
    info!("Attempting to read vote file {:?}", path);
    match source.provider.as_str() {
        "json" => io_json::read_json_export(&path),
        "csv" => io_csv::read_csv_ranking(&path, source),
        "xlsx" => io_xlsx::read_xlsx_ranking(&path, source),
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

fn collect_ballots(votes: &[ParsedVote], only_submitted: bool) -> Vec<RawBallot> {
    let mut res: Vec<RawBallot> = Vec::new();
    let mut skipped: usize = 0;
    for v in votes.iter() {
        if only_submitted && v.submitted == Some(false) {
            debug!("collect_ballots: skipping draft vote {:?}", v.id);
            skipped += 1;
            continue;
        }
        let ranks: Vec<RankAssignment> = v
            .ranks
            .iter()
            .map(|(oid, rank)| RankAssignment {
                option: OptionId(*oid),
                rank: *rank,
            })
            .collect();
        if ranks.is_empty() {
            debug!("collect_ballots: vote {:?} has no rank", v.id);
        }
        res.push(RawBallot { ranks });
    }
    if skipped > 0 {
        info!("Skipped {} votes that were not submitted", skipped);
    }
    res
}

// Options declared in the configuration take precedence over the ones found in
// the sources. Among sources, the first declaration of an id wins.
fn merge_options(config: &PollConfig, found: &[PollOption]) -> Vec<PollOption> {
    let declared = config.poll_options();
    if !declared.is_empty() {
        return declared;
    }
    let mut res: Vec<PollOption> = Vec::new();
    for opt in found.iter() {
        if res.iter().any(|o| o.id == opt.id) {
            debug!("merge_options: option {} declared again, ignored", opt.id);
        } else {
            res.push(opt.clone());
        }
    }
    res
}

/// Reads all the vote sources and runs the tabulation.
///
/// Returns the outcome and its JSON rendering.
pub fn tabulate_poll(
    config: &PollConfig,
    source_root: &Path,
) -> TallyResult<(TabulationResult, JSValue)> {
    ensure!(!config.vote_sources.is_empty(), MissingSourcesSnafu {});

    let mut found_options: Vec<PollOption> = Vec::new();
    let mut ballots: Vec<RawBallot> = Vec::new();
    for source in config.vote_sources.iter() {
        let data = read_vote_source(source_root, source)?;
        let only_submitted = source
            .only_submitted
            .or(config.rules.only_submitted)
            .unwrap_or(false);
        info!(
            "Read {} votes from {} (only submitted: {})",
            data.votes.len(),
            source.file_path,
            only_submitted
        );
        found_options.extend(data.options);
        ballots.extend(collect_ballots(&data.votes, only_submitted));
    }

    let options = merge_options(config, &found_options);
    debug!("tabulate_poll: options: {:?}", options);

    let result = run_tabulation(&options, &ballots).context(TabulationSnafu {})?;
    debug!("tabulate_poll: result: {:?}", result);

    let result_js = build_output_js(config, &result);
    Ok((result, result_js))
}

fn check_reference(reference_path: &str, result_js: &JSValue) -> TallyResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    let pretty_js_stats = serde_json::to_string_pretty(result_js).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_ref(),
            "\n",
        );
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    Ok(())
}

pub fn run_poll(args: &Args) -> TallyResult<()> {
    let (mut config, config_root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None if args.input.is_some() => (PollConfig::default(), PathBuf::new()),
        None => whatever!("Either --config or --input must be provided"),
    };

    // A file given on the command line is relative to the working directory.
    let mut source_root = config_root.clone();
    if let Some(input) = &args.input {
        let provider = args.input_type.clone().unwrap_or_else(|| "json".to_string());
        config.vote_sources = vec![VoteSource::new(&provider, input)];
        source_root = PathBuf::new();
    }
    if let Some(ws) = &args.worksheet_name {
        for source in config.vote_sources.iter_mut() {
            source.worksheet_name = Some(ws.clone());
        }
    }
    if args.only_submitted {
        config.force_only_submitted();
    }
    info!("config: {:?}", config);

    let (result, result_js) = tabulate_poll(&config, &source_root)?;
    let pretty_js = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    let out_path: Option<String> = args.out.clone().or_else(|| {
        config
            .output_settings
            .as_ref()
            .and_then(|os| os.output_path.clone())
            .map(|p| config_root.join(p).display().to_string())
    });
    match out_path.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js),
        Some("") => debug!("run_poll: no output requested"),
        Some(p) => {
            info!("Writing the outcome to {:?}", p);
            fs::write(p, &pretty_js).context(WritingOutputSnafu { path: p })?;
        }
    }

    if args.summary {
        println!("{}", summary::summary_line(&result));
    }

    // The reference outcome, if provided for comparison
    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &result_js)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(test_name: &str) -> PathBuf {
        [env!("CARGO_MANIFEST_DIR"), "testdata", test_name]
            .iter()
            .collect()
    }

    fn test_wrapper(test_name: &str) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = test_dir(test_name);
        let args = Args {
            config: Some(dir.join("config.json").display().to_string()),
            reference: Some(dir.join("expected.json").display().to_string()),
            out: Some("".to_string()),
            ..Default::default()
        };
        if let Err(e) = run_poll(&args) {
            panic!("{}: {}", test_name, e);
        }
    }

    #[test]
    fn last_place_then_tie() {
        test_wrapper("last_place_then_tie");
    }

    #[test]
    fn csv_batch_elimination() {
        test_wrapper("csv_batch_elimination");
    }

    #[test]
    fn xlsx_unnamed_votes() {
        test_wrapper("xlsx_unnamed_votes");
    }

    #[test]
    fn only_submitted_votes() {
        test_wrapper("only_submitted_votes");
    }

    #[test]
    fn drafts_count_by_default() {
        let dir = test_dir("only_submitted_votes");
        let mut config = read_config(&dir.join("config.json").display().to_string()).unwrap();
        config.rules.only_submitted = None;
        let (result, _) = tabulate_poll(&config, &dir).unwrap();
        assert_eq!(result.total_votes(), 4);
        match result {
            TabulationResult::Tie { tied_options, .. } => {
                assert_eq!(tied_options.len(), 1);
                assert_eq!(tied_options[0].option_id, OptionId(2));
                assert_eq!(tied_options[0].vote_count, 3);
            }
            x => panic!("expected a tie, got {:?}", x),
        }
    }

    #[test]
    fn input_without_config() {
        let dir = test_dir("last_place_then_tie");
        let args = Args {
            input: Some(dir.join("votes.json").display().to_string()),
            input_type: Some("json".to_string()),
            out: Some("".to_string()),
            summary: true,
            ..Default::default()
        };
        assert!(run_poll(&args).is_ok());
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let dir = test_dir("last_place_then_tie");
        let args = Args {
            config: Some(dir.join("config.json").display().to_string()),
            reference: Some(
                test_dir("csv_batch_elimination")
                    .join("expected.json")
                    .display()
                    .to_string(),
            ),
            out: Some("".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            run_poll(&args),
            Err(TallyError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn missing_arguments() {
        assert!(run_poll(&Args::default()).is_err());
    }

    #[test]
    fn unknown_provider() {
        let mut config = PollConfig::default();
        config.vote_sources = vec![VoteSource::new("dominion", "votes.xml")];
        assert!(matches!(
            tabulate_poll(&config, Path::new("")),
            Err(TallyError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn poll_without_options_fails() {
        let dir = test_dir("csv_batch_elimination");
        let mut config = read_config(&dir.join("config.json").display().to_string()).unwrap();
        config.options.clear();
        assert!(matches!(
            tabulate_poll(&config, &dir),
            Err(TallyError::Tabulation {
                source: TabulationErrors::EmptyPoll
            })
        ));
    }

    #[test]
    fn json_rendering_of_a_winner() {
        let mut b = runoff_tally::builder::Builder::new()
            .options(&[PollOption::new(1, "A"), PollOption::new(2, "B")])
            .unwrap();
        for _ in 0..3 {
            b.add_ballot_simple(&[OptionId(1)]);
        }
        let js = result_to_json(&b.tabulate().unwrap());
        assert_eq!(js["status"], json!("winner"));
        assert_eq!(js["optionId"], json!("1"));
        assert_eq!(js["voteCount"], json!(3));
        assert_eq!(js["totalVotes"], json!(3));
        assert_eq!(
            js["rounds"][0]["results"]["2"],
            json!({"name": "B", "count": 0, "eliminated": false})
        );
    }
}
