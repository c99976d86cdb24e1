// Reads the votes of a poll exported from the database.

use serde::Deserialize;

use crate::tally::{io_common::make_default_id, *};

#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
struct ExportOption {
    id: u64,
    #[serde(rename = "optionText", alias = "name")]
    option_text: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
struct ExportRank {
    #[serde(rename = "pollOptionId")]
    poll_option_id: u64,
    rank: i64,
}

#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
struct ExportVote {
    id: Option<u64>,
    submitted: Option<bool>,
    #[serde(rename = "votingRanks", default)]
    voting_ranks: Vec<ExportRank>,
}

#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
struct PollExport {
    #[serde(default, alias = "pollOptions")]
    options: Vec<ExportOption>,
    #[serde(default)]
    votes: Vec<ExportVote>,
}

// Either a full poll, or only the list of its votes.
#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExportFile {
    Poll(PollExport),
    Votes(Vec<ExportVote>),
}

pub fn read_json_export(path: &str) -> TallyResult<SourceData> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_json_export(path, &contents)
}

fn parse_json_export(path: &str, contents: &str) -> TallyResult<SourceData> {
    let default_id = make_default_id(path);
    let export: ExportFile = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    let (options, votes) = match export {
        ExportFile::Poll(p) => (p.options, p.votes),
        ExportFile::Votes(v) => (vec![], v),
    };
    debug!(
        "read_json_export: {} options, {} votes",
        options.len(),
        votes.len()
    );

    let parsed_votes: Vec<ParsedVote> = votes
        .iter()
        .enumerate()
        .map(|(idx, v)| ParsedVote {
            id: Some(v.id.map(|id| id.to_string()).unwrap_or_else(|| default_id(idx))),
            submitted: v.submitted,
            ranks: v
                .voting_ranks
                .iter()
                .map(|r| (r.poll_option_id, r.rank))
                .collect(),
        })
        .collect();

    Ok(SourceData {
        options: options
            .iter()
            .map(|o| PollOption::new(o.id, &o.option_text))
            .collect(),
        votes: parsed_votes,
    })
}
