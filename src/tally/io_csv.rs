// Primitives for reading CSV files.
//
// One rank per line: voteId,optionId,rank. A line with an empty option records a
// vote without any rank.

use std::collections::HashMap;
use std::fs::File;

use crate::tally::*;

pub fn read_csv_ranking(path: &str, source: &VoteSource) -> TallyResult<SourceData> {
    let (records, first_row) = get_records(path, source)?;

    let mut votes: Vec<ParsedVote> = Vec::new();
    // Position of each vote id in `votes`, to keep the order of first appearance.
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + first_row;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_ranking: lineno: {:?} row: {:?}", lineno, line);

        let vote_id = line
            .get(0)
            .context(CsvLineTooShortSnafu { lineno })?
            .trim()
            .to_string();
        let pos = *positions.entry(vote_id.clone()).or_insert_with(|| {
            votes.push(ParsedVote {
                id: Some(vote_id.clone()),
                submitted: None,
                ranks: Vec::new(),
            });
            votes.len() - 1
        });

        let option_cell = line.get(1).unwrap_or("").trim();
        if option_cell.is_empty() {
            continue;
        }
        let option = read_number::<u64>(option_cell, lineno)?;
        let rank_cell = line.get(2).context(CsvLineTooShortSnafu { lineno })?;
        let rank = read_number::<i64>(rank_cell, lineno)?;
        votes[pos].ranks.push((option, rank));
    }
    Ok(SourceData {
        options: Vec::new(),
        votes,
    })
}

fn read_number<T: std::str::FromStr>(cell: &str, lineno: usize) -> TallyResult<T> {
    cell.trim().parse::<T>().ok().context(CsvWrongNumberSnafu {
        lineno,
        content: cell,
    })
}

fn get_records(
    path: &str,
    source: &VoteSource,
) -> TallyResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = source.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    // The index starts at 1 to respect most conventions in the excel world
    for _ in 1..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
