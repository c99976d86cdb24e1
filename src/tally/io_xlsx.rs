// Reads votes from an Excel spreadsheet.
//
// The first row holds the options, one per column starting from the second one:
// either an option id, or "<id>: <name>". Every following row is a vote, with the
// vote id in the first column and the rank of each option in the column of the option.
// The vote ids are optional: the first column may be left empty. Blank rows are skipped.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::tally::{io_common::make_default_id, *};

pub fn read_xlsx_ranking(path: &str, source: &VoteSource) -> TallyResult<SourceData> {
    let default_id = make_default_id(path);
    let first_row = source.first_vote_row_index()?;
    ensure!(first_row >= 2, ExcelVotesOverHeaderSnafu { first_row });
    let wrange = get_range(path, source)?;
    // The range starts at the first non-empty cell: all the positions below are absolute.
    let (last_row, last_col) = wrange.end().context(EmptyExcelSnafu {})?;
    debug!(
        "read_xlsx_ranking: range {:?} to {:?}",
        wrange.start(),
        wrange.end()
    );

    let mut columns: Vec<(u32, u64)> = Vec::new();
    let mut options: Vec<PollOption> = Vec::new();
    for col in 1..=last_col {
        if let Some((oid, name)) = read_header_cell(cell_at(&wrange, 0, col), col as usize)? {
            columns.push((col, oid));
            if let Some(n) = name {
                options.push(PollOption::new(oid, &n));
            }
        }
    }
    debug!("read_xlsx_ranking: columns: {:?}", columns);
    ensure!(!columns.is_empty(), EmptyExcelSnafu {});

    let mut votes: Vec<ParsedVote> = Vec::new();
    // Rows are numbered from 1, the header included.
    for row in (first_row - 1) as u32..=last_row {
        let lineno = row as usize + 1;
        let id = match cell_at(&wrange, row, 0) {
            DataType::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            DataType::Int(i) => Some(i.to_string()),
            DataType::Float(f) => Some(format!("{}", f)),
            _ => None,
        };

        let mut ranks: Vec<(u64, i64)> = Vec::new();
        for (col, oid) in columns.iter() {
            if let Some(rank) = read_rank_cell(cell_at(&wrange, row, *col), lineno)? {
                ranks.push((*oid, rank));
            }
        }
        if id.is_none() && ranks.is_empty() {
            debug!("read_xlsx_ranking: lineno {:?} is blank, skipped", lineno);
            continue;
        }
        debug!(
            "read_xlsx_ranking: lineno: {:?} id: {:?} ranks: {:?}",
            lineno, id, ranks
        );
        votes.push(ParsedVote {
            id: Some(id.unwrap_or_else(|| default_id(lineno))),
            submitted: None,
            ranks,
        });
    }
    Ok(SourceData { options, votes })
}

fn cell_at(wrange: &Range<DataType>, row: u32, col: u32) -> &DataType {
    wrange.get_value((row, col)).unwrap_or(&DataType::Empty)
}

fn get_range(path: &str, source: &VoteSource) -> TallyResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &source.worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name })?,
        None => workbook.worksheet_range_at(0).context(EmptyExcelSnafu {})?,
    };
    wrange.context(OpeningExcelSnafu { path })
}

// An option id, possibly followed by its name: "12" or "12: Pizza".
fn read_header_cell(cell: &DataType, col: usize) -> TallyResult<Option<(u64, Option<String>)>> {
    match cell {
        DataType::Empty => Ok(None),
        DataType::Int(i) if *i >= 0 => Ok(Some((*i as u64, None))),
        DataType::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Ok(Some((*f as u64, None))),
        DataType::String(s) if s.trim().is_empty() => Ok(None),
        DataType::String(s) => {
            let (id_part, name_part) = match s.split_once(':') {
                Some((id_part, name_part)) => (id_part, Some(name_part.trim().to_string())),
                None => (s.as_str(), None),
            };
            match id_part.trim().parse::<u64>() {
                Ok(oid) => Ok(Some((oid, name_part))),
                Err(_) => ExcelWrongCellTypeSnafu {
                    lineno: 1usize,
                    content: format!("{:?} in column {}", s, col + 1),
                }
                .fail(),
            }
        }
        _ => ExcelWrongCellTypeSnafu {
            lineno: 1usize,
            content: format!("{:?} in column {}", cell, col + 1),
        }
        .fail(),
    }
}

// A missing rank is not an error, the option is simply not ranked.
fn read_rank_cell(cell: &DataType, lineno: usize) -> TallyResult<Option<i64>> {
    match cell {
        DataType::Empty => Ok(None),
        DataType::Int(i) => Ok(Some(*i)),
        DataType::Float(f) if f.fract() == 0.0 => Ok(Some(*f as i64)),
        DataType::String(s) if s.trim().is_empty() => Ok(None),
        DataType::String(s) => match s.trim().parse::<i64>() {
            Ok(rank) => Ok(Some(rank)),
            Err(_) => ExcelWrongCellTypeSnafu {
                lineno,
                content: format!("{:?}", s),
            }
            .fail(),
        },
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_cells() {
        assert_eq!(read_header_cell(&DataType::Empty, 1).unwrap(), None);
        assert_eq!(
            read_header_cell(&DataType::Float(12.0), 1).unwrap(),
            Some((12, None))
        );
        assert_eq!(
            read_header_cell(&DataType::String("3: Pizza".to_string()), 1).unwrap(),
            Some((3, Some("Pizza".to_string())))
        );
        assert_eq!(
            read_header_cell(&DataType::String(" 4 ".to_string()), 1).unwrap(),
            Some((4, None))
        );
        assert!(read_header_cell(&DataType::String("Pizza".to_string()), 1).is_err());
    }

    #[test]
    fn rank_cells() {
        assert_eq!(read_rank_cell(&DataType::Empty, 2).unwrap(), None);
        assert_eq!(read_rank_cell(&DataType::Float(2.0), 2).unwrap(), Some(2));
        assert_eq!(read_rank_cell(&DataType::Int(-1), 2).unwrap(), Some(-1));
        assert_eq!(
            read_rank_cell(&DataType::String("3".to_string()), 2).unwrap(),
            Some(3)
        );
        assert!(matches!(
            read_rank_cell(&DataType::Float(1.5), 7),
            Err(TallyError::ExcelWrongCellType { lineno: 7, .. })
        ));
    }

    fn xlsx_test_path() -> String {
        [
            env!("CARGO_MANIFEST_DIR"),
            "testdata",
            "xlsx_unnamed_votes",
            "votes.xlsx",
        ]
        .iter()
        .collect::<PathBuf>()
        .display()
        .to_string()
    }

    #[test]
    fn sheet_without_vote_ids() {
        let path = xlsx_test_path();
        let data = read_xlsx_ranking(&path, &VoteSource::new("xlsx", "votes.xlsx")).unwrap();
        assert_eq!(
            data.options,
            vec![
                PollOption::new(1, "Pizza"),
                PollOption::new(2, "Tacos"),
                PollOption::new(3, "Sushi"),
            ]
        );
        // Row 8 is blank.
        assert_eq!(data.votes.len(), 7);
        assert_eq!(data.votes[0].id, Some("votes.xlsx-00000002".to_string()));
        assert_eq!(data.votes[0].ranks, vec![(1, 1), (2, 2), (3, 3)]);
        assert_eq!(data.votes[3].ranks, vec![(2, 1), (3, 2)]);
        assert_eq!(data.votes[6].id, Some("votes.xlsx-00000009".to_string()));
        assert_eq!(data.votes[6].ranks, vec![(1, 3), (2, 2), (3, 1)]);
    }

    #[test]
    fn votes_start_after_the_header() {
        let source: VoteSource = serde_json::from_str(
            r#"{"provider": "xlsx", "filePath": "votes.xlsx", "firstVoteRowIndex": 1}"#,
        )
        .unwrap();
        assert!(matches!(
            read_xlsx_ranking(&xlsx_test_path(), &source),
            Err(TallyError::ExcelVotesOverHeader { first_row: 1 })
        ));

        let source: VoteSource = serde_json::from_str(
            r#"{"provider": "xlsx", "filePath": "votes.xlsx", "firstVoteRowIndex": 4}"#,
        )
        .unwrap();
        let data = read_xlsx_ranking(&xlsx_test_path(), &source).unwrap();
        assert_eq!(data.votes.len(), 5);
        assert_eq!(data.votes[0].id, Some("votes.xlsx-00000004".to_string()));
    }

    #[test]
    fn missing_file() {
        let source = VoteSource::new("xlsx", "missing.xlsx");
        assert!(matches!(
            read_xlsx_ranking("/nonexistent/missing.xlsx", &source),
            Err(TallyError::OpeningExcel { .. })
        ));
    }
}
