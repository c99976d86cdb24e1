// The one-line summary of an outcome, as sent to the participants of a poll.

use runoff_tally::{TabulationResult, TiedOption};

pub fn summary_line(res: &TabulationResult) -> String {
    match res {
        TabulationResult::Winner {
            name,
            vote_count,
            total_votes,
            ..
        } => winner_line(name, *vote_count, *total_votes),
        TabulationResult::Tie {
            tied_options,
            total_votes,
            ..
        } => match tied_options.as_slice() {
            // The last option standing did not reach the threshold, but it is
            // presented as the winner.
            [only] => winner_line(&only.name, only.vote_count, *total_votes),
            _ => tie_line(tied_options),
        },
    }
}

fn winner_line(name: &str, vote_count: u64, total_votes: u64) -> String {
    format!(
        "The winning option is {} with {} of {} votes.",
        name, vote_count, total_votes
    )
}

fn tie_line(tied_options: &[TiedOption]) -> String {
    let names: Vec<&str> = tied_options.iter().map(|t| t.name.as_str()).collect();
    let count = tied_options.first().map(|t| t.vote_count).unwrap_or(0);
    format!(
        "It's a tie between {}, each receiving {} votes.",
        names.join(", "),
        count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use runoff_tally::OptionId;

    fn tied(id: u64, name: &str, vote_count: u64) -> TiedOption {
        TiedOption {
            option_id: OptionId(id),
            name: name.to_string(),
            vote_count,
        }
    }

    #[test]
    fn winner() {
        let res = TabulationResult::Winner {
            option_id: OptionId(1),
            name: "Pizza".to_string(),
            vote_count: 7,
            total_votes: 10,
            rounds: vec![],
        };
        assert_eq!(
            summary_line(&res),
            "The winning option is Pizza with 7 of 10 votes."
        );
    }

    #[test]
    fn tie() {
        let res = TabulationResult::Tie {
            tied_options: vec![tied(7, "Die Hard", 3), tied(8, "Heat", 3)],
            total_votes: 6,
            rounds: vec![],
        };
        assert_eq!(
            summary_line(&res),
            "It's a tie between Die Hard, Heat, each receiving 3 votes."
        );
    }

    #[test]
    fn last_option_standing() {
        let res = TabulationResult::Tie {
            tied_options: vec![tied(2, "No", 3)],
            total_votes: 4,
            rounds: vec![],
        };
        assert_eq!(
            summary_line(&res),
            "The winning option is No with 3 of 4 votes."
        );
    }
}
