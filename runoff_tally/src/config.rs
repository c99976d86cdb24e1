// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The identifier of an option, as assigned by the storage layer.
///
/// Identifiers are unique within a poll. Options are always visited in increasing
/// identifier order, which makes every outcome of the tabulation deterministic.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct OptionId(pub u64);

impl Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the choices offered by a poll.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PollOption {
    pub id: OptionId,
    pub name: String,
}

impl PollOption {
    pub fn new(id: u64, name: &str) -> PollOption {
        PollOption {
            id: OptionId(id),
            name: name.to_string(),
        }
    }
}

/// A rank given by a voter to an option.
///
/// Ranks do not need to be contiguous or to start at 1: only their relative order matters.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct RankAssignment {
    pub option: OptionId,
    pub rank: i64,
}

/// All the rank assignments submitted by one voter, in submission order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawBallot {
    pub ranks: Vec<RankAssignment>,
}

impl RawBallot {
    /// Builds a ballot from choices that are already in preference order.
    pub fn from_ordered(choices: &[OptionId]) -> RawBallot {
        RawBallot {
            ranks: choices
                .iter()
                .enumerate()
                .map(|(idx, option)| RankAssignment {
                    option: *option,
                    rank: (idx + 1) as i64,
                })
                .collect(),
        }
    }
}

/// A canonical ballot: known options only, most preferred first, no repetition.
/// It may be empty.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Ballot {
    pub choices: Vec<OptionId>,
}

// ******** Output data structures *********

/// The state of one option at the end of the count of a round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OptionSnapshot {
    pub name: String,
    /// Always 0 once the option has been eliminated.
    pub count: u64,
    pub eliminated: bool,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundRecord {
    /// Starts at 1.
    pub round: u32,
    /// Every option of the poll, including the eliminated ones.
    pub snapshot: BTreeMap<OptionId, OptionSnapshot>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TiedOption {
    pub option_id: OptionId,
    pub name: String,
    pub vote_count: u64,
}

/// The outcome of a tabulation.
///
/// `total_votes` is the number of ballots handed to the engine, including the empty ones.
/// `rounds` always runs from round 1 to the round that ended the tabulation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationResult {
    Winner {
        option_id: OptionId,
        name: String,
        vote_count: u64,
        total_votes: u64,
        rounds: Vec<RoundRecord>,
    },
    /// Every remaining option ended with the same count, in increasing id order.
    /// A single remaining option is also reported here, as a tie of one.
    Tie {
        tied_options: Vec<TiedOption>,
        total_votes: u64,
        rounds: Vec<RoundRecord>,
    },
}

impl TabulationResult {
    pub fn total_votes(&self) -> u64 {
        match self {
            TabulationResult::Winner { total_votes, .. } => *total_votes,
            TabulationResult::Tie { total_votes, .. } => *total_votes,
        }
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        match self {
            TabulationResult::Winner { rounds, .. } => rounds,
            TabulationResult::Tie { rounds, .. } => rounds,
        }
    }
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationErrors {
    /// The poll has no option to tabulate.
    EmptyPoll,
    /// The same option id was declared twice.
    DuplicateOption(OptionId),
    /// The round loop ran past its bound. This is a bug in the elimination logic.
    NoConvergence { rounds: u32 },
}

impl Error for TabulationErrors {}

impl Display for TabulationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabulationErrors::EmptyPoll => write!(f, "the poll has no option to tabulate"),
            TabulationErrors::DuplicateOption(id) => {
                write!(f, "option id {} is declared more than once", id)
            }
            TabulationErrors::NoConvergence { rounds } => write!(
                f,
                "tabulation did not terminate after {} rounds (internal error)",
                rounds
            ),
        }
    }
}
