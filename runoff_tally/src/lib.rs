pub mod builder;
mod config;
pub mod manual;

use log::{debug, info, warn};

use std::{
    collections::{BTreeMap, HashSet},
    ops::AddAssign,
};

pub use crate::config::*;

// **** Private structures ****

type RoundId = u32;

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

// The mutable state of an option during a tabulation.
#[derive(Eq, PartialEq, Debug, Clone)]
struct OptionState {
    name: String,
    count: VoteCount,
    eliminated: bool,
}

// Created for each call and dropped with it. The ordering of the map is the
// order in which options are visited for the majority and elimination checks.
type OptionTable = BTreeMap<OptionId, OptionState>;

// What a round decided.
#[derive(Eq, PartialEq, Debug, Clone)]
enum RoundOutcome {
    Winner(OptionId),
    Tie(Vec<OptionId>),
    Eliminate(Vec<OptionId>),
}

/// The count that an option must strictly exceed to win a round.
///
/// Note that this is `floor(total / 2) + 1`, compared with `>`: an option needs one vote
/// more than a textbook majority. With 4 ballots, 3 votes are not enough to win.
/// This is the historical behavior of the polls and it is kept as is.
pub fn majority_threshold(total_votes: u64) -> u64 {
    (total_votes / 2) + 1
}

/// Turns the rank assignments of a voter into a canonical ballot.
///
/// Choices are sorted by increasing rank. Equal ranks keep their submission order.
/// Options that are not part of `known_options` are dropped, and an option ranked
/// several times only keeps its best rank.
pub fn normalize_ballot(raw: &RawBallot, known_options: &HashSet<OptionId>) -> Ballot {
    let mut ranks: Vec<RankAssignment> = raw.ranks.clone();
    // Stable sort: ties between ranks are resolved by input order.
    ranks.sort_by_key(|ra| ra.rank);

    let mut seen: HashSet<OptionId> = HashSet::new();
    let choices: Vec<OptionId> = ranks
        .iter()
        .map(|ra| ra.option)
        .filter(|oid| known_options.contains(oid) && seen.insert(*oid))
        .collect();
    Ballot { choices }
}

/// Runs the instant-runoff tabulation over the ballots of one poll.
///
/// Arguments:
/// * `options` the options of the poll. It must not be empty and ids must be unique.
/// * `ballots` the submitted ballots. Ranks referencing unknown options are ignored and
///   ballots without any valid rank still count in the total number of votes.
///
/// Each round counts every ballot for its most preferred option still running.
/// The tabulation ends with a winner as soon as one option exceeds the
/// [majority threshold](majority_threshold), or with a tie when all the remaining options
/// share the lowest count. Otherwise all the options with the lowest count are eliminated
/// together and a new round starts.
pub fn run_tabulation(
    options: &[PollOption],
    ballots: &[RawBallot],
) -> Result<TabulationResult, TabulationErrors> {
    info!(
        "run_tabulation: Processing {:?} ballots, {:?} options",
        ballots.len(),
        options.len()
    );

    let mut table = build_option_table(options)?;
    for (oid, state) in table.iter() {
        info!("Option: {}: {}", oid, state.name);
    }

    let known_options: HashSet<OptionId> = table.keys().cloned().collect();
    let (checked_ballots, dropped) = normalize_all(ballots, &known_options);
    if dropped > 0 {
        warn!(
            "run_tabulation: dropped {:?} ranks referencing unknown options",
            dropped
        );
    }

    let total_votes = VoteCount(checked_ballots.len() as u64);
    let threshold = VoteCount(majority_threshold(total_votes.0));
    debug!(
        "run_tabulation: total votes: {:?}, threshold: {:?}",
        total_votes, threshold
    );

    // Every round that does not terminate eliminates at least one option, and the
    // last option standing always terminates.
    let max_rounds = table.len() as RoundId;
    let mut rounds: Vec<RoundRecord> = Vec::new();
    for round_id in 1..=max_rounds {
        let record = count_round(&mut table, &checked_ballots, round_id);
        log_round(&record, threshold);
        rounds.push(record);

        match evaluate_round(&table, threshold)? {
            RoundOutcome::Winner(oid) => {
                info!("Round {}: {} wins", round_id, oid);
                return Ok(assemble_winner(&table, oid, total_votes, rounds));
            }
            RoundOutcome::Tie(tied) => {
                info!("Round {}: tie between {:?}", round_id, tied);
                return Ok(assemble_tie(&table, &tied, total_votes, rounds));
            }
            RoundOutcome::Eliminate(eliminated) => {
                debug!(
                    "run_tabulation: round {}: eliminating {:?}",
                    round_id, eliminated
                );
                eliminate(&mut table, &eliminated);
            }
        }
    }
    Err(TabulationErrors::NoConvergence { rounds: max_rounds })
}

fn build_option_table(options: &[PollOption]) -> Result<OptionTable, TabulationErrors> {
    if options.is_empty() {
        return Err(TabulationErrors::EmptyPoll);
    }
    let mut table: OptionTable = BTreeMap::new();
    for opt in options.iter() {
        let state = OptionState {
            name: opt.name.clone(),
            count: VoteCount::EMPTY,
            eliminated: false,
        };
        if table.insert(opt.id, state).is_some() {
            return Err(TabulationErrors::DuplicateOption(opt.id));
        }
    }
    Ok(table)
}

// Returns the canonical ballots and the number of ranks that were dropped
// because they reference an unknown option.
fn normalize_all(
    ballots: &[RawBallot],
    known_options: &HashSet<OptionId>,
) -> (Vec<Ballot>, usize) {
    let mut dropped: usize = 0;
    let mut res: Vec<Ballot> = Vec::with_capacity(ballots.len());
    for raw in ballots.iter() {
        dropped += raw
            .ranks
            .iter()
            .filter(|ra| !known_options.contains(&ra.option))
            .count();
        res.push(normalize_ballot(raw, known_options));
    }
    (res, dropped)
}

// Counts every ballot for its first option still running, and takes the snapshot
// of the round.
fn count_round(table: &mut OptionTable, ballots: &[Ballot], round_id: RoundId) -> RoundRecord {
    for state in table.values_mut() {
        state.count = VoteCount::EMPTY;
    }

    let mut exhausted = VoteCount::EMPTY;
    for ballot in ballots.iter() {
        let first_running = ballot
            .choices
            .iter()
            .find(|oid| matches!(table.get(*oid), Some(state) if !state.eliminated));
        match first_running.and_then(|oid| table.get_mut(oid)) {
            Some(state) => {
                state.count += VoteCount(1);
            }
            None => {
                exhausted += VoteCount(1);
            }
        }
    }
    debug!(
        "count_round: round {}: {:?} exhausted ballots",
        round_id, exhausted
    );

    RoundRecord {
        round: round_id,
        snapshot: table
            .iter()
            .map(|(oid, state)| {
                (
                    *oid,
                    OptionSnapshot {
                        name: state.name.clone(),
                        count: state.count.0,
                        eliminated: state.eliminated,
                    },
                )
            })
            .collect(),
    }
}

fn evaluate_round(
    table: &OptionTable,
    threshold: VoteCount,
) -> Result<RoundOutcome, TabulationErrors> {
    let remaining: Vec<(OptionId, VoteCount)> = table
        .iter()
        .filter(|(_, state)| !state.eliminated)
        .map(|(oid, state)| (*oid, state.count))
        .collect();

    // Strictly above the threshold. Only one option can get there: if the accounting
    // was ever wrong, the lowest id would win.
    if let Some((oid, count)) = remaining.iter().find(|(_, count)| *count > threshold) {
        debug!(
            "evaluate_round: {:?} has count {:?} > {:?}, marking as winner",
            oid, count, threshold
        );
        return Ok(RoundOutcome::Winner(*oid));
    }

    let min_count: VoteCount = match remaining.iter().map(|(_, count)| *count).min() {
        Some(c) => c,
        // All the options are eliminated: the elimination logic is broken.
        None => {
            return Err(TabulationErrors::NoConvergence {
                rounds: table.len() as RoundId,
            })
        }
    };

    let all_smallest: Vec<OptionId> = remaining
        .iter()
        .filter(|(_, count)| *count == min_count)
        .map(|(oid, _)| *oid)
        .collect();
    debug!(
        "evaluate_round: min count {:?}, all_smallest: {:?}",
        min_count, all_smallest
    );

    if all_smallest.len() == remaining.len() {
        Ok(RoundOutcome::Tie(all_smallest))
    } else {
        Ok(RoundOutcome::Eliminate(all_smallest))
    }
}

fn eliminate(table: &mut OptionTable, eliminated: &[OptionId]) {
    for oid in eliminated.iter() {
        if let Some(state) = table.get_mut(oid) {
            state.eliminated = true;
            state.count = VoteCount::EMPTY;
        }
    }
}

fn assemble_winner(
    table: &OptionTable,
    oid: OptionId,
    total_votes: VoteCount,
    rounds: Vec<RoundRecord>,
) -> TabulationResult {
    let (name, count) = table
        .get(&oid)
        .map(|state| (state.name.clone(), state.count))
        .unwrap_or((String::new(), VoteCount::EMPTY));
    TabulationResult::Winner {
        option_id: oid,
        name,
        vote_count: count.0,
        total_votes: total_votes.0,
        rounds,
    }
}

fn assemble_tie(
    table: &OptionTable,
    tied: &[OptionId],
    total_votes: VoteCount,
    rounds: Vec<RoundRecord>,
) -> TabulationResult {
    let tied_options: Vec<TiedOption> = tied
        .iter()
        .filter_map(|oid| {
            table.get(oid).map(|state| TiedOption {
                option_id: *oid,
                name: state.name.clone(),
                vote_count: state.count.0,
            })
        })
        .collect();
    TabulationResult::Tie {
        tied_options,
        total_votes: total_votes.0,
        rounds,
    }
}

fn log_round(record: &RoundRecord, threshold: VoteCount) {
    info!(
        "Round {} (winning threshold: more than {})",
        record.round, threshold.0
    );
    for (oid, snap) in record.snapshot.iter() {
        if snap.eliminated {
            info!("{:>8} {} ({}) -> eliminated", snap.count, snap.name, oid);
        } else {
            info!("{:>8} {} ({})", snap.count, snap.name, oid);
        }
    }
    let counted: VoteCount = record
        .snapshot
        .values()
        .map(|snap| VoteCount(snap.count))
        .sum();
    debug!("log_round: {:?} ballots counted", counted);
}
