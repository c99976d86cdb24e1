pub use crate::config::*;

/// A builder for adding ballots.
///
/// This is the simplest way to feed the engine when ballots arrive one at a time.
///
/// ```
/// use runoff_tally::builder::Builder;
/// use runoff_tally::{OptionId, PollOption, TabulationResult};
/// # use runoff_tally::TabulationErrors;
///
/// let mut builder = Builder::new()
///     .options(&[PollOption::new(1, "Pizza"), PollOption::new(2, "Tacos")])?;
///
/// builder.add_ballot_simple(&[OptionId(1), OptionId(2)]);
/// builder.add_ranking(&[(OptionId(2), 1), (OptionId(1), 2)]);
///
/// let result = builder.tabulate()?;
/// assert_eq!(result.total_votes(), 2);
/// assert!(matches!(result, TabulationResult::Tie { .. }));
/// # Ok::<(), TabulationErrors>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _options: Vec<PollOption>,
    pub(crate) _ballots: Vec<RawBallot>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _options: Vec::new(),
            _ballots: Vec::new(),
        }
    }

    /// Sets the options of the poll. Previously added ballots are kept.
    pub fn options(self, opts: &[PollOption]) -> Result<Builder, TabulationErrors> {
        let mut sorted: Vec<OptionId> = opts.iter().map(|o| o.id).collect();
        sorted.sort();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(TabulationErrors::DuplicateOption(w[0]));
        }
        Ok(Builder {
            _options: opts.to_vec(),
            _ballots: self._ballots,
        })
    }

    /// Adds a ballot whose choices are already in order of preference.
    pub fn add_ballot_simple(&mut self, choices: &[OptionId]) {
        self.add_raw_ballot(RawBallot::from_ordered(choices));
    }

    /// Adds a ballot as a list of (option, rank) pairs.
    ///
    /// Ranks may have gaps and do not need to start at 1.
    pub fn add_ranking(&mut self, ranks: &[(OptionId, i64)]) {
        self.add_raw_ballot(RawBallot {
            ranks: ranks
                .iter()
                .map(|(option, rank)| RankAssignment {
                    option: *option,
                    rank: *rank,
                })
                .collect(),
        });
    }

    /// Adds a ballot as submitted. Nothing is checked here: unknown options and
    /// repeated options are dealt with when tabulating.
    pub fn add_raw_ballot(&mut self, ballot: RawBallot) {
        self._ballots.push(ballot);
    }

    pub fn num_ballots(&self) -> usize {
        self._ballots.len()
    }

    pub fn tabulate(&self) -> Result<TabulationResult, TabulationErrors> {
        crate::run_tabulation(&self._options, &self._ballots)
    }
}
