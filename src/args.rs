use clap::Parser;

/// This is a ranked-choice poll tabulation program.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the poll: its options and the sources of the votes.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the expected outcome of the poll in JSON format. If provided,
    /// rankzilla will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the outcome of the poll will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) A file with the votes, when no configuration file is used.
    /// Setting this option overrides the vote sources of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default json) The type of the input: json, csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use (the first one by default).
    #[clap(long, value_parser)]
    pub worksheet_name: Option<String>,

    /// Only count the votes that were submitted. By default, every stored vote is counted.
    #[clap(long, takes_value = false)]
    pub only_submitted: bool,

    /// Prints a one-line summary of the outcome, as sent to the participants.
    #[clap(long, takes_value = false)]
    pub summary: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
