use clap::Parser;
use log::{debug, warn};

mod args;
mod tally;

fn main() {
    let args = args::Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("args: {:?}", args);

    if let Err(e) = tally::run_poll(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
