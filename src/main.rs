use std::process::ExitCode;

use clap::Parser;
use emission_disparity::cli::{self, Cli};

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("{}", cli::failure_message(&err));
            ExitCode::FAILURE
        }
    }
}
