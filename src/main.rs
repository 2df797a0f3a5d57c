use std::process::ExitCode;

use clap::Parser;

use photobooth::cli::{self, CliArgs};
use photobooth::logger;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    logger::init();
    logger::set_echo(args.verbose);
    cli::run(args)
}
