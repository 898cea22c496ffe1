use clap::Parser;
use cli::{AppOptions, Command};
use commands::{info::info, txt::txt};
use human_panic::setup_panic;
use log::{debug, error};
use std::process::ExitCode;

mod cli;
mod commands;

fn main() -> ExitCode {
    setup_panic!();

    // arg parsing
    let args = AppOptions::parse();

    // logger
    simple_logger::init_with_level(args.log_level).unwrap();

    // run
    let result = match args.command {
        Command::Txt(options) => txt(options),
        Command::Info(options) => info(options),
    };
    if let Err(e) = result {
        error!("{e:#}");
        debug!("{e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
