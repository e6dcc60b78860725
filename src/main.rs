use std::io;

use blue_backup::cli::Cli;
use blue_backup::clock::SystemClock;
use blue_backup::run::{RunContext, run};
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    let clock = SystemClock;
    let mut out = io::stdout();
    let mut err = io::stderr();
    let mut ctx = RunContext {
        out: &mut out,
        err: &mut err,
        clock: &clock,
    };
    std::process::exit(run(&cli, &mut ctx));
}
