#![forbid(unsafe_code)]

//! qnotify — quota notification CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("qnotify: {e}");
        std::process::exit(1);
    }
}
