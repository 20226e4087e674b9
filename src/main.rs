use clap::Parser;
use stockscope::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
