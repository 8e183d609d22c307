use clap::Parser;
use filesort::cli::{Cli, run};
use filesort::output::OutputFormatter;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}
