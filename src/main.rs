use clap::Parser;
use slopetrader::cli::{run, Cli};
use slopetrader::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
