use clap::Parser;
use equiscore::cli::{Cli, run};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> std::process::ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
