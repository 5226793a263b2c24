//! Strata CLI - stacked branches on top of git.

use clap::Parser;
use tracing::Level;

mod commands;
mod output;
mod prompt;

use commands::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        output::error(&format!("failed to set up logging: {e}"));
        std::process::exit(1);
    }
    output::set_quiet(cli.quiet);

    if let Err(e) = commands::run(cli.command) {
        let msg = e.to_string();
        if !msg.is_empty() {
            output::error(&msg);
        }
        std::process::exit(1);
    }
}

/// Install the global subscriber; each `-v` raises the level by one step.
fn init_tracing(verbosity: u8) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
