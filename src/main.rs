use std::process::ExitCode;

use clap::Parser;
use cryptovault::application::AppError;
use cryptovault::cli::Cli;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            match err.downcast_ref::<AppError>() {
                Some(app_err) => ExitCode::from(app_err.kind().exit_code()),
                None => ExitCode::FAILURE,
            }
        }
    }
}

/// Logs go to stderr so command output stays clean.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "cryptovault=debug"
    } else {
        "cryptovault=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
