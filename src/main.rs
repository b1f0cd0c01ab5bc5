use clap::Parser;
use vrm_rust_workflow::cli::{dispatch, Cli};
use vrm_rust_workflow::error::Outcome;
use vrm_rust_workflow::logger;

#[tokio::main]
async fn main() {
    logger::init();
    log::info!("Logger initialized. Starting vrm_rust_workflow.");

    let cli = Cli::parse();
    let outcome = dispatch(cli).await;

    let exit_code = match outcome {
        Outcome::Ok => 0,
        Outcome::InputError | Outcome::StateError => 1,
        Outcome::Timeout => 2,
        Outcome::Internal => 3,
    };
    std::process::exit(exit_code);
}
