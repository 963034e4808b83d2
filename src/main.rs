use clap::Parser as _;
use subpull::cli::Args;
use subpull::error::exit_code_of;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // JSON mode keeps stdout machine readable, so only errors are logged
    let log_level = if args.json {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match subpull::run(args).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(exit_code_of(&err));
        }
    }
}
