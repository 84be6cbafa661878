//! cook CLI — resolve grlx recipes and their dependencies.

use clap::Parser;
use cook::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG overrides -v.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cook::cli::dispatch(&cli.global, cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
