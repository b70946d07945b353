use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Args, normalize_args};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("demotick=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_from(normalize_args(std::env::args_os()));

    commands::export::run(&args)
}
