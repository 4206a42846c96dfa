//! cmake-kits CLI - discover toolchains and run CMake with them

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use cmake_kits::{GlobalContext, KitError};
use miette::Diagnostic;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        if let Some(help) = e.downcast_ref::<KitError>().and_then(|k| k.help()) {
            eprintln!("help: {}", help);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("cmake_kits=debug")
    } else {
        EnvFilter::new("cmake_kits=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let ctx = match cli.config_dir {
        Some(dir) => GlobalContext::with_config_dir(dir),
        None => GlobalContext::new(),
    };

    // Execute command
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(&ctx, args),
        Commands::List(args) => commands::list::execute(&ctx, args),
        Commands::Env(args) => commands::env::execute(&ctx, args),
        Commands::Configure(args) => commands::configure::execute(&ctx, args),
        Commands::Build(args) => commands::build::execute(&ctx, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
