//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// cmake-kits - discover C/C++ toolchains and run CMake with them
#[derive(Parser)]
#[command(name = "cmake-kits")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the kit catalog and config.toml
    #[arg(long, global = true, env = "CMAKE_KITS_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the host for kits and rewrite the catalog
    Scan(ScanArgs),

    /// List catalogued kits
    List(ListArgs),

    /// Print the environment a kit runs CMake with
    Env(EnvArgs),

    /// Configure a CMake project with a kit
    Configure(ConfigureArgs),

    /// Build a configured CMake project with a kit
    Build(BuildArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Print the catalog as JSON after scanning
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print full records as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Kit name, as shown by `list`
    pub kit: String,

    /// Print only variables the kit adds or changes
    #[arg(long)]
    pub changed: bool,
}

#[derive(Args)]
pub struct ConfigureArgs {
    /// Kit name, as shown by `list`
    pub kit: String,

    /// Source directory
    #[arg(short = 'S', long = "source", default_value = ".")]
    pub source: PathBuf,

    /// Build directory
    #[arg(short = 'B', long = "build")]
    pub build: PathBuf,

    /// Cache setting, NAME[:TYPE]=VALUE (repeatable)
    #[arg(short = 'D', value_name = "NAME[:TYPE]=VALUE")]
    pub define: Vec<String>,

    /// Let CMake warn about unused -D settings
    #[arg(long)]
    pub warn_unused_cli: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Kit name, as shown by `list`
    pub kit: String,

    /// Build directory
    #[arg(short = 'B', long = "build")]
    pub build: PathBuf,

    /// Targets to build (repeatable)
    #[arg(long)]
    pub target: Vec<String>,

    /// Configuration for multi-config generators
    #[arg(long)]
    pub config: Option<String>,

    /// Clean before building
    #[arg(long)]
    pub clean_first: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
