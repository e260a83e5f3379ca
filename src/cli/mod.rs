//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod check;
mod evict;
mod key;

pub use key::{parse_column_pair, KeyArgs};

#[derive(Parser, Debug)]
#[command(name = "oxrowcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "key", about = "Print the cache key of a lookup tuple")]
    Key(KeyArgs),

    #[command(name = "check-config", about = "Validate a configuration file")]
    CheckConfig(CheckConfigArgs),

    #[command(name = "evict", about = "Delete the cached entry of a tuple from Redis")]
    Evict(EvictArgs),
}

#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    #[arg(help = "Path to the TOML configuration file")]
    pub path: String,
}

#[derive(Parser, Debug)]
pub struct EvictArgs {
    #[arg(short, long, help = "Path to a configuration file with a [redis] section")]
    pub config: String,

    #[command(flatten)]
    pub key: KeyArgs,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::logging::init_logging("warn");

    match &cli.command {
        Commands::Key(args) => key::execute(args),
        Commands::CheckConfig(args) => check::execute(args),
        Commands::Evict(args) => evict::execute(args).await,
    }
}
