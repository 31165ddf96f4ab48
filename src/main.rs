use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use region_tiles::commands;
use region_tiles::config::Config;
use region_tiles::logging;

#[derive(Parser, Debug)]
#[command(name = "region_tiles", version, about = "Inspect and manage incremental map tile caches")]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct CommonOpts {
    /// JSON config file (keys: web-dir, state-dir, threads, worlds, ...)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Web root holding tiles/ (default: web or MAP_WEB_DIR)
    #[arg(long = "web-dir", global = true)]
    web_dir: Option<PathBuf>,
    /// Directory for per-world render state (default: state or MAP_STATE_DIR)
    #[arg(long = "state-dir", global = true)]
    state_dir: Option<PathBuf>,
    /// Number of render worker threads
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Log level (trace|debug|info|warn|error)
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List regions whose files changed since their last render
    Scan {
        #[arg(long)]
        world: String,
        /// Directory containing r.<x>.<z>.mca files (default: the world's
        /// region-dir from the config file)
        #[arg(long = "region-dir")]
        region_dir: Option<PathBuf>,
    },
    /// Show how many regions are tracked for a world
    Status {
        #[arg(long)]
        world: String,
        /// Print every tracked region
        #[arg(long)]
        verbose: bool,
    },
    /// Clear a world's render state so everything re-renders
    Reset {
        #[arg(long)]
        world: String,
    },
    /// Decompress a .gz artifact to stdout
    Cat {
        file: PathBuf,
    },
}

fn load_config(common: &CommonOpts) -> Result<Config> {
    // file < CLI < env
    let mut cfg = match &common.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(v) = &common.web_dir { cfg.web_dir = v.clone(); }
    if let Some(v) = &common.state_dir { cfg.state_dir = v.clone(); }
    if common.threads.is_some() { cfg.threads = common.threads; }
    if common.log_level.is_some() { cfg.log_level = common.log_level.clone(); }
    cfg.apply_env();
    Ok(cfg)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.common)?;
    logging::init(cfg.log_level.as_deref());

    match cli.command {
        Commands::Scan { world, region_dir } => commands::scan::cmd_scan(&cfg, &world, region_dir.as_deref()),
        Commands::Status { world, verbose } => commands::status::cmd_status(&cfg, &world, verbose),
        Commands::Reset { world } => commands::reset::cmd_reset(&cfg, &world),
        Commands::Cat { file } => commands::cat::cmd_cat(&file),
    }
}
