use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use git_height::{ResolverOptions, TreeMemo, DEFAULT_VERSION_FILE};
use git_odb::OdbOptions;
use git_pack::CacheKind;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheArg {
    /// Keep decoded pack objects in memory
    Memory,
    /// Spill decoded pack objects to --cache-dir
    Disk,
}

#[derive(Debug, Parser)]
#[command(
    name = "git-height",
    about = "Print a version computed from version.json and the commit height",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Run as if started in <path>
    #[arg(short = 'C', value_name = "path")]
    pub change_dir: Option<PathBuf>,

    /// Tracked version file, relative to the work tree root
    #[arg(long, value_name = "path", default_value = DEFAULT_VERSION_FILE)]
    pub version_file: PathBuf,

    /// Where decoded pack objects are cached
    #[arg(long, value_enum, default_value_t = CacheArg::Memory)]
    pub cache: CacheArg,

    /// Directory for --cache disk
    #[arg(long, value_name = "dir", required_if_eq("cache", "disk"))]
    pub cache_dir: Option<PathBuf>,

    /// Most objects kept by --cache memory (unbounded by default)
    #[arg(long, value_name = "n")]
    pub cache_capacity: Option<NonZeroUsize>,

    /// Re-read every tree instead of skipping ones already proven unchanged
    #[arg(long)]
    pub no_tree_memo: bool,

    /// Print only the height
    #[arg(long)]
    pub height_only: bool,

    /// More logging on stderr (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// No logging at all
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::OFF;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn odb_options(&self) -> OdbOptions {
        let cache = match (self.cache, &self.cache_dir) {
            (CacheArg::Disk, Some(dir)) => CacheKind::Disk { dir: dir.clone() },
            _ => CacheKind::Memory {
                capacity: self.cache_capacity,
            },
        };
        OdbOptions { cache }
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            version_file: self.version_file.clone(),
            tree_memo: if self.no_tree_memo {
                TreeMemo::Disabled
            } else {
                TreeMemo::Enabled
            },
            cancel: None,
        }
    }
}
