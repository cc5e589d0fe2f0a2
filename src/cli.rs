use clap::Parser;
use std::path::PathBuf;

/// Bitrot scanner: checksums a directory tree and reports files whose
/// content changed since the previous run.
#[derive(Parser, Debug)]
#[command(name = "rotscan", version, about, long_about = None)]
pub struct Cli {
    /// Directory tree to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Increase logging verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "log_level")]
    pub verbose: u8,

    /// Explicit log level (error, warn, info, debug, trace). Takes precedence over RUST_LOG.
    #[arg(long, value_name = "LEVEL", verbatim_doc_comment)]
    pub log_level: Option<String>,

    /// Root-relative path prefix to exclude from the scan (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "PREFIX")]
    pub excludes: Vec<String>,

    /// Directory holding per-root state files (default: $HOME/.rotscan)
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
