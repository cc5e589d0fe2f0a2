mod cli;
mod digest;
mod exclude;
mod report;
mod state_file;
mod store;
mod tree;
mod util;

use anyhow::Context;
use cli::Cli;
use exclude::ExcludeSet;
use std::fmt as stdfmt;
use std::io::{IsTerminal, stderr};
use std::path::PathBuf;
use std::process::ExitCode;
use store::StateStore;
use tracing::{Event, Level, Subscriber, error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tree::{DeltaKind, DirTree, TreeDelta};

const STATE_DIR_NAME: &str = ".rotscan";

struct ScanExitCode;

impl ScanExitCode {
    /// Exit code used for any fatal error (bad root, state I/O, decode failure).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ScanExitCode::any_error()
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let root = cli.path.canonicalize().with_context(|| {
        format!(
            "Unable to resolve root directory {}",
            cli.path.display()
        )
    })?;

    let state_dir = resolve_state_dir(cli.state_dir)?;
    let store = StateStore::new(state_dir);

    let mut dir_tree = DirTree::new(root.clone(), ExcludeSet::new(&cli.excludes));

    // Loading happens before any traversal: a corrupt state file aborts the
    // run rather than being silently replaced by a fresh scan.
    if let Some(state) = store
        .load(&root)
        .with_context(|| format!("Error loading state for {}", root.display()))?
    {
        dir_tree.load_state(state);
    }

    dir_tree
        .scan()
        .with_context(|| format!("Error scanning {}", root.display()))?;

    let deltas = dir_tree.compare();
    report::print_deltas(&deltas);

    let summary = DeltaSummary::of(&deltas);
    info!(
        "Scanned {} files: {} added, {} removed, {} changed, {} unchanged",
        summary.total(),
        summary.added,
        summary.removed,
        summary.changed,
        summary.unchanged
    );

    store
        .save(&root, &dir_tree.into_state())
        .with_context(|| format!("Error saving state for {}", root.display()))?;

    Ok(())
}

/// Resolve the state directory, preferring an explicit flag over the default
/// under the user's home directory. This is the only place ambient
/// environment is consulted; everything below `main` gets the resolved path.
fn resolve_state_dir(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    let home = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .context("Unable to determine home directory; pass --state-dir")?;

    Ok(PathBuf::from(home).join(STATE_DIR_NAME))
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DeltaSummary {
    added: usize,
    removed: usize,
    changed: usize,
    unchanged: usize,
}

impl DeltaSummary {
    fn of(deltas: &[TreeDelta]) -> Self {
        let mut summary = DeltaSummary::default();
        for delta in deltas {
            match delta.kind() {
                DeltaKind::Added => summary.added += 1,
                DeltaKind::Removed => summary.removed += 1,
                DeltaKind::Changed => summary.changed += 1,
                DeltaKind::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }

    fn total(&self) -> usize {
        self.added + self.removed + self.changed + self.unchanged
    }
}

fn init_tracing(verbose: u8, log_level: Option<&str>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    let filter = if let Some(level) = log_level {
        EnvFilter::new(level)
    } else if verbose > 0 {
        EnvFilter::new(match verbose {
            1 => "info",
            _ => "debug",
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_file::TreeEntry;

    fn entry() -> TreeEntry {
        TreeEntry {
            sha256: "abc".to_string(),
            mtime_nanos: 1,
            size: 1,
        }
    }

    #[test]
    fn summary_counts_each_kind() {
        let deltas = vec![
            TreeDelta::Added {
                path: "a".to_string(),
                entry: entry(),
            },
            TreeDelta::Removed {
                path: "b".to_string(),
                old: entry(),
            },
            TreeDelta::Changed {
                path: "c".to_string(),
                old: entry(),
                new: entry(),
            },
            TreeDelta::Unchanged {
                path: "d".to_string(),
            },
            TreeDelta::Unchanged {
                path: "e".to_string(),
            },
        ];

        let summary = DeltaSummary::of(&deltas);

        assert_eq!(
            summary,
            DeltaSummary {
                added: 1,
                removed: 1,
                changed: 1,
                unchanged: 2,
            }
        );
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn explicit_state_dir_wins() {
        let dir = resolve_state_dir(Some(PathBuf::from("/custom/state"))).unwrap();
        assert_eq!(dir, PathBuf::from("/custom/state"));
    }
}
