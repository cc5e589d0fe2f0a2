use crate::state_file::TreeEntry;
use crate::tree::{DeltaKind, TreeDelta};

/// Print the reconciliation report for the operator.
///
/// One line per Added, Removed or Changed path; Unchanged paths are part of
/// the classification but not part of the report. Changed entries carry
/// detail lines so the operator can judge whether the change was an
/// intentional edit or corruption.
pub fn print_deltas(deltas: &[TreeDelta]) {
    for delta in deltas {
        let code = match delta.kind() {
            DeltaKind::Added => "A",
            DeltaKind::Removed => "R",
            DeltaKind::Changed => "C",
            DeltaKind::Unchanged => continue,
        };

        println!("{:<2} {}", code, delta.path());

        for line in format_detail_lines(delta) {
            println!("{}", line);
        }
    }
}

fn format_detail_lines(delta: &TreeDelta) -> Vec<String> {
    match delta {
        TreeDelta::Added { .. } | TreeDelta::Unchanged { .. } => Vec::new(),
        TreeDelta::Removed { old, .. } => vec![format!(
            "   was: file ({}, sha256: {})",
            format_size(old.size),
            truncate_sha256(&old.sha256)
        )],
        TreeDelta::Changed { old, new, .. } => format_entry_diff(old, new),
    }
}

fn format_entry_diff(old: &TreeEntry, new: &TreeEntry) -> Vec<String> {
    let mut lines = Vec::new();

    if old.size != new.size {
        lines.push(format!(
            "   size: {} -> {}",
            format_size(old.size),
            format_size(new.size)
        ));
    }
    if old.mtime_nanos != new.mtime_nanos {
        lines.push(format!(
            "   mtime: {} -> {}",
            format_mtime(old.mtime_nanos),
            format_mtime(new.mtime_nanos)
        ));
    }
    if old.sha256 != new.sha256 {
        lines.push(format!(
            "   sha256: {} -> {}",
            truncate_sha256(&old.sha256),
            truncate_sha256(&new.sha256)
        ));
    }

    lines
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn format_mtime(nanos: u64) -> String {
    use std::time::{Duration, UNIX_EPOCH};

    let duration = Duration::from_nanos(nanos);
    let system_time = UNIX_EPOCH + duration;

    let datetime: chrono::DateTime<chrono::Local> = system_time.into();
    datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn truncate_sha256(sha256: &str) -> String {
    if sha256.len() > 12 {
        format!("{}...", &sha256[..12])
    } else {
        sha256.to_string()
    }
}
