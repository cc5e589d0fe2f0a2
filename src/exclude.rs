//! Path-prefix exclusions for tree scanning.
//!
//! Exclusions are root-relative path prefixes. A path is excluded if it
//! equals an excluded prefix or is nested anywhere under one; excluded
//! directories are pruned without being descended into.

#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    prefixes: Vec<String>,
}

impl ExcludeSet {
    /// Build a set from raw prefixes as given on the command line.
    ///
    /// Prefixes are normalized to the same shape as tree state keys:
    /// `/`-separated, no leading `./` or `/`, no trailing `/`. Empty
    /// prefixes (which would exclude the whole root) are dropped.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .filter_map(|p| {
                let p = normalize(p.as_ref());
                if p.is_empty() { None } else { Some(p) }
            })
            .collect();
        ExcludeSet { prefixes }
    }

    /// True if `rel_path` (a normalized root-relative path) is excluded.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            rel_path == prefix
                || (rel_path.len() > prefix.len()
                    && rel_path.starts_with(prefix.as_str())
                    && rel_path.as_bytes()[prefix.len()] == b'/')
        })
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

fn normalize(prefix: &str) -> String {
    let mut p = prefix.trim();
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest;
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest;
        } else {
            break;
        }
    }
    p.trim_end_matches('/').to_string()
}
