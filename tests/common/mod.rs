use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::path::{Path, PathBuf};

pub fn rotscan_cmd(state_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("rotscan");
    cmd.arg("--state-dir").arg(state_dir);
    cmd
}

// Each integration test file is compiled as its own crate. Some crates only
// use `rotscan_cmd`, so these helpers are intentionally unused there.
#[allow(dead_code)]
pub fn scan(state_dir: &Path, root: &Path) -> std::process::Output {
    rotscan_cmd(state_dir)
        .arg(root)
        .output()
        .expect("failed to run `rotscan`")
}

/// Path of the single state file inside a state directory. Panics unless
/// exactly one exists; tests that need the file name discover it this way
/// rather than duplicating the naming scheme.
#[allow(dead_code)]
pub fn only_state_file(state_dir: &Path) -> PathBuf {
    let mut files: Vec<PathBuf> = std::fs::read_dir(state_dir)
        .expect("state dir should exist")
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1, "expected exactly one state file");
    files.pop().unwrap()
}
