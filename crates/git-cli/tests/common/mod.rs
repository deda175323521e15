//! Shared harness for running the compiled `git-height` binary.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use git_hash::ObjectId;
use git_testtools::TestRepo;

/// Captured output from running a command.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run `git-height` in `dir` with the given arguments.
pub fn git_height(dir: &Path, args: &[&str]) -> CommandResult {
    let output = Command::new(env!("CARGO_BIN_EXE_git-height"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run git-height");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

pub fn version_json(version: &str) -> Vec<u8> {
    format!("{{\"version\": \"{version}\"}}\n").into_bytes()
}

/// A repository whose root commit holds `first` and whose next `later`
/// commits hold `current`, with `current` also in the working copy.
pub fn repo_with_history(first: &str, current: &str, later: usize) -> (TestRepo, ObjectId) {
    let mut repo = TestRepo::new();
    let old = version_json(first);
    let new = version_json(current);
    let mut tip = repo.commit_files(&[("version.json", old.as_slice())], &[]);
    for i in 0..later {
        let note = format!("change {i}\n");
        tip = repo.commit_files(
            &[("version.json", new.as_slice()), ("CHANGELOG", note.as_bytes())],
            &[tip],
        );
    }
    repo.set_branch("main", tip);
    repo.write_file("version.json", &new);
    (repo, tip)
}
