//! Thin wrappers around the `git` binary.

use crate::error::{ForgeError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

fn git_bin() -> Result<PathBuf> {
    which::which("git").map_err(|_| ForgeError::GitNotInstalled)
}

pub fn git_available() -> bool {
    git_bin().is_ok()
}

/// Run `git <args>` in `cwd` and return trimmed stdout.
pub fn run_git<S: AsRef<str>>(args: &[S], cwd: &Path) -> Result<String> {
    let bin = git_bin()?;
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    tracing::debug!(cwd = %cwd.display(), "git {}", args.join(" "));

    let output = Command::new(bin)
        .args(&args)
        .current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stderr = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        return Err(ForgeError::GitFailed {
            command: args.join(" "),
            stderr,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `git clone --depth=1 [--branch <branch>] <url> <dest>`.
pub fn clone_shallow(url: &str, branch: Option<&str>, dest: &Path) -> Result<()> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let dest_str = dest.to_string_lossy();
    let mut args: Vec<&str> = vec!["clone", "--depth=1"];
    if let Some(b) = branch.filter(|b| !b.is_empty()) {
        args.extend(["--branch", b]);
    }
    args.extend([url, &*dest_str]);
    run_git(&args, parent)?;
    Ok(())
}

/// `git status --porcelain` output; empty means clean.
pub fn status_porcelain(repo: &Path) -> Result<String> {
    run_git(&["status", "--porcelain"], repo)
}

pub fn is_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

const FALLBACK_NAME: &str = "Nebula Forge";
const FALLBACK_EMAIL: &str = "forge@localhost";

fn config_value(repo: &Path, key: &str) -> Option<String> {
    run_git(&["config", key], repo).ok().filter(|v| !v.is_empty())
}

/// Stage everything and commit. Returns false when there was nothing to
/// commit. A repo without a configured identity commits as Nebula Forge.
pub fn commit_all(repo: &Path, message: &str) -> Result<bool> {
    run_git(&["add", "."], repo)?;
    if status_porcelain(repo)?.is_empty() {
        return Ok(false);
    }
    let mut args: Vec<String> = Vec::new();
    if config_value(repo, "user.name").is_none() {
        args.extend(["-c".to_string(), format!("user.name={FALLBACK_NAME}")]);
    }
    if config_value(repo, "user.email").is_none() {
        args.extend(["-c".to_string(), format!("user.email={FALLBACK_EMAIL}")]);
    }
    args.extend(["commit", "-q", "-m", message].map(str::to_string));
    run_git(&args, repo)?;
    Ok(true)
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clone_and_status() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), &[("skills/a/SKILL.md", "---\nname: a\n---\n")]);
        let dest = tmp.path().join("work/clone");
        clone_shallow(remote.to_str().unwrap(), Some("main"), &dest).unwrap();

        assert!(is_repo(&dest));
        assert!(dest.join("skills/a/SKILL.md").is_file());
        assert_eq!(status_porcelain(&dest).unwrap(), "");

        std::fs::write(dest.join("new.txt"), "x").unwrap();
        assert!(status_porcelain(&dest).unwrap().contains("new.txt"));

        assert!(commit_all(&dest, "add new.txt").unwrap());
        assert!(!commit_all(&dest, "nothing").unwrap());
        assert_eq!(run_git(&["log", "-1", "--format=%s"], &dest).unwrap(), "add new.txt");
    }

    #[test]
    fn failure_carries_stderr() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let err = run_git(&["log"], tmp.path()).unwrap_err();
        match err {
            ForgeError::GitFailed { command, stderr } => {
                assert_eq!(command, "log");
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
