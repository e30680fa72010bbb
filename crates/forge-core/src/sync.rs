//! Forge Sync: share the global skill library through a git repository.
//!
//! The remote is cloned into `~/.nebula-forge/sync-registry`. Skills live at
//! `skills/<name>/SKILL.md` inside it.

use crate::error::{ForgeError, Result};
use crate::vault::{list_subdirs, now_iso, Vault};
use crate::{git, io, paths};
use serde::Serialize;
use std::path::{Path, PathBuf};

const REMOTE_SKILLS_DIR: &str = "skills";

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub configured: bool,
    pub repo_url: String,
    pub branch: String,
    pub auto: bool,
    pub connected: bool,
    pub local_skills: usize,
    pub remote_skills: usize,
    pub last_pull: String,
    pub last_push: String,
    pub message: String,
}

pub struct ForgeSync<'a> {
    vault: &'a mut Vault,
    repo_dir: PathBuf,
}

impl<'a> ForgeSync<'a> {
    pub fn new(vault: &'a mut Vault) -> Self {
        let repo_dir = paths::sync_registry_dir(vault.home());
        Self { vault, repo_dir }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn remote_skills_root(&self) -> PathBuf {
        self.repo_dir.join(REMOTE_SKILLS_DIR)
    }

    pub fn status(&self) -> Result<SyncStatus> {
        let cfg = self.vault.config();
        let repo_url = cfg.sync_repo_url.clone().unwrap_or_default();
        let connected = git::is_repo(&self.repo_dir);
        let remote_skills = if connected {
            list_subdirs(&self.remote_skills_root())?.len()
        } else {
            0
        };
        Ok(SyncStatus {
            configured: !repo_url.is_empty(),
            message: if repo_url.is_empty() { "not configured" } else { "ready" }.to_string(),
            repo_url,
            branch: cfg.sync_branch.clone(),
            auto: cfg.sync_auto,
            connected,
            local_skills: self.vault.list_global_skills()?.len(),
            remote_skills,
            last_pull: cfg.sync_last_pull.clone().unwrap_or_else(|| "never".to_string()),
            last_push: cfg.sync_last_push.clone().unwrap_or_else(|| "never".to_string()),
        })
    }

    /// Store the remote. A blank branch means `main`.
    pub fn configure(&mut self, repo_url: &str, branch: &str, auto: bool) -> Result<()> {
        let repo = repo_url.trim();
        if repo.is_empty() {
            return Err(ForgeError::MissingRepoUrl);
        }
        let branch = match branch.trim() {
            "" => "main",
            b => b,
        };
        let cfg = self.vault.config_mut();
        cfg.sync_repo_url = Some(repo.to_string());
        cfg.sync_branch = branch.to_string();
        cfg.sync_auto = auto;
        self.vault.save()
    }

    fn remote(&self) -> Result<(String, String)> {
        let cfg = self.vault.config();
        let url = cfg
            .sync_repo_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ForgeError::SyncNotConfigured)?;
        let branch = match cfg.sync_branch.trim() {
            "" => "main",
            b => b,
        };
        Ok((url.to_string(), branch.to_string()))
    }

    fn ensure_repo(&self, url: &str, branch: &str) -> Result<()> {
        self.vault.ensure_dirs()?;
        if !self.repo_dir.exists() {
            tracing::info!(url, branch, "cloning sync registry");
            return git::clone_shallow(url, Some(branch), &self.repo_dir);
        }
        if !git::is_repo(&self.repo_dir) {
            return Err(ForgeError::NotAGitRepo(self.repo_dir.display().to_string()));
        }
        Ok(())
    }

    /// Update the registry clone and copy every remote skill into the global
    /// skills dir. Returns the number of skills applied.
    pub fn pull(&mut self) -> Result<usize> {
        let (url, branch) = self.remote()?;
        self.ensure_repo(&url, &branch)?;
        git::run_git(&["fetch", "origin", branch.as_str()], &self.repo_dir)?;
        git::run_git(&["checkout", branch.as_str()], &self.repo_dir)?;
        git::run_git(&["pull", "--no-rebase", "origin", branch.as_str()], &self.repo_dir)?;

        let skills_dir = self.vault.skills_dir();
        let mut copied = 0;
        for src in list_subdirs(&self.remote_skills_root())? {
            let src_file = paths::skill_file(&src);
            if !src_file.is_file() {
                continue;
            }
            let Some(name) = src.file_name() else { continue };
            io::copy_file(&src_file, &paths::skill_file(&skills_dir.join(name)))?;
            copied += 1;
        }

        self.vault.config_mut().sync_last_pull = Some(now_iso());
        self.vault.save()?;
        tracing::info!(copied, "sync pull complete");
        Ok(copied)
    }

    /// Copy every local skill into the registry clone, commit and push.
    /// Returns the number of skills exported.
    pub fn push(&mut self) -> Result<usize> {
        let (url, branch) = self.remote()?;
        self.ensure_repo(&url, &branch)?;

        let dst_root = self.remote_skills_root();
        io::ensure_dir(&dst_root)?;
        let mut exported = 0;
        for src in self.vault.list_global_skills()? {
            let src_file = paths::skill_file(&src);
            if !src_file.is_file() {
                continue;
            }
            let Some(name) = src.file_name() else { continue };
            io::copy_file(&src_file, &paths::skill_file(&dst_root.join(name)))?;
            exported += 1;
        }

        let message = format!("sync(skills): export {exported} local skill(s)");
        if !git::commit_all(&self.repo_dir, &message)? {
            tracing::debug!("sync push: nothing new to commit");
        }
        git::run_git(&["push", "origin", branch.as_str()], &self.repo_dir)?;

        self.vault.config_mut().sync_last_push = Some(now_iso());
        self.vault.save()?;
        tracing::info!(exported, "sync push complete");
        Ok(exported)
    }
}
