//! Removing everything a deploy created, remote and local.
//!
//! Every step runs even when an earlier one failed; the report says what
//! happened to each resource.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cdp_cloud::git::repo_name;
use cdp_cloud::{CodeHost, ControlPlane, GitHubError};
use cdp_core::config::PROJECT_CONFIG_FILE;
use cdp_core::{DeployMethod, ProjectConfig};

/// Files and directories `cdp reset` removes from the project directory.
pub const LOCAL_ARTIFACTS: [&str; 3] = [PROJECT_CONFIG_FILE, "README.md", ".git"];

/// Coolify deletes an application's containers in the background, and the
/// project cannot be removed until that finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay before retry `n` is `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deleted,
    /// Nothing to delete.
    Skipped,
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Deleted => f.write_str("deleted"),
            Outcome::Skipped => f.write_str("skipped"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReport {
    pub application: Outcome,
    pub project: Outcome,
    pub repository: Outcome,
}

impl RemoteReport {
    pub fn rows(&self) -> [(&'static str, &Outcome); 3] {
        [
            ("Application", &self.application),
            ("Project", &self.project),
            ("GitHub repository", &self.repository),
        ]
    }

    pub fn has_failures(&self) -> bool {
        self.rows().iter().any(|(_, outcome)| outcome.is_failure())
    }
}

/// Delete the application, then its project, then the GitHub repository.
///
/// `github` is `None` when no GitHub token is configured; the repository is
/// then left alone.
pub async fn delete_remote<C, H>(
    client: &C,
    github: Option<&H>,
    config: &ProjectConfig,
    retry: RetryPolicy,
) -> RemoteReport
where
    C: ControlPlane,
    H: CodeHost,
{
    let application = delete_application(client, &config.app_uuid).await;
    let project = delete_project(client, &config.project_uuid, retry).await;
    let repository = match (&config.method, github) {
        (DeployMethod::Git(git), Some(host)) if !git.github_repo.is_empty() => {
            delete_repository(host, &git.github_repo).await
        }
        _ => Outcome::Skipped,
    };

    RemoteReport {
        application,
        project,
        repository,
    }
}

async fn delete_application<C: ControlPlane>(client: &C, uuid: &str) -> Outcome {
    if uuid.is_empty() {
        return Outcome::Skipped;
    }
    match client.delete_application(uuid).await {
        Ok(()) => Outcome::Deleted,
        Err(e) if e.is_not_found() => {
            tracing::info!(app = uuid, "application already gone");
            Outcome::Deleted
        }
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

async fn delete_project<C: ControlPlane>(client: &C, uuid: &str, retry: RetryPolicy) -> Outcome {
    if uuid.is_empty() {
        return Outcome::Skipped;
    }
    let attempts = retry.attempts.max(1);
    for attempt in 1..=attempts {
        match client.delete_project(uuid).await {
            Ok(()) => return Outcome::Deleted,
            Err(e) if e.is_not_found() => return Outcome::Deleted,
            Err(e) if attempt < attempts => {
                let delay = retry.base_delay * attempt;
                tracing::warn!(project = uuid, attempt, error = %e, ?delay, "project not deletable yet, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Outcome::Failed(e.to_string()),
        }
    }
    Outcome::Failed("retries exhausted".to_owned())
}

async fn delete_repository<H: CodeHost>(host: &H, repo: &str) -> Outcome {
    let owner = match repo.split_once('/') {
        Some((owner, _)) => owner.to_owned(),
        None => match host.user().await {
            Ok(user) => user.login,
            Err(e) => return Outcome::Failed(e.to_string()),
        },
    };
    match host.delete_repo(&owner, repo_name(repo)).await {
        Ok(()) => Outcome::Deleted,
        Err(GitHubError::Status { status: 404, .. }) => Outcome::Deleted,
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

/// Remove [`LOCAL_ARTIFACTS`] from `dir`. Missing entries are skipped.
pub fn delete_local(dir: &Path) -> Vec<(PathBuf, Outcome)> {
    LOCAL_ARTIFACTS
        .iter()
        .map(|name| {
            let path = dir.join(name);
            let outcome = remove_path(&path);
            (path, outcome)
        })
        .collect()
}

fn remove_path(path: &Path) -> Outcome {
    let removed = match std::fs::symlink_metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Outcome::Skipped,
        Err(e) => Err(e),
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
    };
    match removed {
        Ok(()) => Outcome::Deleted,
        Err(e) => Outcome::Failed(e.to_string()),
    }
}
