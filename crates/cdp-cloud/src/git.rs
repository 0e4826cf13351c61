use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cdp_core::config::DEFAULT_BRANCH;
use secrecy::{ExposeSecret, SecretString};

use crate::executor::{AUTH_HEADER, CommandError, CommandExecutor, RealExecutor, args};

/// Commit message used for automatic commits before a push.
pub const AUTO_COMMIT_MESSAGE: &str = "Deploy via cdp";

/// `git` operations on one working directory.
pub struct GitClient<E: CommandExecutor = RealExecutor> {
    executor: E,
    dir: PathBuf,
}

impl GitClient<RealExecutor> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            executor: RealExecutor::default(),
            dir: dir.into(),
        }
    }
}

impl<E: CommandExecutor> GitClient<E> {
    pub fn with_executor(dir: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            executor,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `-C <dir>` followed by `rest`.
    fn git_args(&self, rest: &[&str]) -> Vec<String> {
        let mut out = vec!["-C".to_owned(), self.dir.to_string_lossy().into_owned()];
        out.extend(rest.iter().map(|s| (*s).to_owned()));
        out
    }

    async fn git(&self, rest: &[&str]) -> Result<String, CommandError> {
        self.executor.exec("git", &self.git_args(rest)).await
    }

    pub fn is_repo(&self) -> bool {
        self.dir.join(".git").is_dir()
    }

    pub async fn init(&self) -> Result<(), GitError> {
        self.git(&["init"])
            .await
            .map_err(|e| GitError::Init { source: e })?;
        Ok(())
    }

    /// Point `name` at `url`, adding the remote when it does not exist yet.
    pub async fn set_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.git(&["remote", "get-url", name]).await {
            Ok(current) if current.trim() == url => return Ok(()),
            Ok(_) => {
                self.git(&["remote", "set-url", name, url])
                    .await
                    .map_err(|e| GitError::Remote { source: e })?;
            }
            Err(missing) => {
                tracing::debug!(remote = name, error = %missing, "remote not configured, adding");
                self.git(&["remote", "add", name, url])
                    .await
                    .map_err(|e| GitError::Remote { source: e })?;
            }
        }
        Ok(())
    }

    /// Current branch, or `main` on a repository without commits.
    pub async fn current_branch(&self) -> Result<String, GitError> {
        let out = self
            .git(&["branch", "--show-current"])
            .await
            .map_err(|e| GitError::Branch { source: e })?;
        let branch = out.trim();
        Ok(if branch.is_empty() {
            DEFAULT_BRANCH.to_owned()
        } else {
            branch.to_owned()
        })
    }

    pub async fn has_changes(&self) -> Result<bool, GitError> {
        let out = self
            .git(&["status", "--porcelain"])
            .await
            .map_err(|e| GitError::Status { source: e })?;
        Ok(!out.trim().is_empty())
    }

    /// Stage everything and commit. Returns `false` when the tree was clean.
    pub async fn auto_commit(&self) -> Result<bool, GitError> {
        if !self.has_changes().await? {
            return Ok(false);
        }
        self.git(&["add", "-A"])
            .await
            .map_err(|e| GitError::Commit { source: e })?;
        self.git(&["commit", "-m", AUTO_COMMIT_MESSAGE])
            .await
            .map_err(|e| GitError::Commit { source: e })?;
        Ok(true)
    }

    /// `git push --porcelain -u <remote> <branch>` authenticated with a GitHub
    /// token. Returns `true` when the push moved a remote ref.
    ///
    /// The token travels as an HTTP header for this one invocation and is
    /// never written into the remote URL or `.git/config`.
    pub async fn push(
        &self,
        remote: &str,
        branch: &str,
        token: &SecretString,
    ) -> Result<bool, GitError> {
        let credentials = STANDARD.encode(format!("x-access-token:{}", token.expose_secret()));
        let header = format!("http.extraHeader={AUTH_HEADER} Basic {credentials}");
        let push = self.git_args(&["-c", &header, "push", "--porcelain", "-u", remote, branch]);

        let out = self
            .executor
            .exec("git", &push)
            .await
            .map_err(|e| GitError::Push {
                branch: branch.to_owned(),
                source: e,
            })?;
        Ok(remote_updated(&out))
    }

    /// Short hash of `HEAD`.
    pub async fn head_commit(&self) -> Result<String, GitError> {
        let out = self
            .git(&["rev-parse", "--short", "HEAD"])
            .await
            .map_err(|e| GitError::Status { source: e })?;
        Ok(out.trim().to_owned())
    }

    /// Whether the `git` binary runs at all.
    pub async fn is_available(&self) -> bool {
        self.executor.exec("git", &args(["--version"])).await.is_ok()
    }
}

/// Whether `git push --porcelain` output reports a ref other than
/// `[up to date]` (flag `=`).
///
/// Ref lines are `<flag>\t<from>:<to>\t<summary>`; `To <url>` and `Done`
/// carry no tab.
pub fn remote_updated(porcelain: &str) -> bool {
    porcelain
        .lines()
        .filter(|line| line.contains('\t'))
        .any(|line| !matches!(line.chars().next(), Some('=' | '!')))
}

/// `https://github.com/<owner>/<repo>.git`; `repo` may already carry an owner.
pub fn github_remote_url(owner: &str, repo: &str) -> String {
    format!("https://github.com/{owner}/{}.git", repo_name(repo))
}

/// The bare repository name from `name` or `owner/name`.
pub fn repo_name(repo: &str) -> &str {
    repo.rsplit('/').next().unwrap_or(repo)
}

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("failed to initialize git repository")]
    Init { source: CommandError },

    #[error("failed to configure git remote")]
    Remote { source: CommandError },

    #[error("failed to determine current branch")]
    Branch { source: CommandError },

    #[error("failed to read git status")]
    Status { source: CommandError },

    #[error("failed to commit changes")]
    Commit { source: CommandError },

    #[error("failed to push branch '{branch}'")]
    Push { branch: String, source: CommandError },
}
