mod deploy;
mod env;
mod health;
mod link;
mod login;
mod logs;
mod ls;
mod reset;
mod rollback;

use std::path::PathBuf;

use anyhow::Context;
use cdp_cloud::{CoolifyClient, GitHubClient};
use cdp_core::{GlobalConfig, ProjectConfig, ProjectStore};
use secrecy::{ExposeSecret, SecretString};

pub use deploy::deploy;
pub use env::{env_add, env_ls, env_pull, env_push, env_rm};
pub use health::health;
pub use link::link;
pub use login::{login, logout};
pub use logs::logs;
pub use ls::ls;
pub use reset::reset;
pub use rollback::rollback;

/// Global config of a logged-in user.
pub(crate) fn load_global() -> anyhow::Result<GlobalConfig> {
    let global = GlobalConfig::load()?;
    if !global.is_logged_in() {
        anyhow::bail!("not logged in; run `cdp login` first");
    }
    Ok(global)
}

pub(crate) fn coolify_client(global: &GlobalConfig) -> anyhow::Result<CoolifyClient> {
    let Some(token) = &global.coolify_token else {
        anyhow::bail!("no Coolify token stored; run `cdp login`");
    };
    Ok(CoolifyClient::new(&global.coolify_url, copy_secret(token))?)
}

/// `None` when no GitHub token is stored.
pub(crate) fn github_client(global: &GlobalConfig) -> anyhow::Result<Option<GitHubClient>> {
    if !global.has_github() {
        return Ok(None);
    }
    match &global.github_token {
        Some(token) => Ok(Some(GitHubClient::new(copy_secret(token))?)),
        None => Ok(None),
    }
}

pub(crate) fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

pub(crate) fn project_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("failed to read the current directory")
}

/// `cdp.json` of the current directory.
pub(crate) fn load_project(store: &ProjectStore) -> anyhow::Result<ProjectConfig> {
    store
        .load()?
        .ok_or_else(|| anyhow::anyhow!("no cdp.json in this directory; run `cdp` to set up"))
}

pub(crate) fn require_app(config: &ProjectConfig) -> anyhow::Result<&str> {
    if !config.has_application() {
        anyhow::bail!("{} has not been deployed yet; run `cdp deploy`", config.name);
    }
    Ok(&config.app_uuid)
}
