use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

const CONFIG_DIR: &str = ".config/cdp";
const CONFIG_FILE: &str = "config.json";

/// Credentials and defaults stored per user in `~/.config/cdp/config.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub coolify_url: String,
    #[serde(default, serialize_with = "expose_optional")]
    pub coolify_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_server: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "expose_optional"
    )]
    pub github_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_registry: Option<DockerRegistry>,
}

/// Docker registry credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct DockerRegistry {
    pub url: String,
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

impl GlobalConfig {
    /// `~/.config/cdp/config.json`
    pub fn default_path() -> crate::Result<PathBuf> {
        let dirs = directories::BaseDirs::new().ok_or(crate::Error::NoHomeDir)?;
        Ok(dirs.home_dir().join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location; missing file yields an empty config.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ConfigLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Written with mode 0600; the file holds tokens.
    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        let data = serde_json::to_vec_pretty(self).map_err(|e| crate::Error::ConfigSerialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        crate::fs::write_atomic(path, &data, Some(0o600))
    }

    pub fn clear() -> crate::Result<()> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(());
        }
        std::fs::remove_file(&path).map_err(|e| crate::Error::ConfigRemove { path, source: e })
    }

    /// URL and token are both present.
    pub fn is_logged_in(&self) -> bool {
        !self.coolify_url.trim().is_empty()
            && self
                .coolify_token
                .as_ref()
                .is_some_and(|t| !t.expose_secret().is_empty())
    }

    pub fn has_github(&self) -> bool {
        self.github_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn expose_optional<S: Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_str(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}
