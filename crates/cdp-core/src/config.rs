use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::framework::FrameworkInfo;

/// File name of the per-project configuration.
pub const PROJECT_CONFIG_FILE: &str = "cdp.json";

pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_PLATFORM: &str = "linux/amd64";
pub const DEFAULT_BRANCH: &str = "main";

/// The single environment every application is deployed into.
/// Pull-request number 0 targets it.
pub const PRODUCTION_ENVIRONMENT: &str = "production";
pub const PREVIEW_ENVIRONMENT: &str = "preview";

/// cdp.json configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(flatten)]
    pub method: DeployMethod,
    /// Coolify project (empty until created)
    #[serde(default)]
    pub project_uuid: String,
    #[serde(default)]
    pub server_uuid: String,
    #[serde(default)]
    pub environment_uuid: String,
    /// Coolify application; never re-created once set
    #[serde(default)]
    pub app_uuid: String,
    #[serde(default)]
    pub framework: String,
    /// nixpacks, static or dockerfile
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub build_pack: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub install_command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub build_command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publish_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub port: String,
    /// Docker build platform, e.g. linux/amd64
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    /// Custom domain; empty lets Coolify generate one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,

    // ── Legacy dual-environment schema (read only) ──
    #[serde(default, skip_serializing)]
    app_uuids: HashMap<String, String>,
    #[serde(default, skip_serializing)]
    preview_env_uuid: String,
    #[serde(default, skip_serializing)]
    prod_env_uuid: String,
}

/// How code reaches the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "deploy_method", rename_all = "lowercase")]
pub enum DeployMethod {
    /// Push to GitHub; Coolify builds from the repository.
    Git(GitDeployConfig),
    /// Build locally, push the image to a registry.
    Docker(DockerDeployConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitDeployConfig {
    /// Repository name, optionally `owner/name`
    #[serde(default)]
    pub github_repo: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub github_private: bool,
    /// Coolify GitHub App used as the git source
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub github_app_uuid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerDeployConfig {
    /// Full image name without tag, e.g. `ghcr.io/me/app`
    #[serde(default)]
    pub docker_image: String,
}

/// Deploy method without its payload, for selection and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployMethodKind {
    Git,
    Docker,
}

impl DeployMethod {
    pub fn kind(&self) -> DeployMethodKind {
        match self {
            DeployMethod::Git(_) => DeployMethodKind::Git,
            DeployMethod::Docker(_) => DeployMethodKind::Docker,
        }
    }
}

impl DeployMethodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeployMethodKind::Git => "git",
            DeployMethodKind::Docker => "docker",
        }
    }
}

impl fmt::Display for DeployMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployMethodKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(DeployMethodKind::Git),
            "docker" => Ok(DeployMethodKind::Docker),
            other => Err(crate::Error::UnknownDeployMethod(other.to_owned())),
        }
    }
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>, method: DeployMethod) -> Self {
        Self {
            name: name.into(),
            method,
            project_uuid: String::new(),
            server_uuid: String::new(),
            environment_uuid: String::new(),
            app_uuid: String::new(),
            framework: String::new(),
            build_pack: String::new(),
            install_command: String::new(),
            build_command: String::new(),
            start_command: String::new(),
            publish_dir: String::new(),
            port: String::new(),
            platform: String::new(),
            branch: String::new(),
            domain: String::new(),
            app_uuids: HashMap::new(),
            preview_env_uuid: String::new(),
            prod_env_uuid: String::new(),
        }
    }

    /// Copy detected framework settings into the config.
    pub fn with_framework(mut self, framework: &FrameworkInfo) -> Self {
        self.framework = framework.name.clone();
        self.build_pack = framework.build_pack.clone();
        self.install_command = framework.install_command.clone();
        self.build_command = framework.build_command.clone();
        self.start_command = framework.start_command.clone();
        self.publish_dir = framework.publish_directory.clone();
        if self.port.is_empty() {
            self.port = framework.port.clone();
        }
        self
    }

    /// Framework settings as stored in the config.
    pub fn framework_info(&self) -> FrameworkInfo {
        FrameworkInfo {
            name: self.framework.clone(),
            build_pack: self.build_pack.clone(),
            install_command: self.install_command.clone(),
            build_command: self.build_command.clone(),
            start_command: self.start_command.clone(),
            publish_directory: self.publish_dir.clone(),
            port: self.effective_port().to_owned(),
        }
    }

    pub fn effective_port(&self) -> &str {
        if self.port.is_empty() {
            DEFAULT_PORT
        } else {
            &self.port
        }
    }

    pub fn effective_platform(&self) -> &str {
        if self.platform.is_empty() {
            DEFAULT_PLATFORM
        } else {
            &self.platform
        }
    }

    pub fn has_application(&self) -> bool {
        !self.app_uuid.is_empty()
    }

    /// Fold the legacy preview/production maps into the single-application
    /// schema. Production wins over preview. Returns `true` when anything
    /// changed and the file should be rewritten.
    pub fn migrate_legacy(&mut self) -> bool {
        let had_legacy = !self.app_uuids.is_empty()
            || !self.preview_env_uuid.is_empty()
            || !self.prod_env_uuid.is_empty();
        if !had_legacy {
            return false;
        }

        if self.app_uuid.is_empty() {
            let legacy_app = self
                .app_uuids
                .get(PRODUCTION_ENVIRONMENT)
                .or_else(|| self.app_uuids.get(PREVIEW_ENVIRONMENT))
                .filter(|uuid| !uuid.is_empty());
            if let Some(uuid) = legacy_app {
                self.app_uuid = uuid.clone();
            }
        }

        if self.environment_uuid.is_empty() {
            if !self.prod_env_uuid.is_empty() {
                self.environment_uuid = self.prod_env_uuid.clone();
            } else if !self.preview_env_uuid.is_empty() {
                self.environment_uuid = self.preview_env_uuid.clone();
            }
        }

        self.app_uuids.clear();
        self.preview_env_uuid.clear();
        self.prod_env_uuid.clear();
        true
    }
}

/// Persistence capability for the project configuration.
///
/// The resolver and dispatcher call [`ConfigStore::save`] after every
/// remote resource they create.
pub trait ConfigStore: Send + Sync {
    fn save(&self, config: &ProjectConfig) -> crate::Result<()>;
}

/// `cdp.json` in a project directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PROJECT_CONFIG_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load `cdp.json`, or `None` when the project has not been set up.
    ///
    /// Legacy files are migrated and written back once.
    pub fn load(&self) -> crate::Result<Option<ProjectConfig>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::ConfigLoad {
            path: path.clone(),
            source: e,
        })?;
        let mut config: ProjectConfig =
            serde_json::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: path.clone(),
                source: e,
            })?;

        if config.migrate_legacy() {
            tracing::info!(path = %path.display(), "migrated legacy project config");
            self.save(&config)?;
        }

        Ok(Some(config))
    }

    pub fn delete(&self) -> crate::Result<()> {
        let path = self.path();
        std::fs::remove_file(&path).map_err(|e| crate::Error::ConfigRemove { path, source: e })
    }
}

impl ConfigStore for ProjectStore {
    fn save(&self, config: &ProjectConfig) -> crate::Result<()> {
        let path = self.path();
        let data =
            serde_json::to_vec_pretty(config).map_err(|e| crate::Error::ConfigSerialize {
                path: path.clone(),
                source: e,
            })?;
        crate::fs::write_atomic(&path, &data, None)
    }
}
