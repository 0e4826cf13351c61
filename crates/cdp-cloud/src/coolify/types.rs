use serde::{Deserialize, Deserializer, Serialize};

/// Coolify sends `null` for many unset strings; treat it as empty.
fn nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Server {
    pub uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default)]
    pub environments: Vec<Environment>,
}

impl Project {
    /// Environment by name, ignoring case.
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments
            .iter()
            .find(|env| env.name.eq_ignore_ascii_case(name) && !env.uuid.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Environment {
    #[serde(default, deserialize_with = "nullable")]
    pub uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Application {
    pub uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub fqdn: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub git_repository: String,
    #[serde(default, deserialize_with = "nullable")]
    pub git_branch: String,
    #[serde(default, deserialize_with = "nullable")]
    pub build_pack: String,
    #[serde(default, deserialize_with = "nullable")]
    pub docker_registry_image_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub docker_registry_image_tag: String,
}

impl Application {
    pub fn health(&self) -> ApplicationHealth {
        ApplicationHealth::classify(&self.status)
    }
}

/// Coarse application state used when the deployment record is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationHealth {
    Running,
    /// `exited`, `error` or `failed`.
    Down,
    /// Starting, restarting, degraded or anything unrecognised.
    Unknown,
}

impl ApplicationHealth {
    /// Classify statuses such as `running` or `exited:unhealthy`.
    pub fn classify(status: &str) -> Self {
        let state = status.split(':').next().unwrap_or_default().trim();
        if state.eq_ignore_ascii_case("running") {
            ApplicationHealth::Running
        } else if ["exited", "error", "failed"]
            .iter()
            .any(|s| state.eq_ignore_ascii_case(s))
        {
            ApplicationHealth::Down
        } else {
            ApplicationHealth::Unknown
        }
    }
}

/// One entry of `GET /deployments/applications/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Deployment {
    #[serde(default, deserialize_with = "nullable")]
    pub uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub deployment_uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub commit: String,
    #[serde(default, deserialize_with = "nullable")]
    pub git_commit_sha: String,
    #[serde(default, deserialize_with = "nullable")]
    pub commit_message: String,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: String,
}

impl Deployment {
    /// `deployment_uuid` when present, otherwise `uuid`.
    pub fn canonical_uuid(&self) -> &str {
        if self.deployment_uuid.is_empty() {
            &self.uuid
        } else {
            &self.deployment_uuid
        }
    }

    /// Full commit SHA the deployment built, if known.
    pub fn commit_sha(&self) -> &str {
        if self.git_commit_sha.is_empty() {
            &self.commit
        } else {
            &self.git_commit_sha
        }
    }
}

/// The deployment list comes either bare or wrapped with a count.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DeploymentList {
    Bare(Vec<Deployment>),
    /// `{ "count": n, "deployments": [...] }`
    Paged {
        #[serde(default)]
        deployments: Vec<Deployment>,
    },
}

impl From<DeploymentList> for Vec<Deployment> {
    fn from(list: DeploymentList) -> Self {
        match list {
            DeploymentList::Bare(items) => items,
            DeploymentList::Paged { deployments, .. } => deployments,
        }
    }
}

/// `GET /deployments/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeploymentDetail {
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    /// Opaque JSON string; see [`super::parse_logs`].
    #[serde(default, deserialize_with = "nullable")]
    pub logs: String,
}

/// Classification of a deployment status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStatus {
    /// queued, in_progress, running, or anything unrecognised.
    Pending,
    Finished,
    /// failed, error, cancelled.
    Failed,
}

impl DeploymentStatus {
    pub fn classify(status: &str) -> Self {
        let status = status.trim();
        if status.eq_ignore_ascii_case("finished") {
            DeploymentStatus::Finished
        } else if ["failed", "error", "cancelled", "cancelled-by-user"]
            .iter()
            .any(|s| status.eq_ignore_ascii_case(s))
        {
            DeploymentStatus::Failed
        } else {
            DeploymentStatus::Pending
        }
    }

    pub fn is_terminal(self) -> bool {
        self != DeploymentStatus::Pending
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeployResponse {
    #[serde(default)]
    pub deployments: Vec<DeploymentTrigger>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeploymentTrigger {
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    #[serde(default, deserialize_with = "nullable")]
    pub resource_uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub deployment_uuid: String,
}

/// GitHub App registered as a Coolify source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GitHubApp {
    pub uuid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub organization: String,
    #[serde(default)]
    pub is_system_wide: bool,
}

impl GitHubApp {
    /// The shared public GitHub source rather than a private app.
    pub fn is_public(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        name.contains("public") || name.contains("github.com")
    }

    pub fn display_name(&self) -> String {
        if self.organization.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.organization)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvVar {
    #[serde(default, deserialize_with = "nullable")]
    pub uuid: String,
    pub key: String,
    #[serde(default, deserialize_with = "nullable")]
    pub value: String,
    #[serde(default)]
    pub is_build_time: bool,
    #[serde(default)]
    pub is_preview: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewEnvVar {
    pub key: String,
    pub value: String,
    pub is_build_time: bool,
    pub is_preview: bool,
}

/// `{ "uuid": ... }` returned by create endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Created {
    pub uuid: String,
}

/// `POST /applications/private-github-app`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateGitHubAppRequest {
    pub project_uuid: String,
    pub server_uuid: String,
    pub environment_uuid: String,
    pub github_app_uuid: String,
    /// `owner/name`
    pub git_repository: String,
    pub git_branch: String,
    pub name: String,
    pub build_pack: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domains: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub install_command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub build_command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub start_command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publish_directory: String,
    pub ports_exposes: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub health_check_enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub health_check_path: String,
    pub instant_deploy: bool,
}

/// `POST /applications/dockerimage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateDockerImageRequest {
    pub project_uuid: String,
    pub server_uuid: String,
    pub environment_uuid: String,
    pub name: String,
    pub docker_registry_image_name: String,
    pub docker_registry_image_tag: String,
    pub ports_exposes: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domains: String,
    pub instant_deploy: bool,
}

/// `PATCH /applications/{uuid}`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_registry_image_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit_sha: Option<String>,
}
