//! Coolify REST API (`/api/v1`).

mod client;
mod error;
mod logs;
pub mod types;

pub use client::{CoolifyClient, normalize_base_url};
pub use error::ApiError;
pub use logs::parse_logs;
pub use types::{
    Application, ApplicationHealth, ApplicationPatch, CreateDockerImageRequest,
    CreateGitHubAppRequest, Created, Deployment, DeploymentDetail, DeploymentStatus,
    DeploymentTrigger, EnvVar, Environment, GitHubApp, NewEnvVar, Project, Server,
};

/// Operations cdp needs from the Coolify control plane.
///
/// Production code uses [`CoolifyClient`]; tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ControlPlane: Send + Sync {
    /// Server version; doubles as a connectivity and token check.
    async fn version(&self) -> Result<String, ApiError>;

    async fn list_servers(&self) -> Result<Vec<Server>, ApiError>;

    // ── Projects ──

    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    async fn get_project(&self, uuid: &str) -> Result<Project, ApiError>;

    async fn create_project(&self, name: &str, description: &str) -> Result<Created, ApiError>;

    async fn delete_project(&self, uuid: &str) -> Result<(), ApiError>;

    /// Fails with status 409 when the name is taken.
    async fn create_environment(&self, project_uuid: &str, name: &str)
    -> Result<Created, ApiError>;

    // ── Applications ──

    async fn list_applications(&self) -> Result<Vec<Application>, ApiError>;

    async fn get_application(&self, uuid: &str) -> Result<Application, ApiError>;

    async fn create_github_app_application(
        &self,
        request: &CreateGitHubAppRequest,
    ) -> Result<Created, ApiError>;

    async fn create_docker_image_application(
        &self,
        request: &CreateDockerImageRequest,
    ) -> Result<Created, ApiError>;

    async fn update_application(&self, uuid: &str, patch: &ApplicationPatch)
    -> Result<(), ApiError>;

    async fn delete_application(&self, uuid: &str) -> Result<(), ApiError>;

    // ── Deployments ──

    /// Queue a deployment. `pr` 0 targets the main environment.
    async fn deploy(
        &self,
        app_uuid: &str,
        force: bool,
        pr: u32,
    ) -> Result<Vec<DeploymentTrigger>, ApiError>;

    /// Deployments of an application, most recent first.
    async fn list_deployments(&self, app_uuid: &str) -> Result<Vec<Deployment>, ApiError>;

    async fn get_deployment(&self, uuid: &str) -> Result<DeploymentDetail, ApiError>;

    // ── Sources and environment variables ──

    async fn list_github_apps(&self) -> Result<Vec<GitHubApp>, ApiError>;

    async fn list_envs(&self, app_uuid: &str) -> Result<Vec<EnvVar>, ApiError>;

    async fn create_env(&self, app_uuid: &str, env: &NewEnvVar) -> Result<Created, ApiError>;

    async fn delete_env(&self, app_uuid: &str, env_uuid: &str) -> Result<(), ApiError>;
}
