use std::time::Duration;

use reqwest::{Client, Method, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::ControlPlane;
use super::error::ApiError;
use super::types::{
    Application, ApplicationPatch, CreateDockerImageRequest, CreateGitHubAppRequest, Created,
    DeployResponse, Deployment, DeploymentDetail, DeploymentList, DeploymentTrigger, EnvVar,
    GitHubApp, NewEnvVar, Project, Server,
};

const API_PREFIX: &str = "/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Response bodies are truncated to this many bytes in debug logs.
const LOG_BODY_LIMIT: usize = 500;

/// Trim trailing slashes and make sure the URL ends in `/api/v1`.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with(API_PREFIX) {
        trimmed.to_owned()
    } else {
        format!("{trimmed}{API_PREFIX}")
    }
}

/// HTTP client for the Coolify API.
pub struct CoolifyClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl CoolifyClient {
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Client { source: e })?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and return the raw body of a 2xx response.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%method, %url, "coolify request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(self.token.expose_secret())
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |e| ApiError::Transport {
            path: path.to_owned(),
            source: e,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        tracing::debug!(
            status = status.as_u16(),
            body = truncate(&text, LOG_BODY_LIMIT),
            "coolify response"
        );

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_owned(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send::<()>(Method::GET, path, None).await?;
        decode(path, &text)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let text = self.send(Method::POST, path, Some(body)).await?;
        decode(path, &text)
    }

    async fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.send(Method::PATCH, path, Some(body)).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(path: &str, text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode {
        path: path.to_owned(),
        source: e,
    })
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl ControlPlane for CoolifyClient {
    async fn version(&self) -> Result<String, ApiError> {
        // Plain text, sometimes JSON-quoted.
        let text = self.send::<()>(Method::GET, "/version", None).await?;
        Ok(text.trim().trim_matches('"').to_owned())
    }

    async fn list_servers(&self) -> Result<Vec<Server>, ApiError> {
        self.get("/servers").await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("/projects").await
    }

    async fn get_project(&self, uuid: &str) -> Result<Project, ApiError> {
        self.get(&format!("/projects/{uuid}")).await
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Created, ApiError> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
            description: &'a str,
        }
        let created: Created = self.post("/projects", &Body { name, description }).await?;
        tracing::info!(uuid = %created.uuid, name, "created project");
        Ok(created)
    }

    async fn delete_project(&self, uuid: &str) -> Result<(), ApiError> {
        self.delete(&format!("/projects/{uuid}")).await
    }

    async fn create_environment(
        &self,
        project_uuid: &str,
        name: &str,
    ) -> Result<Created, ApiError> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
        }
        let created: Created = self
            .post(&format!("/projects/{project_uuid}/environments"), &Body { name })
            .await?;
        tracing::info!(uuid = %created.uuid, name, "created environment");
        Ok(created)
    }

    async fn list_applications(&self) -> Result<Vec<Application>, ApiError> {
        self.get("/applications").await
    }

    async fn get_application(&self, uuid: &str) -> Result<Application, ApiError> {
        self.get(&format!("/applications/{uuid}")).await
    }

    async fn create_github_app_application(
        &self,
        request: &CreateGitHubAppRequest,
    ) -> Result<Created, ApiError> {
        let created: Created = self
            .post("/applications/private-github-app", request)
            .await?;
        tracing::info!(uuid = %created.uuid, repo = %request.git_repository, "created application");
        Ok(created)
    }

    async fn create_docker_image_application(
        &self,
        request: &CreateDockerImageRequest,
    ) -> Result<Created, ApiError> {
        let created: Created = self.post("/applications/dockerimage", request).await?;
        tracing::info!(uuid = %created.uuid, image = %request.docker_registry_image_name, "created application");
        Ok(created)
    }

    async fn update_application(
        &self,
        uuid: &str,
        patch: &ApplicationPatch,
    ) -> Result<(), ApiError> {
        self.patch(&format!("/applications/{uuid}"), patch).await
    }

    async fn delete_application(&self, uuid: &str) -> Result<(), ApiError> {
        self.delete(&format!("/applications/{uuid}")).await
    }

    async fn deploy(
        &self,
        app_uuid: &str,
        force: bool,
        pr: u32,
    ) -> Result<Vec<DeploymentTrigger>, ApiError> {
        let path = format!("/deploy?uuid={app_uuid}&force={force}&pr={pr}");
        let response: DeployResponse = self.get(&path).await?;
        tracing::info!(app = app_uuid, force, queued = response.deployments.len(), "deployment triggered");
        Ok(response.deployments)
    }

    async fn list_deployments(&self, app_uuid: &str) -> Result<Vec<Deployment>, ApiError> {
        let list: DeploymentList = self
            .get(&format!("/deployments/applications/{app_uuid}"))
            .await?;
        Ok(list.into())
    }

    async fn get_deployment(&self, uuid: &str) -> Result<DeploymentDetail, ApiError> {
        self.get(&format!("/deployments/{uuid}")).await
    }

    async fn list_github_apps(&self) -> Result<Vec<GitHubApp>, ApiError> {
        self.get("/github-apps").await
    }

    async fn list_envs(&self, app_uuid: &str) -> Result<Vec<EnvVar>, ApiError> {
        self.get(&format!("/applications/{app_uuid}/envs")).await
    }

    async fn create_env(&self, app_uuid: &str, env: &NewEnvVar) -> Result<Created, ApiError> {
        self.post(&format!("/applications/{app_uuid}/envs"), env)
            .await
    }

    async fn delete_env(&self, app_uuid: &str, env_uuid: &str) -> Result<(), ApiError> {
        self.delete(&format!("/applications/{app_uuid}/envs/{env_uuid}"))
            .await
    }
}
