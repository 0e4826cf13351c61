use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// The git hosting service repositories are pushed to.
#[allow(async_fn_in_trait)]
pub trait CodeHost: Send + Sync {
    /// The authenticated user.
    async fn user(&self) -> Result<GitHubUser, GitHubError>;

    async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool, GitHubError>;

    async fn create_repo(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<Repository, GitHubError>;

    async fn delete_repo(&self, owner: &str, name: &str) -> Result<(), GitHubError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Serialize)]
struct CreateRepo<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

/// GitHub REST API client.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl GitHubClient {
    pub fn new(token: SecretString) -> Result<Self, GitHubError> {
        Self::with_base_url(GITHUB_API_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: SecretString) -> Result<Self, GitHubError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("cdp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GitHubError::Client { source: e })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%method, %url, "github request");
        self.client
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
            .header(header::ACCEPT, "application/vnd.github+json")
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<reqwest::Response, GitHubError> {
        let response = builder.send().await.map_err(|e| GitHubError::Transport {
            path: path.to_owned(),
            source: e,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("<unreadable body: {e}>"),
        };
        Err(GitHubError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, GitHubError> {
        response.json().await.map_err(|e| GitHubError::Transport {
            path: path.to_owned(),
            source: e,
        })
    }
}

impl CodeHost for GitHubClient {
    async fn user(&self) -> Result<GitHubUser, GitHubError> {
        let path = "/user";
        let response = self.send(self.request(reqwest::Method::GET, path), path).await?;
        Self::json(response, path).await
    }

    async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool, GitHubError> {
        let path = format!("/repos/{owner}/{name}");
        match self.send(self.request(reqwest::Method::GET, &path), &path).await {
            Ok(_) => Ok(true),
            Err(GitHubError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_repo(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<Repository, GitHubError> {
        let path = "/user/repos";
        let body = CreateRepo {
            name,
            description,
            private,
            auto_init: false,
        };
        let response = self
            .send(self.request(reqwest::Method::POST, path).json(&body), path)
            .await?;
        let repo: Repository = Self::json(response, path).await?;
        tracing::info!(repo = %repo.full_name, private, "created GitHub repository");
        Ok(repo)
    }

    async fn delete_repo(&self, owner: &str, name: &str) -> Result<(), GitHubError> {
        let path = format!("/repos/{owner}/{name}");
        self.send(self.request(reqwest::Method::DELETE, &path), &path)
            .await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("failed to build HTTP client")]
    Client { source: reqwest::Error },

    #[error("request to GitHub {path} failed")]
    Transport {
        path: String,
        source: reqwest::Error,
    },

    #[error("GitHub API error (status {status}): {body}")]
    Status { status: u16, body: String },
}
