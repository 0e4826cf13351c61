use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use crate::executor::{CommandError, CommandExecutor, RealExecutor, args};

/// Image build parameters.
#[derive(Debug, Clone)]
pub struct BuildSpec<'a> {
    /// Build context.
    pub context: &'a Path,
    pub dockerfile: &'a Path,
    /// Image name without tag.
    pub image: &'a str,
    pub tag: &'a str,
    pub platform: &'a str,
}

/// `docker` CLI operations.
pub struct DockerClient<E: CommandExecutor = RealExecutor> {
    executor: E,
    /// Stream build and push output instead of capturing it.
    verbose: bool,
}

impl DockerClient<RealExecutor> {
    pub fn new(verbose: bool) -> Self {
        Self {
            executor: RealExecutor::default(),
            verbose,
        }
    }
}

impl<E: CommandExecutor> DockerClient<E> {
    pub fn with_executor(executor: E, verbose: bool) -> Self {
        Self { executor, verbose }
    }

    async fn run(&self, cmd: &[String]) -> Result<(), CommandError> {
        if self.verbose {
            self.executor.exec_streaming("docker", cmd).await
        } else {
            self.executor.exec("docker", cmd).await.map(|out| {
                tracing::debug!(bytes = out.len(), "docker output captured");
            })
        }
    }

    /// Daemon reachable (`docker version` succeeds).
    pub async fn is_available(&self) -> bool {
        self.executor.exec("docker", &args(["version"])).await.is_ok()
    }

    pub async fn build(&self, spec: &BuildSpec<'_>) -> Result<(), DockerError> {
        let image_ref = format!("{}:{}", spec.image, spec.tag);
        let dockerfile = spec.dockerfile.to_string_lossy();
        let context = spec.context.to_string_lossy();

        tracing::info!(image = %image_ref, platform = spec.platform, "building image");
        self.run(&args([
            "build",
            "--progress=plain",
            "--platform",
            spec.platform,
            "-t",
            &image_ref,
            "-f",
            &dockerfile,
            &context,
        ]))
        .await
        .map_err(|e| DockerError::Build {
            image: image_ref,
            source: e,
        })
    }

    /// `docker login <registry> --password-stdin`.
    pub async fn login(
        &self,
        registry: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<(), DockerError> {
        self.executor
            .exec_with_stdin(
                "docker",
                &args(["login", registry, "-u", username, "--password-stdin"]),
                password.expose_secret().as_bytes(),
            )
            .await
            .map_err(|e| DockerError::Login {
                registry: registry.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn push(&self, image: &str, tag: &str) -> Result<(), DockerError> {
        let image_ref = format!("{image}:{tag}");
        tracing::info!(image = %image_ref, "pushing image");
        self.run(&args(["push", &image_ref]))
            .await
            .map_err(|e| DockerError::Push {
                image: image_ref,
                source: e,
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker build of {image} failed")]
    Build { image: String, source: CommandError },

    #[error("docker login to {registry} failed")]
    Login {
        registry: String,
        source: CommandError,
    },

    #[error("docker push of {image} failed")]
    Push { image: String, source: CommandError },
}
