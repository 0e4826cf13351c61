//! Gets code or an image to Coolify and queues exactly one deployment.

use std::path::Path;

use cdp_build::dockerfile::{BuildFile, DockerfileError};
use cdp_build::readme::{self, ReadmeError};
use cdp_build::{DockerfileGenerator, tag};
use cdp_cloud::coolify::{
    ApplicationPatch, CreateDockerImageRequest, CreateGitHubAppRequest, DeploymentTrigger,
    GitHubApp,
};
use cdp_cloud::docker::BuildSpec;
use cdp_cloud::git::{github_remote_url, repo_name};
use cdp_cloud::{
    ApiError, CodeHost, CommandExecutor, ControlPlane, DockerClient, DockerError, GitClient,
    GitError, GitHubError,
};
use cdp_core::config::PRODUCTION_ENVIRONMENT;
use cdp_core::framework::BUILD_PACK_NIXPACKS;
use cdp_core::{
    ConfigStore, DeployMethod, DockerDeployConfig, GitDeployConfig, GlobalConfig, ProjectConfig,
};

use crate::prompt::{PromptError, Prompter};

const REMOTE: &str = "origin";
const HEALTH_CHECK_PATH: &str = "/";

/// What [`Dispatcher::dispatch`] left behind for the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub app_uuid: String,
    pub trigger: Trigger,
}

/// How the single deployment of this run was queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// `GET /deploy` was called.
    Explicit(Vec<DeploymentTrigger>),
    /// The push reached an existing application through its GitHub App webhook.
    Webhook,
}

/// Runs the git or docker deploy path for a resolved project.
///
/// `project_uuid`, `environment_uuid` and `server_uuid` must be set; see
/// [`crate::resolve`]. Verbose output is a property of the [`DockerClient`].
pub struct Dispatcher<'a, C, H, G, D, S, P>
where
    G: CommandExecutor,
    D: CommandExecutor,
{
    pub coolify: &'a C,
    /// `None` when no GitHub token is configured.
    pub github: Option<&'a H>,
    pub git: &'a GitClient<G>,
    pub docker: &'a DockerClient<D>,
    pub store: &'a S,
    pub prompter: &'a P,
    pub global: &'a GlobalConfig,
    pub dir: &'a Path,
}

impl<C, H, G, D, S, P> Dispatcher<'_, C, H, G, D, S, P>
where
    C: ControlPlane,
    H: CodeHost,
    G: CommandExecutor,
    D: CommandExecutor,
    S: ConfigStore,
    P: Prompter,
{
    pub async fn dispatch(&self, config: &mut ProjectConfig) -> Result<Dispatched, DispatchError> {
        if config.server_uuid.is_empty() {
            return Err(DispatchError::NoServer);
        }
        match config.method.clone() {
            DeployMethod::Git(settings) => self.deploy_git(config, settings).await,
            DeployMethod::Docker(settings) => self.deploy_docker(config, &settings).await,
        }
    }

    // ── Git path ──

    async fn deploy_git(
        &self,
        config: &mut ProjectConfig,
        mut settings: GitDeployConfig,
    ) -> Result<Dispatched, DispatchError> {
        let (Some(host), Some(token)) = (self.github, self.global.github_token.as_ref()) else {
            return Err(DispatchError::NoGitHubToken);
        };

        let user = host
            .user()
            .await
            .map_err(|e| DispatchError::GitHub { step: "read user", source: e })?;

        if settings.github_repo.is_empty() {
            settings.github_repo = config.name.clone();
        }
        let exists = host
            .repo_exists(&user.login, repo_name(&settings.github_repo))
            .await
            .map_err(|e| DispatchError::GitHub { step: "look up repository", source: e })?;
        if !exists {
            self.create_repository(config, &mut settings, host, &user.login)
                .await?;
        }
        let repo = repo_name(&settings.github_repo).to_owned();
        let full_name = format!("{}/{repo}", user.login);

        if settings.github_app_uuid.is_empty() {
            settings.github_app_uuid = self.select_github_app().await?;
            config.method = DeployMethod::Git(settings.clone());
            self.store.save(config)?;
        }

        if !self.git.is_repo() {
            self.git.init().await?;
        }
        self.git
            .set_remote(REMOTE, &github_remote_url(&user.login, &repo))
            .await?;
        let had_changes = self.git.auto_commit().await?;
        let branch = if config.branch.is_empty() {
            self.git.current_branch().await?
        } else {
            config.branch.clone()
        };
        let pushed_commit = self.git.push(REMOTE, &branch, token).await?;
        tracing::info!(
            repo = %full_name,
            %branch,
            had_changes,
            pushed_commit,
            "pushed to GitHub"
        );

        let mut created = false;
        if !config.has_application() {
            let request = self.github_app_request(config, &settings, &full_name, &branch);
            let app = self
                .coolify
                .create_github_app_application(&request)
                .await
                .map_err(|e| DispatchError::Coolify { step: "create application", source: e })?;
            config.app_uuid = app.uuid;
            self.store.save(config)?;
            created = true;
        }

        // A new application was created after the push, so no webhook
        // reached it. An up-to-date remote branch fires no webhook either.
        let trigger = if created || !pushed_commit {
            Trigger::Explicit(self.trigger(&config.app_uuid).await?)
        } else {
            Trigger::Webhook
        };

        Ok(Dispatched {
            app_uuid: config.app_uuid.clone(),
            trigger,
        })
    }

    async fn create_repository(
        &self,
        config: &mut ProjectConfig,
        settings: &mut GitDeployConfig,
        host: &H,
        owner: &str,
    ) -> Result<(), DispatchError> {
        let name = self
            .prompter
            .input("Repository name", repo_name(&settings.github_repo))?;
        let visibility = ["Private".to_owned(), "Public".to_owned()];
        let private = self.prompter.select("Repository visibility", &visibility, 0)? == 0;
        let question = format!(
            "Create {} repository {owner}/{name}?",
            if private { "private" } else { "public" }
        );
        if !self.prompter.confirm(&question, true)? {
            return Err(DispatchError::Prompt(PromptError::Cancelled));
        }

        if readme::write_if_missing(self.dir, &config.name, &config.framework)? {
            tracing::info!("wrote README.md for the initial commit");
        }
        let description = format!("Deployment repo for {}", config.name);
        host.create_repo(&name, &description, private)
            .await
            .map_err(|e| DispatchError::GitHub { step: "create repository", source: e })?;

        settings.github_repo = name;
        settings.github_private = private;
        config.method = DeployMethod::Git(settings.clone());
        self.store.save(config)?;
        Ok(())
    }

    /// One app is taken as is; several are offered with private apps first.
    async fn select_github_app(&self) -> Result<String, DispatchError> {
        let mut apps: Vec<GitHubApp> = self
            .coolify
            .list_github_apps()
            .await
            .map_err(|e| DispatchError::Coolify { step: "list GitHub Apps", source: e })?;

        match apps.len() {
            0 => Err(DispatchError::NoGitHubApp),
            1 => Ok(apps.remove(0).uuid),
            _ => {
                apps.sort_by_key(GitHubApp::is_public);
                let names: Vec<String> = apps.iter().map(GitHubApp::display_name).collect();
                let index = self.prompter.select("GitHub App", &names, 0)?;
                apps.get(index)
                    .map(|app| app.uuid.clone())
                    .ok_or(DispatchError::Prompt(PromptError::Cancelled))
            }
        }
    }

    fn github_app_request(
        &self,
        config: &ProjectConfig,
        settings: &GitDeployConfig,
        full_name: &str,
        branch: &str,
    ) -> CreateGitHubAppRequest {
        let framework = config.framework_info();
        let build_pack = if framework.build_pack.is_empty() {
            BUILD_PACK_NIXPACKS.to_owned()
        } else {
            framework.build_pack.clone()
        };
        let is_static = framework.is_static();

        CreateGitHubAppRequest {
            project_uuid: config.project_uuid.clone(),
            server_uuid: config.server_uuid.clone(),
            environment_uuid: config.environment_uuid.clone(),
            github_app_uuid: settings.github_app_uuid.clone(),
            git_repository: full_name.to_owned(),
            git_branch: branch.to_owned(),
            name: config.name.clone(),
            build_pack,
            is_static,
            domains: config.domain.clone(),
            install_command: framework.install_command,
            build_command: framework.build_command,
            start_command: framework.start_command,
            publish_directory: framework.publish_directory,
            ports_exposes: framework.port,
            health_check_enabled: is_static,
            health_check_path: if is_static {
                HEALTH_CHECK_PATH.to_owned()
            } else {
                String::new()
            },
            instant_deploy: false,
        }
    }

    // ── Docker path ──

    async fn deploy_docker(
        &self,
        config: &mut ProjectConfig,
        settings: &DockerDeployConfig,
    ) -> Result<Dispatched, DispatchError> {
        if settings.docker_image.is_empty() {
            return Err(DispatchError::NoImage);
        }
        let image = settings.docker_image.as_str();

        let framework = config.framework_info();
        let generator = DockerfileGenerator::new(&framework, config.effective_port());
        let tag = tag::generate(PRODUCTION_ENVIRONMENT);

        let port = {
            // Dropping the build file removes a generated Dockerfile.cdp.
            let build_file = BuildFile::prepare(self.dir, &generator)?;
            self.docker
                .build(&BuildSpec {
                    context: self.dir,
                    dockerfile: build_file.path(),
                    image,
                    tag: &tag,
                    platform: config.effective_platform(),
                })
                .await?;
            if build_file.is_generated() {
                generator.exposed_port().to_owned()
            } else {
                config.effective_port().to_owned()
            }
        };

        if let Some(registry) = &self.global.docker_registry {
            self.docker
                .login(&registry.url, &registry.username, &registry.password)
                .await?;
        }
        self.docker.push(image, &tag).await?;

        if config.has_application() {
            let patch = ApplicationPatch {
                docker_registry_image_tag: Some(tag.clone()),
                ..ApplicationPatch::default()
            };
            self.coolify
                .update_application(&config.app_uuid, &patch)
                .await
                .map_err(|e| DispatchError::Coolify { step: "update image tag", source: e })?;
        } else {
            let request = CreateDockerImageRequest {
                project_uuid: config.project_uuid.clone(),
                server_uuid: config.server_uuid.clone(),
                environment_uuid: config.environment_uuid.clone(),
                name: config.name.clone(),
                docker_registry_image_name: image.to_owned(),
                docker_registry_image_tag: tag.clone(),
                ports_exposes: port,
                domains: config.domain.clone(),
                instant_deploy: false,
            };
            let app = self
                .coolify
                .create_docker_image_application(&request)
                .await
                .map_err(|e| DispatchError::Coolify { step: "create application", source: e })?;
            config.app_uuid = app.uuid;
            self.store.save(config)?;
        }

        let triggers = self.trigger(&config.app_uuid).await?;
        tracing::info!(%image, %tag, app = %config.app_uuid, "image deployed");
        Ok(Dispatched {
            app_uuid: config.app_uuid.clone(),
            trigger: Trigger::Explicit(triggers),
        })
    }

    async fn trigger(&self, app_uuid: &str) -> Result<Vec<DeploymentTrigger>, DispatchError> {
        self.coolify
            .deploy(app_uuid, false, 0)
            .await
            .map_err(|e| DispatchError::Coolify { step: "trigger deployment", source: e })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no server selected for this project")]
    NoServer,

    #[error("no GitHub token configured")]
    NoGitHubToken,

    #[error("no GitHub App configured in Coolify (add one under Sources)")]
    NoGitHubApp,

    #[error("no Docker image name configured")]
    NoImage,

    #[error("GitHub: failed to {step}")]
    GitHub {
        step: &'static str,
        source: GitHubError,
    },

    #[error("Coolify: failed to {step}")]
    Coolify {
        step: &'static str,
        source: ApiError,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Docker(#[from] DockerError),

    #[error(transparent)]
    Dockerfile(#[from] DockerfileError),

    #[error(transparent)]
    Readme(#[from] ReadmeError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Config(#[from] cdp_core::Error),
}
