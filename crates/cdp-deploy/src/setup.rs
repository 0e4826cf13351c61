//! First-run wizard that writes `cdp.json`.

use std::path::Path;

use cdp_build::detect::DetectError;
use cdp_build::tag;
use cdp_cloud::coolify::{Project, Server};
use cdp_cloud::{ApiError, ControlPlane};
use cdp_core::config::{DEFAULT_BRANCH, DEFAULT_PLATFORM, DEFAULT_PORT};
use cdp_core::{
    ConfigStore, DeployMethod, DeployMethodKind, DockerDeployConfig, FrameworkInfo,
    GitDeployConfig, GlobalConfig, ProjectConfig,
};

use crate::prompt::{PromptError, Prompter};

const CREATE_PROJECT: &str = "+ Create new project";
const PLATFORMS: [(&str, &str); 2] = [
    ("linux/amd64 (Intel/AMD)", "linux/amd64"),
    ("linux/arm64 (Apple Silicon/ARM)", "linux/arm64"),
];
const FALLBACK_NAME: &str = "app";

/// Name derived from the project directory.
pub fn project_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_owned()
}

/// Deploy methods the current credentials allow.
pub fn available_methods(global: &GlobalConfig, docker_available: bool) -> Vec<DeployMethodKind> {
    let mut methods = Vec::new();
    if global.has_github() {
        methods.push(DeployMethodKind::Git);
    }
    if docker_available && global.docker_registry.is_some() {
        methods.push(DeployMethodKind::Docker);
    }
    methods
}

/// Ask everything needed for a first deploy and save `cdp.json`.
///
/// Remote resources are not created here; an unset `project_uuid` or
/// `environment_uuid` is filled in by [`crate::resolve`].
pub async fn run<C, S, P>(
    client: &C,
    store: &S,
    prompter: &P,
    global: &GlobalConfig,
    dir: &Path,
    docker_available: bool,
) -> Result<ProjectConfig, SetupError>
where
    C: ControlPlane,
    S: ConfigStore,
    P: Prompter,
{
    let mut framework = cdp_build::detect(dir)?;
    tracing::info!(framework = %framework.name, build_pack = %framework.build_pack, "detected framework");
    if prompter.confirm(&describe(&framework), false)? {
        edit_build_settings(prompter, &mut framework)?;
    }

    let kind = choose_method(prompter, global, docker_available)?;

    let servers = client
        .list_servers()
        .await
        .map_err(|e| SetupError::Coolify { step: "list servers", source: e })?;
    let server_uuid = choose_server(prompter, &servers, &global.default_server)?;

    let projects = client
        .list_projects()
        .await
        .map_err(|e| SetupError::Coolify { step: "list projects", source: e })?;
    let (name, project_uuid) = choose_project(prompter, &projects, &project_name(dir))?;

    let method = match kind {
        DeployMethodKind::Git => DeployMethod::Git(GitDeployConfig {
            github_repo: name.clone(),
            ..GitDeployConfig::default()
        }),
        DeployMethodKind::Docker => {
            let registry = global
                .docker_registry
                .as_ref()
                .ok_or(SetupError::NoDeployMethod)?;
            DeployMethod::Docker(DockerDeployConfig {
                docker_image: tag::image_name(&registry.url, &registry.username, &name),
            })
        }
    };

    let mut config = ProjectConfig::new(name, method).with_framework(&framework);
    config.server_uuid = server_uuid;
    config.project_uuid = project_uuid;
    if config.port.is_empty() {
        config.port = DEFAULT_PORT.to_owned();
    }
    config.platform = DEFAULT_PLATFORM.to_owned();
    if kind == DeployMethodKind::Git {
        config.branch = DEFAULT_BRANCH.to_owned();
    }

    if prompter.confirm(
        "Configure advanced options (port, platform, domain, branch)?",
        false,
    )? {
        advanced_options(prompter, &mut config, kind)?;
    }

    store.save(&config)?;
    tracing::info!(name = %config.name, method = %kind, "created cdp.json");
    Ok(config)
}

fn describe(framework: &FrameworkInfo) -> String {
    let mut text = format!("Detected {}.", framework.name);
    for (label, value) in [
        ("install", &framework.install_command),
        ("build", &framework.build_command),
        ("start", &framework.start_command),
        ("publish", &framework.publish_directory),
    ] {
        if !value.is_empty() {
            text.push_str(&format!(" {label}: {value};"));
        }
    }
    text.push_str(" Edit these settings?");
    text
}

fn edit_build_settings<P: Prompter>(
    prompter: &P,
    framework: &mut FrameworkInfo,
) -> Result<(), PromptError> {
    framework.install_command = prompter.input("Install command", &framework.install_command)?;
    framework.build_command = prompter.input("Build command", &framework.build_command)?;
    framework.start_command = prompter.input("Start command", &framework.start_command)?;
    if framework.is_static() {
        framework.publish_directory =
            prompter.input("Publish directory", &framework.publish_directory)?;
    }
    Ok(())
}

fn choose_method<P: Prompter>(
    prompter: &P,
    global: &GlobalConfig,
    docker_available: bool,
) -> Result<DeployMethodKind, SetupError> {
    let methods = available_methods(global, docker_available);
    if methods.is_empty() {
        return Err(SetupError::NoDeployMethod);
    }
    let labels: Vec<String> = methods
        .iter()
        .map(|kind| match kind {
            DeployMethodKind::Git => "Git-based (auto-manage GitHub repo)".to_owned(),
            DeployMethodKind::Docker => "Docker-based (build & push image)".to_owned(),
        })
        .collect();
    let index = prompter.select("Deployment method", &labels, 0)?;
    methods
        .get(index)
        .copied()
        .ok_or(SetupError::Prompt(PromptError::Cancelled))
}

fn choose_server<P: Prompter>(
    prompter: &P,
    servers: &[Server],
    default_server: &str,
) -> Result<String, SetupError> {
    if servers.is_empty() {
        return Err(SetupError::NoServers);
    }
    let labels: Vec<String> = servers
        .iter()
        .map(|s| {
            if s.ip.is_empty() {
                s.name.clone()
            } else {
                format!("{} ({})", s.name, s.ip)
            }
        })
        .collect();
    let default = servers
        .iter()
        .position(|s| s.uuid == default_server)
        .unwrap_or(0);
    let index = prompter.select("Server", &labels, default)?;
    servers
        .get(index)
        .map(|s| s.uuid.clone())
        .ok_or(SetupError::Prompt(PromptError::Cancelled))
}

/// Returns the application name and the chosen project's UUID, which is
/// empty when a new project should be created.
fn choose_project<P: Prompter>(
    prompter: &P,
    projects: &[Project],
    default_name: &str,
) -> Result<(String, String), SetupError> {
    let mut labels = vec![CREATE_PROJECT.to_owned()];
    labels.extend(projects.iter().map(|p| p.name.clone()));

    let index = prompter.select("Project", &labels, 0)?;
    if index == 0 {
        let name = prompter.input("Project name", default_name)?;
        let name = name.trim();
        let name = if name.is_empty() { default_name } else { name };
        return Ok((name.to_owned(), String::new()));
    }
    let project = projects
        .get(index - 1)
        .ok_or(SetupError::Prompt(PromptError::Cancelled))?;
    Ok((default_name.to_owned(), project.uuid.clone()))
}

fn advanced_options<P: Prompter>(
    prompter: &P,
    config: &mut ProjectConfig,
    kind: DeployMethodKind,
) -> Result<(), PromptError> {
    config.port = prompter.input("Port", &config.port)?;

    match kind {
        DeployMethodKind::Docker => {
            let labels: Vec<String> = PLATFORMS.iter().map(|(l, _)| (*l).to_owned()).collect();
            let index = prompter.select("Target platform", &labels, 0)?;
            if let Some((_, platform)) = PLATFORMS.get(index) {
                config.platform = (*platform).to_owned();
            }
        }
        DeployMethodKind::Git => {
            config.branch = prompter.input("Git branch", &config.branch)?;
        }
    }

    let domains = [
        "Auto-generate (Coolify wildcard)".to_owned(),
        "Custom domain".to_owned(),
    ];
    if prompter.select("Domain", &domains, 0)? == 1 {
        config.domain = prompter.input("Custom domain", "app.example.com")?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to detect framework")]
    Detect(#[from] DetectError),

    #[error("no deployment method available; configure a GitHub token or Docker registry with `cdp login`")]
    NoDeployMethod,

    #[error("no servers found in Coolify; add a server first")]
    NoServers,

    #[error("Coolify: failed to {step}")]
    Coolify {
        step: &'static str,
        source: ApiError,
    },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Config(#[from] cdp_core::Error),
}
