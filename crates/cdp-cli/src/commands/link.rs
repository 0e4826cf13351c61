use anyhow::Context;
use cdp_cloud::ControlPlane;
use cdp_cloud::coolify::Application;
use cdp_cloud::git::repo_name;
use cdp_core::{
    ConfigStore, DeployMethod, DockerDeployConfig, GitDeployConfig, ProjectConfig, ProjectStore,
};
use cdp_deploy::Prompter;

use crate::ui::TerminalPrompter;

/// Point `cdp.json` at an existing application. An existing file keeps its
/// settings and only gets the new application UUID.
pub async fn link() -> anyhow::Result<()> {
    let store = ProjectStore::new(super::project_dir()?);
    let global = super::load_global()?;
    let client = super::coolify_client(&global)?;
    let prompter = TerminalPrompter::default();

    let apps = client
        .list_applications()
        .await
        .context("failed to list applications")?;
    if apps.is_empty() {
        anyhow::bail!("no applications in Coolify; run `cdp deploy` to create one");
    }
    let labels: Vec<String> = apps.iter().map(app_label).collect();
    let index = prompter.select("Application", &labels, 0)?;
    let app = apps.get(index).context("no application selected")?;

    let mut config = match store.load()? {
        Some(config) => config,
        None => new_config(&client, &prompter, &global.default_server, app).await?,
    };
    config.app_uuid = app.uuid.clone();
    store.save(&config)?;

    println!("Linked {} to application {}", store.dir().display(), app.name);
    Ok(())
}

fn app_label(app: &Application) -> String {
    if app.fqdn.is_empty() {
        format!("{} [{}]", app.name, app.status)
    } else {
        format!("{} [{}] {}", app.name, app.status, app.fqdn)
    }
}

/// The application carries neither server nor project, so both are asked.
async fn new_config<C: ControlPlane, P: Prompter>(
    client: &C,
    prompter: &P,
    default_server: &str,
    app: &Application,
) -> anyhow::Result<ProjectConfig> {
    let method = if app.docker_registry_image_name.is_empty() {
        DeployMethod::Git(GitDeployConfig {
            github_repo: repo_name(&app.git_repository).to_owned(),
            ..GitDeployConfig::default()
        })
    } else {
        DeployMethod::Docker(DockerDeployConfig {
            docker_image: app.docker_registry_image_name.clone(),
        })
    };
    let mut config = ProjectConfig::new(app.name.clone(), method);
    config.build_pack = app.build_pack.clone();
    config.branch = app.git_branch.clone();

    let servers = client.list_servers().await.context("failed to list servers")?;
    if servers.is_empty() {
        anyhow::bail!("no servers found in Coolify");
    }
    let labels: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
    let default = servers
        .iter()
        .position(|s| s.uuid == default_server)
        .unwrap_or(0);
    if let Some(server) = servers.get(prompter.select("Server", &labels, default)?) {
        config.server_uuid = server.uuid.clone();
    }

    let projects = client.list_projects().await.context("failed to list projects")?;
    if projects.is_empty() {
        anyhow::bail!("no projects found in Coolify");
    }
    let labels: Vec<String> = projects.iter().map(|p| p.name.clone()).collect();
    if let Some(project) = projects.get(prompter.select("Project", &labels, 0)?) {
        config.project_uuid = project.uuid.clone();
    }

    Ok(config)
}
