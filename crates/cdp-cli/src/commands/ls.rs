use anyhow::Context;
use cdp_cloud::ControlPlane;
use cdp_core::{DeployMethod, ProjectStore};

pub async fn ls() -> anyhow::Result<()> {
    let store = ProjectStore::new(super::project_dir()?);
    let config = super::load_project(&store)?;
    let app_uuid = super::require_app(&config)?;
    let client = super::coolify_client(&super::load_global()?)?;

    let app = client
        .get_application(app_uuid)
        .await
        .with_context(|| format!("failed to fetch application {app_uuid}"))?;

    let source = match &config.method {
        DeployMethod::Git(git) => format!("git ({})", git.github_repo),
        DeployMethod::Docker(docker) => format!("docker ({})", docker.docker_image),
    };
    let url = if app.fqdn.is_empty() { "-" } else { app.fqdn.as_str() };
    let framework = if config.framework.is_empty() {
        "-"
    } else {
        config.framework.as_str()
    };

    println!("Name:      {}", config.name);
    println!("Status:    {}", app.status);
    println!("URL:       {url}");
    println!("Method:    {source}");
    println!("Framework: {framework}");
    println!("UUID:      {}", app.uuid);
    Ok(())
}
