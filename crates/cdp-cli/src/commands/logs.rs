use anyhow::Context;
use cdp_cloud::ControlPlane;
use cdp_cloud::coolify::parse_logs;
use cdp_core::ProjectStore;

pub async fn logs() -> anyhow::Result<()> {
    let store = ProjectStore::new(super::project_dir()?);
    let config = super::load_project(&store)?;
    let app_uuid = super::require_app(&config)?;
    let client = super::coolify_client(&super::load_global()?)?;

    let deployments = client
        .list_deployments(app_uuid)
        .await
        .context("failed to list deployments")?;
    let Some(latest) = deployments.first() else {
        println!("No deployments yet");
        return Ok(());
    };

    let detail = client
        .get_deployment(latest.canonical_uuid())
        .await
        .context("failed to fetch the deployment")?;

    let text = parse_logs(&detail.logs);
    print!("{text}");
    if !text.is_empty() && !text.ends_with('\n') {
        println!();
    }
    println!("==> {} ({})", latest.canonical_uuid(), detail.status);
    Ok(())
}
