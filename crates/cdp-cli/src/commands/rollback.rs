use anyhow::Context;
use cdp_cloud::ControlPlane;
use cdp_core::{DeployMethodKind, ProjectStore};
use cdp_deploy::rollback::{self, HISTORY_LIMIT};
use cdp_deploy::{Prompter, Verdict, WatchPolicy, watcher};
use tokio_util::sync::CancellationToken;

use crate::ui::{SpinnerOut, TerminalPrompter, create_spinner};

pub async fn rollback(verbose: bool, cancel: &CancellationToken) -> anyhow::Result<()> {
    let store = ProjectStore::new(super::project_dir()?);
    let config = super::load_project(&store)?;
    if config.method.kind() != DeployMethodKind::Git {
        anyhow::bail!("rollback needs a git-based project; redeploy an older image tag instead");
    }
    let app_uuid = super::require_app(&config)?;
    let client = super::coolify_client(&super::load_global()?)?;
    let prompter = TerminalPrompter::default();

    let deployments = client
        .list_deployments(app_uuid)
        .await
        .context("failed to list deployments")?;
    let candidates = rollback::candidates(&deployments);
    if candidates.is_empty() {
        anyhow::bail!("no earlier successful deployment to roll back to");
    }

    let labels: Vec<String> = candidates.iter().map(|d| rollback::label(d)).collect();
    let index = prompter.select(
        &format!("Roll back to (last {HISTORY_LIMIT})"),
        &labels,
        0,
    )?;
    let target = candidates.get(index).context("no deployment selected")?;
    let sha = target.commit_sha();

    rollback::redeploy_commit(&client, app_uuid, sha).await?;
    println!("Rolling back {} to {sha}", config.name);

    let spinner = create_spinner("Waiting for deployment...");
    let policy = WatchPolicy {
        verbose,
        ..WatchPolicy::default()
    };
    let verdict = watcher::watch(
        &client,
        app_uuid,
        policy,
        cancel,
        &mut SpinnerOut::new(spinner.clone()),
    )
    .await;
    spinner.finish_and_clear();

    match verdict {
        Verdict::Succeeded => {
            println!("Rolled back to {sha}. The application stays pinned to this commit.");
            Ok(())
        }
        verdict => anyhow::bail!("{verdict}; run `cdp logs` for details"),
    }
}
