//! Redeploying an earlier commit of a git-based application.

use cdp_cloud::ControlPlane;
use cdp_cloud::coolify::{
    ApiError, ApplicationPatch, Deployment, DeploymentStatus, DeploymentTrigger,
};

/// How many earlier deployments are offered.
pub const HISTORY_LIMIT: usize = 10;

const SHORT_SHA: usize = 7;

/// Earlier successful deployments with a known commit, newest first.
///
/// The newest entry of `deployments` is the current one and is never offered.
pub fn candidates(deployments: &[Deployment]) -> Vec<&Deployment> {
    deployments
        .iter()
        .skip(1)
        .filter(|d| !d.commit_sha().is_empty())
        .filter(|d| DeploymentStatus::classify(&d.status) == DeploymentStatus::Finished)
        .take(HISTORY_LIMIT)
        .collect()
}

/// One line for the selection menu.
pub fn label(deployment: &Deployment) -> String {
    let sha = deployment.commit_sha();
    let short = sha.get(..SHORT_SHA).unwrap_or(sha);
    let message = deployment.commit_message.lines().next().unwrap_or_default();
    match (message.is_empty(), deployment.created_at.is_empty()) {
        (true, true) => short.to_owned(),
        (true, false) => format!("{short}  ({})", deployment.created_at),
        (false, true) => format!("{short}  {message}"),
        (false, false) => format!("{short}  {message}  ({})", deployment.created_at),
    }
}

/// Pin the application to `sha` and force a rebuild.
pub async fn redeploy_commit<C: ControlPlane>(
    client: &C,
    app_uuid: &str,
    sha: &str,
) -> Result<Vec<DeploymentTrigger>, RollbackError> {
    let patch = ApplicationPatch {
        git_commit_sha: Some(sha.to_owned()),
        ..ApplicationPatch::default()
    };
    client
        .update_application(app_uuid, &patch)
        .await
        .map_err(|e| RollbackError::Pin {
            sha: sha.to_owned(),
            source: e,
        })?;
    tracing::info!(app = app_uuid, sha, "pinned application to commit");

    client
        .deploy(app_uuid, true, 0)
        .await
        .map_err(|e| RollbackError::Deploy { source: e })
}

#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    #[error("failed to pin the application to commit {sha}")]
    Pin { sha: String, source: ApiError },

    #[error("failed to trigger the rollback deployment")]
    Deploy { source: ApiError },
}
