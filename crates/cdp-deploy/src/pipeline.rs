use std::io::Write;

use cdp_cloud::{CodeHost, CommandExecutor, ControlPlane};
use cdp_core::{ConfigStore, ProjectConfig};
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{DispatchError, Dispatched, Dispatcher};
use crate::prompt::Prompter;
use crate::resolver::{self, ResolveError};
use crate::watcher::{self, Verdict, WatchPolicy};

/// Result of a deploy run that got as far as watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub dispatched: Dispatched,
    pub verdict: Verdict,
    /// Public URL of the application, when Coolify assigned one.
    pub url: Option<String>,
}

/// Resolve the target, dispatch, then watch the deployment.
///
/// Cancelling during dispatch drops the in-flight step, which kills any
/// child process and removes a generated Dockerfile.
pub async fn run<C, H, G, D, S, P, W>(
    dispatcher: &Dispatcher<'_, C, H, G, D, S, P>,
    config: &mut ProjectConfig,
    policy: WatchPolicy,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<DeployOutcome, DeployError>
where
    C: ControlPlane,
    H: CodeHost,
    G: CommandExecutor,
    D: CommandExecutor,
    S: ConfigStore,
    P: Prompter,
    W: Write,
{
    resolver::resolve(dispatcher.coolify, dispatcher.store, config).await?;

    let dispatched = tokio::select! {
        _ = cancel.cancelled() => return Err(DeployError::Cancelled),
        dispatched = dispatcher.dispatch(config) => dispatched?,
    };

    let verdict = watcher::watch(
        dispatcher.coolify,
        &dispatched.app_uuid,
        policy,
        cancel,
        out,
    )
    .await;

    let url = match dispatcher.coolify.get_application(&dispatched.app_uuid).await {
        Ok(app) if !app.fqdn.is_empty() => Some(app.fqdn),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "could not read application URL");
            None
        }
    };

    Ok(DeployOutcome {
        dispatched,
        verdict,
        url,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("deploy cancelled")]
    Cancelled,
}
