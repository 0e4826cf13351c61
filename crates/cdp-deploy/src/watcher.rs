//! Follows a queued deployment until it succeeds, fails or runs out of time.
//!
//! [`WatchState::step`] is a pure transition over one poll's
//! [`Observation`]; [`watch`] does the I/O, sleeping and cancellation.
//!
//! ```text
//! Waiting ──record──▶ Tracking ──finished──▶ Succeeded
//!    │                  │  │ ──failed────▶ Failed
//!    │ 15 empty         │  └─ 3 empty ──▶ application status
//!    ▼                  ▼
//! NoDeployment     budget spent ──▶ application status ──▶ Succeeded | TimedOut
//! ```

use std::fmt;
use std::io::Write;
use std::time::Duration;

use cdp_cloud::ControlPlane;
use cdp_cloud::coolify::{ApplicationHealth, DeploymentDetail, DeploymentStatus, parse_logs};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    pub poll_interval: Duration,
    /// Polls before giving up.
    pub max_attempts: u32,
    /// Empty polls tolerated before any deployment has been seen.
    pub unseen_limit: u32,
    /// Empty polls after a deployment vanished before asking the application.
    pub empty_streak_limit: u32,
    /// Consecutive failed list calls before the control plane counts as gone.
    pub transport_error_limit: u32,
    pub reclaimed: ReclaimedPolicy,
    /// Print every status change alongside the build logs.
    pub verbose: bool,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 120,
            unseen_limit: 15,
            empty_streak_limit: 3,
            transport_error_limit: 5,
            reclaimed: ReclaimedPolicy::default(),
            verbose: false,
        }
    }
}

/// What to conclude when a tracked deployment disappears and the
/// application status says neither running nor down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReclaimedPolicy {
    #[default]
    KeepPolling,
    AssumeSuccess,
    AssumeFailure,
}

/// Outcome of a watch. Only [`Verdict::Succeeded`] counts as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Succeeded,
    /// The deployment or the application reported this status.
    Failed { status: String },
    /// No deployment record ever appeared.
    NoDeployment,
    TimedOut,
    /// The deployment list could not be fetched repeatedly.
    Unreachable,
    Cancelled,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Succeeded)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Succeeded => f.write_str("deployment succeeded"),
            Verdict::Failed { status } => write!(f, "deployment failed ({status})"),
            Verdict::NoDeployment => f.write_str("no deployment was started"),
            Verdict::TimedOut => f.write_str("deployment still in progress (timed out waiting)"),
            Verdict::Unreachable => f.write_str("lost contact with Coolify"),
            Verdict::Cancelled => f.write_str("stopped watching"),
        }
    }
}

/// What one poll of the deployment list produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The list call itself failed.
    ListFailed,
    /// The list was empty.
    Empty,
    /// The most recent deployment.
    Deployment {
        /// `deployment_uuid`, else `uuid`.
        uuid: String,
        list_status: String,
        /// `None` when the detail fetch failed.
        detail: Option<DeploymentDetail>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No deployment record seen yet.
    Waiting,
    Tracking,
    Finished,
}

/// Why the application status is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCheck {
    /// The tracked record vanished from the list.
    Reclaimed,
    /// The attempt budget is spent.
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Continue,
    /// Fetch the application and pass its status to
    /// [`WatchState::on_application_status`].
    CheckApplication(AppCheck),
    Done(Verdict),
}

/// Result of one [`WatchState::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Log text not emitted before.
    pub logs: String,
    /// Effective status when it differs from the previous poll.
    pub status_change: Option<String>,
    pub next: Next,
}

impl Step {
    fn quiet(next: Next) -> Self {
        Self {
            logs: String::new(),
            status_change: None,
            next,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchState {
    policy: WatchPolicy,
    phase: Phase,
    attempts: u32,
    unseen_polls: u32,
    empty_streak: u32,
    list_failures: u32,
    tracked_uuid: String,
    /// Bytes of the rendered log already emitted for `tracked_uuid`.
    log_offset: usize,
    last_status: String,
}

impl WatchState {
    pub fn new(policy: WatchPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Waiting,
            attempts: 0,
            unseen_polls: 0,
            empty_streak: 0,
            list_failures: 0,
            tracked_uuid: String::new(),
            log_offset: 0,
            last_status: String::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn tracked_uuid(&self) -> Option<&str> {
        if self.tracked_uuid.is_empty() {
            None
        } else {
            Some(&self.tracked_uuid)
        }
    }

    pub fn step(&mut self, observation: Observation) -> Step {
        self.attempts += 1;

        let step = match observation {
            Observation::ListFailed => {
                self.list_failures += 1;
                if self.list_failures >= self.policy.transport_error_limit {
                    Step::quiet(Next::Done(Verdict::Unreachable))
                } else {
                    Step::quiet(Next::Continue)
                }
            }
            Observation::Empty => {
                self.list_failures = 0;
                Step::quiet(self.on_empty())
            }
            Observation::Deployment {
                uuid,
                list_status,
                detail,
            } => {
                self.list_failures = 0;
                self.on_deployment(uuid, list_status, detail)
            }
        };

        self.finish(step)
    }

    /// Feed the application status requested by [`Next::CheckApplication`].
    /// `None` when the lookup failed.
    pub fn on_application_status(&mut self, check: AppCheck, status: Option<&str>) -> Next {
        let health = status.map(ApplicationHealth::classify);
        let next = match (check, health) {
            (_, Some(ApplicationHealth::Running)) => Next::Done(Verdict::Succeeded),
            (AppCheck::Final, _) => Next::Done(Verdict::TimedOut),
            (AppCheck::Reclaimed, Some(ApplicationHealth::Down)) => Next::Done(Verdict::Failed {
                status: status.unwrap_or_default().to_owned(),
            }),
            (AppCheck::Reclaimed, _) => match self.policy.reclaimed {
                ReclaimedPolicy::AssumeSuccess => Next::Done(Verdict::Succeeded),
                ReclaimedPolicy::AssumeFailure => Next::Done(Verdict::Failed {
                    status: status.unwrap_or("unknown").to_owned(),
                }),
                ReclaimedPolicy::KeepPolling => {
                    // Ask again after another full streak.
                    self.empty_streak = 0;
                    if self.budget_spent() {
                        Next::Done(Verdict::TimedOut)
                    } else {
                        Next::Continue
                    }
                }
            },
        };
        if matches!(next, Next::Done(_)) {
            self.phase = Phase::Finished;
        }
        next
    }

    fn on_empty(&mut self) -> Next {
        match self.phase {
            Phase::Waiting => {
                self.unseen_polls += 1;
                if self.unseen_polls >= self.policy.unseen_limit {
                    Next::Done(Verdict::NoDeployment)
                } else {
                    Next::Continue
                }
            }
            Phase::Tracking | Phase::Finished => {
                self.empty_streak += 1;
                if self.empty_streak >= self.policy.empty_streak_limit {
                    Next::CheckApplication(AppCheck::Reclaimed)
                } else {
                    Next::Continue
                }
            }
        }
    }

    fn on_deployment(
        &mut self,
        uuid: String,
        list_status: String,
        detail: Option<DeploymentDetail>,
    ) -> Step {
        self.phase = Phase::Tracking;
        self.empty_streak = 0;
        if uuid != self.tracked_uuid {
            tracing::debug!(deployment = %uuid, "tracking deployment");
            self.tracked_uuid = uuid;
            self.log_offset = 0;
            self.last_status.clear();
        }

        // The detail view is fresher; the list only stands in when it failed.
        let (status, logs) = match detail {
            Some(detail) => {
                let logs = self.new_log_text(&detail.logs);
                (detail.status, logs)
            }
            None => (list_status, String::new()),
        };

        let status_change = if status.eq_ignore_ascii_case(&self.last_status) {
            None
        } else {
            self.last_status = status.clone();
            Some(status.clone())
        };

        let next = match DeploymentStatus::classify(&status) {
            DeploymentStatus::Finished => Next::Done(Verdict::Succeeded),
            DeploymentStatus::Failed => Next::Done(Verdict::Failed { status }),
            DeploymentStatus::Pending => Next::Continue,
        };

        Step {
            logs,
            status_change,
            next,
        }
    }

    /// Text past `log_offset`; nothing when the blob did not grow.
    fn new_log_text(&mut self, raw: &str) -> String {
        let rendered = parse_logs(raw);
        match rendered.get(self.log_offset..) {
            Some(fresh) if !fresh.is_empty() => {
                let fresh = fresh.to_owned();
                self.log_offset = rendered.len();
                fresh
            }
            _ => String::new(),
        }
    }

    fn budget_spent(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    fn finish(&mut self, mut step: Step) -> Step {
        match step.next {
            Next::Done(_) => self.phase = Phase::Finished,
            Next::Continue if self.budget_spent() => {
                step.next = Next::CheckApplication(AppCheck::Final);
            }
            _ => {}
        }
        step
    }
}

/// Poll `app_uuid`'s deployments, writing new log text to `out`, until a
/// verdict is reached or `cancel` fires.
pub async fn watch<C, W>(
    client: &C,
    app_uuid: &str,
    policy: WatchPolicy,
    cancel: &CancellationToken,
    out: &mut W,
) -> Verdict
where
    C: ControlPlane,
    W: Write,
{
    let mut state = WatchState::new(policy);
    tracing::debug!(app = app_uuid, "watching deployments");

    loop {
        let observation = tokio::select! {
            _ = cancel.cancelled() => return Verdict::Cancelled,
            observation = observe(client, app_uuid) => observation,
        };

        let step = state.step(observation);
        if let Some(status) = step.status_change.as_deref().filter(|_| policy.verbose) {
            emit(out, &format!("==> status: {status}\n"));
        }
        if !step.logs.is_empty() {
            emit(out, &step.logs);
            if !step.logs.ends_with('\n') {
                emit(out, "\n");
            }
        }

        let next = match step.next {
            Next::CheckApplication(check) => {
                let status = tokio::select! {
                    _ = cancel.cancelled() => return Verdict::Cancelled,
                    status = application_status(client, app_uuid) => status,
                };
                state.on_application_status(check, status.as_deref())
            }
            next => next,
        };

        if let Next::Done(verdict) = next {
            tracing::info!(app = app_uuid, attempts = state.attempts(), %verdict, "watch finished");
            return verdict;
        }

        tokio::select! {
            _ = cancel.cancelled() => return Verdict::Cancelled,
            _ = tokio::time::sleep(policy.poll_interval) => {}
        }
    }
}

async fn observe<C: ControlPlane>(client: &C, app_uuid: &str) -> Observation {
    let deployments = match client.list_deployments(app_uuid).await {
        Ok(deployments) => deployments,
        Err(e) => {
            tracing::debug!(error = %e, "listing deployments failed");
            return Observation::ListFailed;
        }
    };
    let Some(latest) = deployments.into_iter().next() else {
        return Observation::Empty;
    };

    let uuid = latest.canonical_uuid().to_owned();
    let detail = match client.get_deployment(&uuid).await {
        Ok(detail) => Some(detail),
        Err(e) => {
            tracing::debug!(deployment = %uuid, error = %e, "deployment detail unavailable");
            None
        }
    };

    Observation::Deployment {
        uuid,
        list_status: latest.status,
        detail,
    }
}

async fn application_status<C: ControlPlane>(client: &C, app_uuid: &str) -> Option<String> {
    match client.get_application(app_uuid).await {
        Ok(app) => Some(app.status),
        Err(e) => {
            tracing::debug!(app = app_uuid, error = %e, "application status unavailable");
            None
        }
    }
}

fn emit<W: Write>(out: &mut W, text: &str) {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        tracing::warn!(error = %e, "failed to write build logs");
    }
}
