use crate::coolify::ControlPlane;
use crate::docker::DockerClient;
use crate::executor::CommandExecutor;
use crate::git::GitClient;
use crate::github::CodeHost;

/// Result of `cdp health`. Every check runs; nothing returns early.
#[derive(Debug, Default)]
pub struct HealthReport {
    pub coolify: CheckResult,
    pub github: CheckResult,
    pub docker: CheckResult,
    pub git: CheckResult,
    pub project: CheckResult,
}

impl HealthReport {
    /// Coolify and the project config must pass; GitHub and Docker are
    /// optional and only need to pass for their deploy method.
    pub fn all_passed(&self) -> bool {
        self.coolify.passed && self.project.passed
    }

    pub fn rows(&self) -> [(&'static str, &CheckResult); 5] {
        [
            ("Coolify", &self.coolify),
            ("GitHub", &self.github),
            ("Docker", &self.docker),
            ("git", &self.git),
            ("Project", &self.project),
        ]
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

pub async fn check_coolify<C: ControlPlane>(client: &C, url: &str) -> CheckResult {
    match client.version().await {
        Ok(version) => CheckResult::ok(&format!("{url} (v{version})")),
        Err(e) if e.is_unauthorized() => CheckResult::fail("token rejected; run `cdp login`"),
        Err(e) => CheckResult::fail(&format!("{url} unreachable: {e}")),
    }
}

/// `None` when no GitHub token is configured.
pub async fn check_github<H: CodeHost>(host: Option<&H>) -> CheckResult {
    let Some(host) = host else {
        return CheckResult::fail("not configured");
    };
    match host.user().await {
        Ok(user) => CheckResult::ok(&format!("logged in as {}", user.login)),
        Err(e) => CheckResult::fail(&e.to_string()),
    }
}

pub async fn check_docker<E: CommandExecutor>(
    docker: &DockerClient<E>,
    registry: Option<&str>,
) -> CheckResult {
    if !docker.is_available().await {
        return CheckResult::fail("docker daemon not reachable");
    }
    match registry {
        Some(url) => CheckResult::ok(&format!("available, registry {url}")),
        None => CheckResult::ok("available, no registry configured"),
    }
}

pub async fn check_git<E: CommandExecutor>(git: &GitClient<E>) -> CheckResult {
    if !git.is_available().await {
        return CheckResult::fail("git not found");
    }
    if git.is_repo() {
        CheckResult::ok("repository initialized")
    } else {
        CheckResult::ok("available, no repository yet")
    }
}
