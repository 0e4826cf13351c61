use cdp_cloud::health::{self, CheckResult, HealthReport};
use cdp_cloud::{DockerClient, GitClient};
use cdp_core::{GlobalConfig, ProjectStore};

pub async fn health() -> anyhow::Result<()> {
    let dir = super::project_dir()?;
    let global = GlobalConfig::load()?;

    let mut report = HealthReport {
        project: project_check(&ProjectStore::new(&dir)),
        ..HealthReport::default()
    };

    report.coolify = if global.is_logged_in() {
        let client = super::coolify_client(&global)?;
        health::check_coolify(&client, &global.coolify_url).await
    } else {
        CheckResult::fail("not logged in; run `cdp login`")
    };
    let github = super::github_client(&global)?;
    report.github = health::check_github(github.as_ref()).await;
    report.docker = health::check_docker(
        &DockerClient::new(false),
        global.docker_registry.as_ref().map(|r| r.url.as_str()),
    )
    .await;
    report.git = health::check_git(&GitClient::new(&dir)).await;

    for (name, check) in report.rows() {
        println!("[{}] {name:<8} {}", check.icon(), check.detail);
    }

    if !report.all_passed() {
        anyhow::bail!("some required checks failed");
    }
    Ok(())
}

fn project_check(store: &ProjectStore) -> CheckResult {
    match store.load() {
        Ok(Some(config)) if config.has_application() => {
            CheckResult::ok(&format!("{} ({}), deployed", config.name, config.method.kind()))
        }
        Ok(Some(config)) => {
            CheckResult::ok(&format!("{} ({}), not deployed yet", config.name, config.method.kind()))
        }
        Ok(None) => CheckResult::ok("no cdp.json; `cdp` will run setup"),
        Err(e) => CheckResult::fail(&format!("{e}")),
    }
}
