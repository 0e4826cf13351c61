use anyhow::Context;
use cdp_cloud::coolify::normalize_base_url;
use cdp_cloud::{CodeHost, ControlPlane, CoolifyClient, DockerClient, GitHubClient};
use cdp_core::{DockerRegistry, GlobalConfig};
use cdp_deploy::Prompter;
use secrecy::ExposeSecret;

use super::copy_secret;
use crate::ui::{TerminalPrompter, create_spinner};

const DEFAULT_REGISTRY: &str = "ghcr.io";

pub async fn login(url: Option<String>) -> anyhow::Result<()> {
    let prompter = TerminalPrompter::default();
    let mut global = GlobalConfig::load()?;

    let url = match url {
        Some(url) => url,
        None => prompter.input("Coolify URL", &global.coolify_url)?,
    };
    let url = normalize_base_url(url.trim());
    if url.is_empty() {
        anyhow::bail!("a Coolify URL is required");
    }
    let token = prompter.password("Coolify API token")?;
    if token.expose_secret().trim().is_empty() {
        anyhow::bail!("an API token is required; create one under Keys & Tokens in Coolify");
    }

    let client = CoolifyClient::new(&url, copy_secret(&token))?;
    let spinner = create_spinner("Connecting to Coolify...");
    let version = client.version().await;
    spinner.finish_and_clear();
    let version = version.with_context(|| format!("could not log in to {url}"))?;
    println!("Connected to Coolify v{version}");

    global.coolify_url = url;
    global.coolify_token = Some(token);

    if prompter.confirm("Configure a GitHub token for git-based deploys?", global.has_github())? {
        let token = prompter.password("GitHub token (repo and delete_repo scopes)")?;
        let user = GitHubClient::new(copy_secret(&token))?
            .user()
            .await
            .context("GitHub rejected the token")?;
        println!("GitHub: logged in as {}", user.login);
        global.github_token = Some(token);
    }

    if prompter.confirm(
        "Configure a Docker registry for image-based deploys?",
        global.docker_registry.is_some(),
    )? {
        let registry_url = prompter.input("Registry", DEFAULT_REGISTRY)?;
        let username = prompter.input("Registry username", "")?;
        let password = prompter.password("Registry password or token")?;
        DockerClient::new(false)
            .login(&registry_url, &username, &password)
            .await
            .context("docker login failed")?;
        println!("Docker: logged in to {registry_url}");
        global.docker_registry = Some(DockerRegistry {
            url: registry_url,
            username,
            password,
        });
    }

    match client.list_servers().await {
        Ok(servers) if servers.len() > 1 => {
            let labels: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
            let current = servers
                .iter()
                .position(|s| s.uuid == global.default_server)
                .unwrap_or(0);
            let index = prompter.select("Default server", &labels, current)?;
            if let Some(server) = servers.get(index) {
                global.default_server = server.uuid.clone();
            }
        }
        Ok(servers) => {
            if let Some(server) = servers.first() {
                global.default_server = server.uuid.clone();
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not list servers; no default server set"),
    }

    global.save()?;
    println!("Saved credentials to {}", GlobalConfig::default_path()?.display());
    Ok(())
}

pub fn logout() -> anyhow::Result<()> {
    GlobalConfig::clear()?;
    println!("Logged out");
    Ok(())
}
