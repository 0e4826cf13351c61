use std::io;

use cdp_cloud::{DockerClient, GitClient};
use cdp_core::ProjectStore;
use cdp_deploy::pipeline::{self, DeployError};
use cdp_deploy::{DispatchError, Dispatcher, ResolveError, Trigger, Verdict, WatchPolicy, setup};
use tokio_util::sync::CancellationToken;

use crate::ui::TerminalPrompter;

pub async fn deploy(verbose: bool, cancel: &CancellationToken) -> anyhow::Result<()> {
    let dir = super::project_dir()?;
    let global = super::load_global()?;
    let coolify = super::coolify_client(&global)?;
    let github = super::github_client(&global)?;
    let store = ProjectStore::new(&dir);
    let prompter = TerminalPrompter::default();
    let git = GitClient::new(&dir);
    let docker = DockerClient::new(verbose);

    let mut config = match store.load()? {
        Some(config) => config,
        None => {
            println!("No cdp.json found. Setting up {}.", dir.display());
            let docker_available = docker.is_available().await;
            let config =
                setup::run(&coolify, &store, &prompter, &global, &dir, docker_available).await?;
            println!("Saved cdp.json");
            config
        }
    };

    let dispatcher = Dispatcher {
        coolify: &coolify,
        github: github.as_ref(),
        git: &git,
        docker: &docker,
        store: &store,
        prompter: &prompter,
        global: &global,
        dir: &dir,
    };
    let policy = WatchPolicy {
        verbose,
        ..WatchPolicy::default()
    };

    println!("Deploying {} ({})", config.name, config.method.kind());
    let mut out = io::stdout();
    let run = pipeline::run(&dispatcher, &mut config, policy, cancel, &mut out);
    let outcome = match run.await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(hint) = next_step(&e) {
                eprintln!("hint: {hint}");
            }
            return Err(e.into());
        }
    };

    if outcome.dispatched.trigger == Trigger::Webhook {
        tracing::debug!("deployment triggered by the push webhook");
    }

    match outcome.verdict {
        Verdict::Succeeded => {
            match &outcome.url {
                Some(url) => println!("Deployed {} to {url}", config.name),
                None => println!("Deployed {}", config.name),
            }
            Ok(())
        }
        Verdict::TimedOut => anyhow::bail!(
            "deployment is still in progress; follow it with `cdp logs` or check `cdp ls`"
        ),
        Verdict::Cancelled => anyhow::bail!(
            "stopped watching; the deployment continues on Coolify, check it with `cdp ls`"
        ),
        Verdict::NoDeployment => anyhow::bail!(
            "Coolify never started a deployment; check the GitHub App webhook or run `cdp deploy` again"
        ),
        verdict => anyhow::bail!("{verdict}; run `cdp logs` for details"),
    }
}

fn next_step(err: &DeployError) -> Option<&'static str> {
    match err {
        DeployError::Resolve(ResolveError::Config(_)) => Some("check that cdp.json is writable"),
        DeployError::Resolve(_) => Some("check the Coolify connection with `cdp health`"),
        DeployError::Dispatch(DispatchError::NoServer) => {
            Some("remove cdp.json and run `cdp` to choose a server")
        }
        DeployError::Dispatch(DispatchError::NoGitHubToken) => {
            Some("add a GitHub token with `cdp login`")
        }
        DeployError::Dispatch(DispatchError::NoGitHubApp) => {
            Some("add a GitHub App under Sources in Coolify, then run `cdp deploy` again")
        }
        DeployError::Dispatch(DispatchError::Docker(_)) => {
            Some("check the docker daemon and registry credentials with `cdp health`")
        }
        DeployError::Dispatch(DispatchError::Coolify { .. }) => {
            Some("check the Coolify connection with `cdp health`")
        }
        _ => None,
    }
}
