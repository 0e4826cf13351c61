use cdp_core::ProjectStore;
use cdp_deploy::Prompter;
use cdp_deploy::teardown::{self, LOCAL_ARTIFACTS, RetryPolicy};

use crate::ui::{TerminalPrompter, create_spinner};

pub async fn reset(yes: bool) -> anyhow::Result<()> {
    let dir = super::project_dir()?;
    let store = ProjectStore::new(&dir);
    let config = super::load_project(&store)?;

    if !yes && !confirmed(&TerminalPrompter::default(), &config.name)? {
        println!("Aborted; nothing was deleted");
        return Ok(());
    }

    let global = super::load_global()?;
    let client = super::coolify_client(&global)?;
    let github = super::github_client(&global)?;

    let spinner = create_spinner("Deleting Coolify resources...");
    let report =
        teardown::delete_remote(&client, github.as_ref(), &config, RetryPolicy::default()).await;
    spinner.finish_and_clear();

    for (name, outcome) in report.rows() {
        println!("{name:<18} {outcome}");
    }
    let local = teardown::delete_local(&dir);
    for (path, outcome) in &local {
        println!("{:<18} {outcome}", path.display());
    }

    if report.has_failures() || local.iter().any(|(_, outcome)| outcome.is_failure()) {
        anyhow::bail!("reset incomplete; remove the remaining resources in Coolify or GitHub by hand");
    }
    println!("Reset {}", config.name);
    Ok(())
}

fn confirmed<P: Prompter>(prompter: &P, name: &str) -> anyhow::Result<bool> {
    println!("This permanently deletes:");
    println!("  - the Coolify application and project for {name}");
    println!("  - the GitHub repository, if cdp created one");
    println!("  - local {}", LOCAL_ARTIFACTS.join(", "));
    if !prompter.confirm("Continue?", false)? {
        return Ok(false);
    }
    let typed = prompter.input(&format!("Type {name} to confirm"), "")?;
    Ok(typed.trim() == name)
}
