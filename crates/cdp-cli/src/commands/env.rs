use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use cdp_cloud::coolify::{EnvVar, NewEnvVar};
use cdp_cloud::{ControlPlane, CoolifyClient};
use cdp_core::ProjectStore;

struct Target {
    client: CoolifyClient,
    app_uuid: String,
}

fn target() -> anyhow::Result<Target> {
    let store = ProjectStore::new(super::project_dir()?);
    let config = super::load_project(&store)?;
    let app_uuid = super::require_app(&config)?.to_owned();
    let client = super::coolify_client(&super::load_global()?)?;
    Ok(Target { client, app_uuid })
}

/// Production variables only; preview copies are managed by Coolify.
async fn production_vars(target: &Target) -> anyhow::Result<Vec<EnvVar>> {
    let vars = target
        .client
        .list_envs(&target.app_uuid)
        .await
        .context("failed to list environment variables")?;
    Ok(vars.into_iter().filter(|v| !v.is_preview).collect())
}

pub async fn env_ls() -> anyhow::Result<()> {
    let target = target()?;
    let vars = production_vars(&target).await?;
    if vars.is_empty() {
        println!("No environment variables");
        return Ok(());
    }
    for var in &vars {
        let marker = if var.is_build_time { "  (build)" } else { "" };
        println!("{}={}{marker}", var.key, var.value);
    }
    Ok(())
}

pub async fn env_add(key_value: &str, build_time: bool) -> anyhow::Result<()> {
    let (key, value) = parse_key_value(key_value)?;
    let target = target()?;

    let existing = production_vars(&target).await?;
    delete_key(&target, &existing, key).await?;
    create(&target, key, value, build_time).await?;

    println!("Set {key}. Redeploy with `cdp deploy` to apply it.");
    Ok(())
}

pub async fn env_rm(key: &str) -> anyhow::Result<()> {
    let target = target()?;
    let existing = production_vars(&target).await?;
    if !existing.iter().any(|v| v.key == key) {
        anyhow::bail!("no variable named {key}");
    }
    delete_key(&target, &existing, key).await?;
    println!("Removed {key}");
    Ok(())
}

pub async fn env_pull(file: &str) -> anyhow::Result<()> {
    let target = target()?;
    let vars = production_vars(&target).await?;

    let mut content = String::new();
    for var in &vars {
        content.push_str(&format_line(&var.key, &var.value));
        content.push('\n');
    }
    std::fs::write(file, content).with_context(|| format!("failed to write {file}"))?;
    println!("Wrote {} variables to {file}", vars.len());
    Ok(())
}

pub async fn env_push(file: &str) -> anyhow::Result<()> {
    let incoming = read_env_file(Path::new(file))?;
    let target = target()?;
    let existing = production_vars(&target).await?;

    let current: BTreeMap<&str, &str> = existing
        .iter()
        .map(|v| (v.key.as_str(), v.value.as_str()))
        .collect();
    let mut changed = 0;
    for (key, value) in &incoming {
        if current.get(key.as_str()) == Some(&value.as_str()) {
            continue;
        }
        let build_time = existing
            .iter()
            .any(|v| v.key == *key && v.is_build_time);
        delete_key(&target, &existing, key).await?;
        create(&target, key, value, build_time).await?;
        changed += 1;
    }

    println!(
        "Pushed {file}: {changed} changed, {} unchanged",
        incoming.len() - changed
    );
    Ok(())
}

async fn create(target: &Target, key: &str, value: &str, build_time: bool) -> anyhow::Result<()> {
    let env = NewEnvVar {
        key: key.to_owned(),
        value: value.to_owned(),
        is_build_time: build_time,
        is_preview: false,
    };
    target
        .client
        .create_env(&target.app_uuid, &env)
        .await
        .with_context(|| format!("failed to set {key}"))?;
    Ok(())
}

async fn delete_key(target: &Target, existing: &[EnvVar], key: &str) -> anyhow::Result<()> {
    for var in existing.iter().filter(|v| v.key == key) {
        target
            .client
            .delete_env(&target.app_uuid, &var.uuid)
            .await
            .with_context(|| format!("failed to remove {key}"))?;
    }
    Ok(())
}

fn parse_key_value(key_value: &str) -> anyhow::Result<(&str, &str)> {
    let (key, value) = key_value
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE format"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("variable name is empty");
    }
    Ok((key, value))
}

/// Variables in file order; a later duplicate wins.
fn read_env_file(path: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut vars: Vec<(String, String)> = Vec::new();
    for item in iter {
        let (key, value) = item.with_context(|| format!("failed to parse {}", path.display()))?;
        vars.retain(|(k, _)| *k != key);
        vars.push((key, value));
    }
    Ok(vars)
}

/// `KEY=value`, double-quoted when the value would not survive unquoted.
fn format_line(key: &str, value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@,+".contains(c));
    if plain {
        return format!("{key}={value}");
    }
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '$' => escaped.push_str("\\$"),
            c => escaped.push(c),
        }
    }
    format!("{key}=\"{escaped}\"")
}
