//! Makes sure the Coolify project and environment behind a `cdp.json` exist.

use cdp_cloud::{ApiError, ControlPlane};
use cdp_core::config::PRODUCTION_ENVIRONMENT;
use cdp_core::{ConfigStore, ProjectConfig};

pub const PROJECT_DESCRIPTION: &str = "Created by cdp";

/// Populate `project_uuid` and `environment_uuid`, creating whatever is
/// missing exactly once.
///
/// The config is saved after every step that changes it, so a failure
/// later on never causes a second create on the next run. Nothing is
/// called when both identifiers are already set.
pub async fn resolve<C, S>(
    client: &C,
    store: &S,
    config: &mut ProjectConfig,
) -> Result<(), ResolveError>
where
    C: ControlPlane,
    S: ConfigStore,
{
    let mut project_created = false;
    if config.project_uuid.is_empty() {
        let created = client
            .create_project(&config.name, PROJECT_DESCRIPTION)
            .await
            .map_err(|e| ResolveError::CreateProject {
                name: config.name.clone(),
                source: e,
            })?;
        config.project_uuid = created.uuid;
        // An environment id without its project is meaningless.
        config.environment_uuid.clear();
        store.save(config)?;
        project_created = true;
    }

    if !config.environment_uuid.is_empty() {
        return Ok(());
    }

    // New projects usually come with a production environment already. A
    // failed read-back of a project created just now falls through to
    // create-or-adopt; any other failed read is an error.
    let existing = match client.get_project(&config.project_uuid).await {
        Ok(project) => project
            .environment(PRODUCTION_ENVIRONMENT)
            .map(|env| env.uuid.clone()),
        Err(e) if project_created => {
            tracing::warn!(
                project = %config.project_uuid,
                error = %e,
                "could not read environments of the new project"
            );
            None
        }
        Err(e) => {
            return Err(ResolveError::FetchProject {
                project: config.project_uuid.clone(),
                source: e,
            });
        }
    };

    config.environment_uuid = match existing {
        Some(uuid) => {
            tracing::debug!(environment = %uuid, "reusing existing environment");
            uuid
        }
        None => create_environment(client, &config.project_uuid).await?,
    };
    store.save(config)?;
    Ok(())
}

/// Create the production environment, adopting it when the name is taken.
async fn create_environment<C: ControlPlane>(
    client: &C,
    project_uuid: &str,
) -> Result<String, ResolveError> {
    let err = match client
        .create_environment(project_uuid, PRODUCTION_ENVIRONMENT)
        .await
    {
        Ok(created) => return Ok(created.uuid),
        Err(e) if e.is_conflict() => e,
        Err(e) => {
            return Err(ResolveError::CreateEnvironment {
                project: project_uuid.to_owned(),
                source: e,
            });
        }
    };

    tracing::info!(project = project_uuid, error = %err, "environment already exists, adopting it");
    let project = client
        .get_project(project_uuid)
        .await
        .map_err(|e| ResolveError::FetchProject {
            project: project_uuid.to_owned(),
            source: e,
        })?;

    project
        .environment(PRODUCTION_ENVIRONMENT)
        .map(|env| env.uuid.clone())
        .ok_or_else(|| ResolveError::EnvironmentMissing {
            project: project_uuid.to_owned(),
            environment: PRODUCTION_ENVIRONMENT.to_owned(),
        })
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to create Coolify project '{name}'")]
    CreateProject { name: String, source: ApiError },

    #[error("failed to create environment in project {project}")]
    CreateEnvironment { project: String, source: ApiError },

    #[error("failed to read project {project}")]
    FetchProject { project: String, source: ApiError },

    #[error("environment '{environment}' reported as existing but not found in project {project}")]
    EnvironmentMissing {
        project: String,
        environment: String,
    },

    #[error(transparent)]
    Config(#[from] cdp_core::Error),
}
