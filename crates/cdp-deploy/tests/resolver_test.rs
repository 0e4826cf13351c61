mod common;

use cdp_cloud::coolify::{Environment, Project};
use cdp_deploy::{ResolveError, resolve};
use common::{MemoryStore, MockCoolify, created, git_config, status};
use mockall::Sequence;

fn project(envs: &[(&str, &str)]) -> Project {
    Project {
        uuid: "proj-1".to_owned(),
        name: "site".to_owned(),
        environments: envs
            .iter()
            .map(|(uuid, name)| Environment {
                uuid: (*uuid).to_owned(),
                name: (*name).to_owned(),
            })
            .collect(),
        ..Project::default()
    }
}

#[tokio::test]
async fn creates_project_and_adopts_auto_created_environment() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_create_project()
        .withf(|name, description| name == "site" && description == "Created by cdp")
        .times(1)
        .returning(|_, _| Ok(created("proj-1")));
    coolify
        .expect_get_project()
        .times(1)
        .returning(|_| Ok(project(&[("env-9", "Production")])));
    coolify.expect_create_environment().never();

    let store = MemoryStore::default();
    let mut config = git_config("site");
    resolve(&coolify, &store, &mut config).await.unwrap();

    assert_eq!(config.project_uuid, "proj-1");
    assert_eq!(config.environment_uuid, "env-9");
    // Once after the project, once after the environment.
    assert_eq!(store.saves(), 2);
    assert_eq!(store.last().unwrap(), config);
}

#[tokio::test]
async fn creates_missing_environment_once() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_get_project()
        .times(1)
        .returning(|_| Ok(project(&[("env-s", "staging")])));
    coolify
        .expect_create_environment()
        .withf(|project, name| project == "proj-1" && name == "production")
        .times(1)
        .returning(|_, _| Ok(created("env-1")));

    let store = MemoryStore::default();
    let mut config = git_config("site");
    config.project_uuid = "proj-1".to_owned();
    resolve(&coolify, &store, &mut config).await.unwrap();

    assert_eq!(config.environment_uuid, "env-1");
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn unreadable_stored_project_is_an_error() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_get_project()
        .times(1)
        .returning(|_| Err(status(500)));
    coolify.expect_create_environment().never();

    let store = MemoryStore::default();
    let mut config = git_config("site");
    config.project_uuid = "proj-1".to_owned();
    let err = resolve(&coolify, &store, &mut config).await.unwrap_err();

    assert!(matches!(err, ResolveError::FetchProject { ref project, .. } if project == "proj-1"));
    assert!(config.environment_uuid.is_empty());
    assert_eq!(store.saves(), 0);
}

#[tokio::test]
async fn unreadable_new_project_still_gets_environment() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_create_project()
        .times(1)
        .returning(|_, _| Ok(created("proj-1")));
    coolify
        .expect_get_project()
        .times(1)
        .returning(|_| Err(status(500)));
    coolify
        .expect_create_environment()
        .times(1)
        .returning(|_, _| Ok(created("env-1")));

    let store = MemoryStore::default();
    let mut config = git_config("site");
    resolve(&coolify, &store, &mut config).await.unwrap();

    assert_eq!(config.environment_uuid, "env-1");
    assert_eq!(store.saves(), 2);
}

#[tokio::test]
async fn conflict_adopts_existing_environment() {
    let mut coolify = MockCoolify::new();
    let mut seq = Sequence::new();
    // Stale read: the environment is not listed yet.
    coolify
        .expect_get_project()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(project(&[])));
    coolify
        .expect_create_environment()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(status(409)));
    coolify
        .expect_get_project()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(project(&[("env-7", "production")])));

    let store = MemoryStore::default();
    let mut config = git_config("site");
    config.project_uuid = "proj-1".to_owned();
    resolve(&coolify, &store, &mut config).await.unwrap();

    assert_eq!(config.environment_uuid, "env-7");
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn conflict_without_environment_is_an_error() {
    let mut coolify = MockCoolify::new();
    coolify.expect_get_project().times(2).returning(|_| Ok(project(&[])));
    coolify
        .expect_create_environment()
        .times(1)
        .returning(|_, _| Err(status(409)));

    let store = MemoryStore::default();
    let mut config = git_config("site");
    config.project_uuid = "proj-1".to_owned();
    let err = resolve(&coolify, &store, &mut config).await.unwrap_err();

    assert!(matches!(err, ResolveError::EnvironmentMissing { .. }));
    assert!(config.environment_uuid.is_empty());
    assert_eq!(store.saves(), 0);
}

#[tokio::test]
async fn other_environment_errors_propagate() {
    let mut coolify = MockCoolify::new();
    coolify.expect_get_project().returning(|_| Ok(project(&[])));
    coolify
        .expect_create_environment()
        .times(1)
        .returning(|_, _| Err(status(422)));

    let store = MemoryStore::default();
    let mut config = git_config("site");
    config.project_uuid = "proj-1".to_owned();
    let err = resolve(&coolify, &store, &mut config).await.unwrap_err();

    assert!(matches!(err, ResolveError::CreateEnvironment { .. }));
}

#[tokio::test]
async fn project_failure_saves_nothing() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_create_project()
        .times(1)
        .returning(|_, _| Err(status(500)));

    let store = MemoryStore::default();
    let mut config = git_config("site");
    let err = resolve(&coolify, &store, &mut config).await.unwrap_err();

    assert!(matches!(err, ResolveError::CreateProject { .. }));
    assert_eq!(store.saves(), 0);
}

#[tokio::test]
async fn second_run_makes_no_calls() {
    let mut coolify = MockCoolify::new();
    coolify
        .expect_create_project()
        .times(1)
        .returning(|_, _| Ok(created("proj-1")));
    coolify
        .expect_get_project()
        .times(1)
        .returning(|_| Ok(project(&[])));
    coolify
        .expect_create_environment()
        .times(1)
        .returning(|_, _| Ok(created("env-1")));

    let store = MemoryStore::default();
    let mut config = git_config("site");
    resolve(&coolify, &store, &mut config).await.unwrap();
    let after_first = config.clone();

    // Any further call would exceed the `times(1)` expectations above.
    resolve(&coolify, &store, &mut config).await.unwrap();

    assert_eq!(config, after_first);
    assert_eq!(store.saves(), 2);
}
