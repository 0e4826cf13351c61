#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cdp_cloud::coolify::{
    Application, ApplicationPatch, CreateDockerImageRequest, CreateGitHubAppRequest, Created,
    Deployment, DeploymentDetail, DeploymentTrigger, EnvVar, GitHubApp, NewEnvVar, Project, Server,
};
use cdp_cloud::github::{GitHubUser, Repository};
use cdp_cloud::{ApiError, CodeHost, CommandError, CommandExecutor, ControlPlane, GitHubError};
use cdp_core::{ConfigStore, DeployMethod, GitDeployConfig, ProjectConfig};
use cdp_deploy::{PromptError, Prompter};
use mockall::mock;
use secrecy::SecretString;

mock! {
    pub Coolify {}

    impl ControlPlane for Coolify {
        async fn version(&self) -> Result<String, ApiError>;
        async fn list_servers(&self) -> Result<Vec<Server>, ApiError>;
        async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
        async fn get_project(&self, uuid: &str) -> Result<Project, ApiError>;
        async fn create_project(&self, name: &str, description: &str) -> Result<Created, ApiError>;
        async fn delete_project(&self, uuid: &str) -> Result<(), ApiError>;
        async fn create_environment(&self, project_uuid: &str, name: &str) -> Result<Created, ApiError>;
        async fn list_applications(&self) -> Result<Vec<Application>, ApiError>;
        async fn get_application(&self, uuid: &str) -> Result<Application, ApiError>;
        async fn create_github_app_application(
            &self,
            request: &CreateGitHubAppRequest,
        ) -> Result<Created, ApiError>;
        async fn create_docker_image_application(
            &self,
            request: &CreateDockerImageRequest,
        ) -> Result<Created, ApiError>;
        async fn update_application(&self, uuid: &str, patch: &ApplicationPatch) -> Result<(), ApiError>;
        async fn delete_application(&self, uuid: &str) -> Result<(), ApiError>;
        async fn deploy(&self, app_uuid: &str, force: bool, pr: u32) -> Result<Vec<DeploymentTrigger>, ApiError>;
        async fn list_deployments(&self, app_uuid: &str) -> Result<Vec<Deployment>, ApiError>;
        async fn get_deployment(&self, uuid: &str) -> Result<DeploymentDetail, ApiError>;
        async fn list_github_apps(&self) -> Result<Vec<GitHubApp>, ApiError>;
        async fn list_envs(&self, app_uuid: &str) -> Result<Vec<EnvVar>, ApiError>;
        async fn create_env(&self, app_uuid: &str, env: &NewEnvVar) -> Result<Created, ApiError>;
        async fn delete_env(&self, app_uuid: &str, env_uuid: &str) -> Result<(), ApiError>;
    }
}

mock! {
    pub GitHub {}

    impl CodeHost for GitHub {
        async fn user(&self) -> Result<GitHubUser, GitHubError>;
        async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool, GitHubError>;
        async fn create_repo(
            &self,
            name: &str,
            description: &str,
            private: bool,
        ) -> Result<Repository, GitHubError>;
        async fn delete_repo(&self, owner: &str, name: &str) -> Result<(), GitHubError>;
    }
}

pub fn status(code: u16) -> ApiError {
    ApiError::Status {
        status: code,
        path: "/test".to_owned(),
        body: String::new(),
    }
}

pub fn created(uuid: &str) -> Created {
    Created {
        uuid: uuid.to_owned(),
    }
}

pub fn deployment(uuid: &str, status: &str) -> Deployment {
    Deployment {
        deployment_uuid: uuid.to_owned(),
        status: status.to_owned(),
        ..Deployment::default()
    }
}

pub fn application(status: &str) -> Application {
    Application {
        uuid: "app-1".to_owned(),
        status: status.to_owned(),
        ..Application::default()
    }
}

pub fn trigger(app: &str) -> Vec<DeploymentTrigger> {
    vec![DeploymentTrigger {
        message: "Application queued.".to_owned(),
        resource_uuid: app.to_owned(),
        deployment_uuid: "dep-new".to_owned(),
    }]
}

pub fn git_config(name: &str) -> ProjectConfig {
    ProjectConfig::new(
        name,
        DeployMethod::Git(GitDeployConfig {
            github_repo: name.to_owned(),
            ..GitDeployConfig::default()
        }),
    )
}

/// Records every saved config.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<ProjectConfig>>,
}

impl MemoryStore {
    pub fn saves(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<ProjectConfig> {
        self.saved.lock().unwrap().last().cloned()
    }
}

impl ConfigStore for MemoryStore {
    fn save(&self, config: &ProjectConfig) -> cdp_core::Result<()> {
        self.saved.lock().unwrap().push(config.clone());
        Ok(())
    }
}

/// One scripted answer for [`ScriptedPrompter`].
#[derive(Debug, Clone)]
pub enum Answer {
    Select(usize),
    Input(&'static str),
    Confirm(bool),
}

/// Replays answers in order and records the questions asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::default(),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, prompt: &str) -> Answer {
        self.asked.lock().unwrap().push(prompt.to_owned());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {prompt}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, prompt: &str, _items: &[String], _default: usize) -> Result<usize, PromptError> {
        match self.next(prompt) {
            Answer::Select(index) => Ok(index),
            other => panic!("expected select for {prompt}, got {other:?}"),
        }
    }

    fn input(&self, prompt: &str, default: &str) -> Result<String, PromptError> {
        match self.next(prompt) {
            Answer::Input("") => Ok(default.to_owned()),
            Answer::Input(text) => Ok(text.to_owned()),
            other => panic!("expected input for {prompt}, got {other:?}"),
        }
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(prompt) {
            Answer::Confirm(yes) => Ok(yes),
            other => panic!("expected confirm for {prompt}, got {other:?}"),
        }
    }

    fn password(&self, prompt: &str) -> Result<SecretString, PromptError> {
        panic!("unexpected password prompt: {prompt}")
    }
}

/// Answers git and docker commands; `status --porcelain` reports `dirty`.
/// `push` moves the remote branch when the tree was dirty or a local commit
/// is waiting.
///
/// Clones share the call log, so a test can keep one after handing the
/// executor to a client.
#[derive(Clone)]
pub struct FakeExecutor {
    dirty: bool,
    unpushed_commit: bool,
    remote: Option<&'static str>,
    fail_on: Option<&'static str>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeExecutor {
    pub fn new(dirty: bool) -> Self {
        Self {
            dirty,
            unpushed_commit: false,
            remote: None,
            fail_on: None,
            calls: Arc::default(),
        }
    }

    /// A commit that is on the local branch but not on the remote yet.
    pub fn with_unpushed_commit(mut self) -> Self {
        self.unpushed_commit = true;
        self
    }

    pub fn with_remote(mut self, url: &'static str) -> Self {
        self.remote = Some(url);
        self
    }

    /// Fail any command whose arguments contain `word`.
    pub fn failing(mut self, word: &'static str) -> Self {
        self.fail_on = Some(word);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose arguments contain `word`.
    pub fn count(&self, word: &str) -> usize {
        self.calls()
            .iter()
            .filter(|args| args.iter().any(|a| a == word))
            .count()
    }

    fn answer(&self, args: &[String]) -> Result<String, CommandError> {
        self.calls.lock().unwrap().push(args.to_vec());
        let words: Vec<&str> = args.iter().map(String::as_str).collect();
        if let Some(word) = self.fail_on.filter(|w| words.contains(w)) {
            return Err(CommandError::Failed {
                program: "fake".to_owned(),
                args: vec![],
                stderr: format!("{word} failed"),
            });
        }
        if words.contains(&"push") && words.contains(&"--porcelain") {
            let flag = if self.dirty || self.unpushed_commit { ' ' } else { '=' };
            return Ok(format!("{flag}\trefs/heads/main:refs/heads/main\tsummary\nDone\n"));
        }
        if words.contains(&"--porcelain") {
            return Ok(if self.dirty { " M index.html\n" } else { "" }.to_owned());
        }
        if words.contains(&"get-url") {
            return match self.remote {
                Some(url) => Ok(format!("{url}\n")),
                None => Err(CommandError::Failed {
                    program: "git".to_owned(),
                    args: vec![],
                    stderr: "No such remote".to_owned(),
                }),
            };
        }
        if words.contains(&"--show-current") {
            return Ok("main\n".to_owned());
        }
        Ok(String::new())
    }
}

impl CommandExecutor for FakeExecutor {
    async fn exec(&self, _program: &str, args: &[String]) -> Result<String, CommandError> {
        self.answer(args)
    }

    async fn exec_streaming(&self, _program: &str, args: &[String]) -> Result<(), CommandError> {
        self.answer(args).map(|_| ())
    }

    async fn exec_with_stdin(
        &self,
        _program: &str,
        args: &[String],
        _stdin_data: &[u8],
    ) -> Result<String, CommandError> {
        self.answer(args)
    }
}
