//! Core types and configuration for cdp.
//!
//! This crate defines the per-project `cdp.json` schema ([`ProjectConfig`]),
//! the per-user credentials file ([`GlobalConfig`]), and shared error types.

pub mod config;
pub mod error;
pub mod framework;
mod fs;
pub mod global;

pub use config::{
    ConfigStore, DeployMethod, DeployMethodKind, DockerDeployConfig, GitDeployConfig,
    ProjectConfig, ProjectStore,
};
pub use error::{Error, Result};
pub use framework::FrameworkInfo;
pub use global::{DockerRegistry, GlobalConfig};
