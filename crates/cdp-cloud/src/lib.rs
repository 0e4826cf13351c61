//! Clients for everything cdp talks to: the Coolify API, GitHub, and the
//! local `git` and `docker` binaries.
//!
//! Each remote has a trait at its seam ([`ControlPlane`], [`CodeHost`],
//! [`CommandExecutor`]) so the deploy logic can run against mocks.

pub mod coolify;
pub mod docker;
pub mod executor;
pub mod git;
pub mod github;
pub mod health;

pub use coolify::{ApiError, ControlPlane, CoolifyClient};
pub use docker::{DockerClient, DockerError};
pub use executor::{CommandError, CommandExecutor, RealExecutor};
pub use git::{GitClient, GitError};
pub use github::{CodeHost, GitHubClient, GitHubError};
pub use health::{CheckResult, HealthReport};
