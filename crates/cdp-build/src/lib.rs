//! Local build support for cdp.
//!
//! # Docker path
//!
//! ```text
//! cdp deploy (docker)
//!   1. Detect      ── detect::detect() → FrameworkInfo
//!   2. Dockerfile  ── project Dockerfile, else DockerfileGenerator → Dockerfile.cdp
//!   3. Build       ── docker build --platform … -f <file> .
//!   4. Cleanup     ── TempDockerfile dropped, Dockerfile.cdp removed
//! ```
//!
//! The git path only uses [`detect`] and [`readme`]; Coolify builds the
//! image itself from the pushed repository.

pub mod detect;
pub mod dockerfile;
pub mod readme;
pub mod tag;

pub use detect::detect;
pub use dockerfile::{DockerfileGenerator, TempDockerfile};
