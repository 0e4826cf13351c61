//! Deployment orchestration for cdp.
//!
//! ```text
//! cdp deploy
//!   1. Setup      ── setup::run() on first use, writes cdp.json
//!   2. Resolve    ── resolver::resolve() → project + environment exist
//!   3. Dispatch   ── Dispatcher::dispatch() → code or image pushed, one deploy queued
//!   4. Watch      ── watcher::watch() → Verdict
//! ```
//!
//! Every remote collaborator is a trait from `cdp-cloud` or [`Prompter`],
//! so the whole flow runs against mocks in tests.

pub mod dispatcher;
pub mod pipeline;
pub mod prompt;
pub mod resolver;
pub mod rollback;
pub mod setup;
pub mod teardown;
pub mod watcher;

pub use dispatcher::{DispatchError, Dispatched, Dispatcher, Trigger};
pub use pipeline::{DeployError, DeployOutcome};
pub use prompt::{PromptError, Prompter};
pub use resolver::{ResolveError, resolve};
pub use rollback::RollbackError;
pub use setup::SetupError;
pub use watcher::{ReclaimedPolicy, Verdict, WatchPolicy, WatchState};
