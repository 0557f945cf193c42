//! Build trigger dispatch for content changes.
//!
//! Turns a [`ChangeEvent`] into an optional git commit/push of the changed
//! file followed by concurrent POSTs to every configured build webhook.

pub mod dispatcher;
pub mod event;
pub mod git;
pub mod webhook;

pub use dispatcher::{BuildDispatcher, BuildTrigger, DispatchError, DispatchSummary, DispatcherConfig};
pub use event::{ChangeEvent, ChangeType};
pub use git::{AutoCommit, CommitOutcome, GitCli, GitError, VersionControl};
pub use webhook::{BuildService, BuildWebhookConfig};
