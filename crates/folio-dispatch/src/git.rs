//! Auto-commit of changed files.
//!
//! The commit flow (probe, stage, check, commit, push with one upstream
//! retry) is written against [`VersionControl`] so it can run against a fake
//! in tests. [`GitCli`] is the real implementation and shells out to `git`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::event::ChangeEvent;

/// Errors from version control operations.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("No upstream branch configured")]
    NoUpstream,

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The version control operations auto-commit needs.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Succeeds if the working directory is inside a repository.
    async fn probe_repo(&self) -> Result<(), GitError>;

    /// Stage one path, including deletions.
    async fn stage_file(&self, path: &Path) -> Result<(), GitError>;

    /// Whether the path has anything to commit.
    async fn has_changes(&self, path: &Path) -> Result<bool, GitError>;

    /// Commit only `path`, leaving anything else in the index staged.
    async fn commit(&self, path: &Path, message: &str) -> Result<(), GitError>;

    /// Push the current branch. Returns [`GitError::NoUpstream`] when the
    /// branch has no upstream configured.
    async fn push(&self) -> Result<(), GitError>;

    async fn current_branch(&self) -> Result<String, GitError>;

    async fn push_with_upstream(&self, branch: &str) -> Result<(), GitError>;
}

/// Result of an auto-commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Auto-commit is turned off or the event is not about a markdown file
    Skipped,
    NotARepository,
    NothingToCommit,
    Committed {
        /// Whether the push needed the upstream retry
        set_upstream: bool,
    },
    /// The commit landed locally but could not be pushed
    PushFailed(String),
    Failed(String),
}

/// Commits and pushes the file named by a change event.
///
/// Paths are passed to the [`VersionControl`] relative to its working
/// directory, which is the store directory.
pub struct AutoCommit {
    vcs: Box<dyn VersionControl>,
}

impl AutoCommit {
    pub fn new(vcs: Box<dyn VersionControl>) -> Self {
        Self { vcs }
    }

    /// Run the commit flow for one event. Never fails; problems are logged
    /// and reported in the outcome.
    pub async fn run(&self, event: &ChangeEvent) -> CommitOutcome {
        if !event.is_markdown() {
            return CommitOutcome::Skipped;
        }

        if let Err(e) = self.vcs.probe_repo().await {
            tracing::debug!("Skipping auto-commit: {}", e);
            return CommitOutcome::NotARepository;
        }

        let path = Path::new(&event.file_name);

        if let Err(e) = self.vcs.stage_file(path).await {
            tracing::error!("Auto-commit failed to stage {}: {}", event.file_name, e);
            return CommitOutcome::Failed(e.to_string());
        }

        match self.vcs.has_changes(path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("No changes to commit for {}", event.file_name);
                return CommitOutcome::NothingToCommit;
            }
            Err(e) => {
                tracing::error!("Auto-commit status check failed for {}: {}", event.file_name, e);
                return CommitOutcome::Failed(e.to_string());
            }
        }

        let message = event.commit_message();
        if let Err(e) = self.vcs.commit(path, &message).await {
            tracing::error!("Auto-commit failed for {}: {}", event.file_name, e);
            return CommitOutcome::Failed(e.to_string());
        }
        tracing::info!("Committed: {}", message);

        match self.vcs.push().await {
            Ok(()) => {
                tracing::info!("Pushed auto-commit for {}", event.file_name);
                CommitOutcome::Committed {
                    set_upstream: false,
                }
            }
            Err(GitError::NoUpstream) => self.push_with_upstream(event).await,
            Err(e) => {
                tracing::error!("Failed to push auto-commit for {}: {}", event.file_name, e);
                CommitOutcome::PushFailed(e.to_string())
            }
        }
    }

    async fn push_with_upstream(&self, event: &ChangeEvent) -> CommitOutcome {
        let result = match self.vcs.current_branch().await {
            Ok(branch) => {
                tracing::info!("No upstream configured, pushing with --set-upstream origin {}", branch);
                self.vcs.push_with_upstream(&branch).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("Pushed auto-commit for {}", event.file_name);
                CommitOutcome::Committed { set_upstream: true }
            }
            Err(e) => {
                tracing::error!("Failed to push auto-commit for {}: {}", event.file_name, e);
                CommitOutcome::PushFailed(e.to_string())
            }
        }
    }
}

/// [`VersionControl`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn probe_repo(&self) -> Result<(), GitError> {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .await
            .map(|_| ())
            .map_err(|_| GitError::NotARepository(self.workdir.display().to_string()))
    }

    async fn stage_file(&self, path: &Path) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run(&["add", "-A", "--", &path]).await.map(|_| ())
    }

    async fn has_changes(&self, path: &Path) -> Result<bool, GitError> {
        let path = path.to_string_lossy();
        let status = self.run(&["status", "--porcelain", "--", &path]).await?;
        Ok(!status.trim().is_empty())
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run(&["commit", "-m", message, "--", &path])
            .await
            .map(|_| ())
    }

    async fn push(&self) -> Result<(), GitError> {
        match self.run(&["push"]).await {
            Err(GitError::CommandFailed { stderr, .. }) if is_missing_upstream(&stderr) => {
                Err(GitError::NoUpstream)
            }
            other => other.map(|_| ()),
        }
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        let branch = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok(branch.trim().to_string())
    }

    async fn push_with_upstream(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["push", "--set-upstream", "origin", branch])
            .await
            .map(|_| ())
    }
}

fn is_missing_upstream(stderr: &str) -> bool {
    stderr.contains("has no upstream branch") || stderr.contains("no upstream")
}
