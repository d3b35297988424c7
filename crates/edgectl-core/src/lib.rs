//! Version synchronization and safe activation for edgectl.
//!
//! This crate holds the decision logic of the tool: diffing two versions of a
//! service (`DiffEngine`), deciding whether the session may prompt
//! (`InteractionGate`), showing a diff to the operator (`ChangePresenter`),
//! classifying remote validation (`VersionValidator`), the confirm-then-activate
//! sequence (`ActivationWorkflow`), and the push planner that turns a local
//! desired state into a new remote version (`sync`).

pub mod cancel;
pub mod diff;
pub mod gate;
pub mod present;
pub mod prompt;
pub mod service;
pub mod sync;
pub mod validate;
pub mod workflow;

pub use cancel::{install_signal_handler, CancelFlag};
pub use diff::DiffEngine;
pub use gate::InteractionGate;
pub use present::{count_changes, find_pager, ChangePresenter, PagerCommand, PagerSession};
pub use prompt::{Prompter, ScriptedPrompter};
pub use service::{lookup_service, resolve_active_version};
pub use sync::{push_service, PushOutcome, PushReport, ResourceChanges, Snapshot, SyncPlan};
pub use validate::{ValidationOutcome, VersionValidator};
pub use workflow::{diff_url, ActivationOutcome, ActivationWorkflow};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("remote error: {0}")]
    Remote(#[from] edgectl_remote::RemoteError),
    #[error("remote error: {context}: {source}")]
    RemoteContext {
        context: String,
        source: edgectl_remote::RemoteError,
    },
    #[error("in non-interactive shell and --assume-yes not used")]
    NonInteractive,
    #[error("validation failed: version {version} on service {service}:\n{message}")]
    Validation {
        service: String,
        version: u32,
        message: String,
    },
    #[error("unexpected validation status '{status}' for version {version}")]
    UnexpectedValidation { version: u32, status: String },
    #[error("usage: {0}")]
    Usage(String),
    #[error("unable to find the active version for service {0}")]
    NoActiveVersion(String),
    #[error("prompt failed: {0}")]
    Prompt(String),
    #[error("interrupted, version {0} was not activated")]
    Interrupted(u32),
    #[error("config error: {0}")]
    Config(#[from] edgectl_schema::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
