//! Change-set deployment.
//!
//! This module provides:
//! - Classification of the existing stack
//! - Change-set naming and request shaping
//! - The [`Deployer`] orchestrator

mod changeset;
mod classify;
mod orchestrator;

pub use changeset::{
    change_set_name, is_no_changes, normalize_capabilities, DEFAULT_CHANGE_SET_PREFIX,
    NO_CHANGES_REASON,
};
pub use classify::{classify, Disposition};
pub use orchestrator::{
    DeployOutcome, DeployRequest, DeploySettings, Deployer, CONFIRM_MESSAGE,
    DEFAULT_CHANGE_SET_POLL_INTERVAL, DEFAULT_STACK_POLL_INTERVAL,
};
