//! CloudFormation integration module.
//!
//! This module provides the remote stack client capability, its AWS SDK
//! implementation, the data types exchanged with the service, and console
//! review links.

mod client;
mod console;
mod types;

pub use client::{CloudFormationClient, StackClient};
pub use console::review_url;
pub use types::{
    Capability, Change, ChangeAction, ChangeSetDescription, ChangeSetIds, ChangeSetStatus,
    ChangeSetType, CreateChangeSetInput, ExecutionStatus, Parameter, Stack, StackEvent,
    StackEventsPage, StackOperation, StackOutput, StackResource, Tag, COMPLETE_SUFFIX,
    IN_PROGRESS_SUFFIX,
};
