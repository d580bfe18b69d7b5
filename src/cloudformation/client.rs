//! Remote stack client.
//!
//! [`StackClient`] is the capability the orchestrator and the progress
//! reporters use to talk to the stack service. [`CloudFormationClient`] is the
//! production implementation on top of `aws-sdk-cloudformation`.

use async_trait::async_trait;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types as sdk;
use aws_sdk_cloudformation::Client;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{Error, RemoteError, Result};

use super::types::{
    Change, ChangeAction, ChangeSetDescription, ChangeSetIds, ChangeSetStatus, ChangeSetType,
    CreateChangeSetInput, ExecutionStatus, Stack, StackEvent, StackEventsPage, StackOutput,
    StackResource,
};

/// Error code the service uses for "stack does not exist" (among others).
const VALIDATION_ERROR_CODE: &str = "ValidationError";

/// Message fragment that identifies a missing stack.
const NOT_FOUND_FRAGMENT: &str = "does not exist";

/// Operations the deployment needs from the stack service.
///
/// Each method maps to exactly one remote call.
#[async_trait]
pub trait StackClient: Send + Sync {
    /// Describes a stack by name or id. Returns `None` if it does not exist.
    async fn describe_stack(&self, stack: &str) -> Result<Option<Stack>>;

    /// Starts deleting a stack.
    async fn delete_stack(&self, stack: &str) -> Result<()>;

    /// Creates a change set.
    async fn create_change_set(&self, input: &CreateChangeSetInput) -> Result<ChangeSetIds>;

    /// Describes one page of a change set.
    async fn describe_change_set(
        &self,
        stack: &str,
        change_set: &str,
        next_token: Option<String>,
    ) -> Result<ChangeSetDescription>;

    /// Starts executing a change set.
    async fn execute_change_set(&self, stack: &str, change_set: &str) -> Result<()>;

    /// Deletes a change set.
    async fn delete_change_set(&self, stack: &str, change_set: &str) -> Result<()>;

    /// Lists the stack's physical resources.
    async fn describe_stack_resources(&self, stack: &str) -> Result<Vec<StackResource>>;

    /// Describes one page of stack events, newest first.
    async fn describe_stack_events(
        &self,
        stack: &str,
        next_token: Option<String>,
    ) -> Result<StackEventsPage>;
}

#[async_trait]
impl<T: StackClient + ?Sized> StackClient for Arc<T> {
    async fn describe_stack(&self, stack: &str) -> Result<Option<Stack>> {
        (**self).describe_stack(stack).await
    }

    async fn delete_stack(&self, stack: &str) -> Result<()> {
        (**self).delete_stack(stack).await
    }

    async fn create_change_set(&self, input: &CreateChangeSetInput) -> Result<ChangeSetIds> {
        (**self).create_change_set(input).await
    }

    async fn describe_change_set(
        &self,
        stack: &str,
        change_set: &str,
        next_token: Option<String>,
    ) -> Result<ChangeSetDescription> {
        (**self)
            .describe_change_set(stack, change_set, next_token)
            .await
    }

    async fn execute_change_set(&self, stack: &str, change_set: &str) -> Result<()> {
        (**self).execute_change_set(stack, change_set).await
    }

    async fn delete_change_set(&self, stack: &str, change_set: &str) -> Result<()> {
        (**self).delete_change_set(stack, change_set).await
    }

    async fn describe_stack_resources(&self, stack: &str) -> Result<Vec<StackResource>> {
        (**self).describe_stack_resources(stack).await
    }

    async fn describe_stack_events(
        &self,
        stack: &str,
        next_token: Option<String>,
    ) -> Result<StackEventsPage> {
        (**self).describe_stack_events(stack, next_token).await
    }
}

/// CloudFormation client backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct CloudFormationClient {
    /// SDK client.
    client: Client,
    /// Resolved region, if any.
    region: Option<String>,
}

impl CloudFormationClient {
    /// Loads AWS configuration from the environment and builds a client.
    ///
    /// `region` and `profile` override the shared configuration when given.
    pub async fn from_env(region: Option<&str>, profile: Option<&str>) -> Self {
        let mut loader = aws_config::from_env();
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        let region = config.region().map(ToString::to_string);
        debug!("CloudFormation client configured for region {region:?}");

        Self {
            client: Client::new(&config),
            region,
        }
    }

    /// The region requests are sent to.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

#[async_trait]
impl StackClient for CloudFormationClient {
    async fn describe_stack(&self, stack: &str) -> Result<Option<Stack>> {
        trace!("DescribeStacks {stack}");

        let output = match self.client.describe_stacks().stack_name(stack).send().await {
            Ok(output) => output,
            Err(err) if is_stack_missing(&err) => {
                debug!("Stack {stack} does not exist");
                return Ok(None);
            }
            Err(err) => return Err(service_error("DescribeStacks", &err)),
        };

        output.stacks().first().map(convert_stack).transpose()
    }

    async fn delete_stack(&self, stack: &str) -> Result<()> {
        self.client
            .delete_stack()
            .stack_name(stack)
            .send()
            .await
            .map_err(|e| service_error("DeleteStack", &e))?;
        Ok(())
    }

    async fn create_change_set(&self, input: &CreateChangeSetInput) -> Result<ChangeSetIds> {
        let parameters = input
            .parameters
            .iter()
            .map(|p| {
                sdk::Parameter::builder()
                    .parameter_key(&p.key)
                    .parameter_value(&p.value)
                    .build()
            })
            .collect();

        let tags = input
            .tags
            .iter()
            .map(|t| {
                sdk::Tag::builder()
                    .key(&t.key)
                    .value(&t.value)
                    .build()
                    .map_err(|e| Error::internal(format!("Invalid tag {}: {e}", t.key)))
            })
            .collect::<Result<Vec<_>>>()?;

        let capabilities = input.capabilities.as_ref().map(|caps| {
            caps.iter()
                .map(|c| sdk::Capability::from(c.as_str()))
                .collect::<Vec<_>>()
        });

        let change_set_type = match input.change_set_type {
            ChangeSetType::Create => sdk::ChangeSetType::Create,
            ChangeSetType::Update => sdk::ChangeSetType::Update,
        };

        let output = self
            .client
            .create_change_set()
            .stack_name(&input.stack_name)
            .change_set_name(&input.change_set_name)
            .change_set_type(change_set_type)
            .template_body(&input.template_body)
            .set_parameters(Some(parameters))
            .set_capabilities(capabilities)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| service_error("CreateChangeSet", &e))?;

        Ok(ChangeSetIds {
            id: required("CreateChangeSet", "Id", output.id())?,
            stack_id: required("CreateChangeSet", "StackId", output.stack_id())?,
        })
    }

    async fn describe_change_set(
        &self,
        stack: &str,
        change_set: &str,
        next_token: Option<String>,
    ) -> Result<ChangeSetDescription> {
        trace!("DescribeChangeSet {stack}/{change_set} token={next_token:?}");

        let output = self
            .client
            .describe_change_set()
            .stack_name(stack)
            .change_set_name(change_set)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| service_error("DescribeChangeSet", &e))?;

        Ok(ChangeSetDescription {
            change_set_id: output.change_set_id().map(String::from),
            stack_id: output.stack_id().map(String::from),
            status: ChangeSetStatus::from(
                output.status().map_or("", sdk::ChangeSetStatus::as_str),
            ),
            execution_status: ExecutionStatus::from(
                output
                    .execution_status()
                    .map_or("", sdk::ExecutionStatus::as_str),
            ),
            status_reason: output.status_reason().map(String::from),
            changes: convert_changes(change_set, output.changes()),
            next_token: output.next_token().map(String::from),
        })
    }

    async fn execute_change_set(&self, stack: &str, change_set: &str) -> Result<()> {
        self.client
            .execute_change_set()
            .stack_name(stack)
            .change_set_name(change_set)
            .send()
            .await
            .map_err(|e| service_error("ExecuteChangeSet", &e))?;
        Ok(())
    }

    async fn delete_change_set(&self, stack: &str, change_set: &str) -> Result<()> {
        self.client
            .delete_change_set()
            .stack_name(stack)
            .change_set_name(change_set)
            .send()
            .await
            .map_err(|e| service_error("DeleteChangeSet", &e))?;
        Ok(())
    }

    async fn describe_stack_resources(&self, stack: &str) -> Result<Vec<StackResource>> {
        let output = self
            .client
            .describe_stack_resources()
            .stack_name(stack)
            .send()
            .await
            .map_err(|e| service_error("DescribeStackResources", &e))?;

        Ok(output
            .stack_resources()
            .iter()
            .map(|r| StackResource {
                logical_id: r.logical_resource_id().to_string(),
                physical_id: r.physical_resource_id().map(String::from),
                resource_type: r.resource_type().to_string(),
                status: r.resource_status().as_str().to_string(),
                status_reason: r.resource_status_reason().map(String::from),
            })
            .collect())
    }

    async fn describe_stack_events(
        &self,
        stack: &str,
        next_token: Option<String>,
    ) -> Result<StackEventsPage> {
        let output = self
            .client
            .describe_stack_events()
            .stack_name(stack)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| service_error("DescribeStackEvents", &e))?;

        let mut events = Vec::with_capacity(output.stack_events().len());
        for event in output.stack_events() {
            match convert_event(event) {
                Some(converted) => events.push(converted),
                None => debug!("Skipping event {} with unrepresentable time", event.event_id()),
            }
        }

        Ok(StackEventsPage {
            events,
            next_token: output.next_token().map(String::from),
        })
    }
}

fn is_stack_missing<E: ProvideErrorMetadata>(err: &E) -> bool {
    err.code() == Some(VALIDATION_ERROR_CODE)
        && err.message().is_some_and(|m| m.contains(NOT_FOUND_FRAGMENT))
}

fn service_error<E: ProvideErrorMetadata + std::fmt::Display>(
    operation: &'static str,
    err: &E,
) -> Error {
    let message = err
        .message()
        .map_or_else(|| err.to_string(), String::from);
    Error::Remote(RemoteError::service(
        operation,
        err.code().map(String::from),
        message,
    ))
}

fn required(operation: &'static str, field: &'static str, value: Option<&str>) -> Result<String> {
    value
        .map(String::from)
        .ok_or(Error::Remote(RemoteError::IncompleteResponse { operation, field }))
}

fn convert_stack(stack: &sdk::Stack) -> Result<Stack> {
    Ok(Stack {
        stack_id: required("DescribeStacks", "StackId", stack.stack_id())?,
        stack_name: stack.stack_name().to_string(),
        status: stack.stack_status().as_str().to_string(),
        status_reason: stack.stack_status_reason().map(String::from),
        outputs: stack
            .outputs()
            .iter()
            .filter_map(|o| {
                Some(StackOutput {
                    key: o.output_key()?.to_string(),
                    value: o.output_value().unwrap_or_default().to_string(),
                    description: o.description().map(String::from),
                })
            })
            .collect(),
    })
}

fn convert_changes(change_set: &str, changes: &[sdk::Change]) -> Vec<Change> {
    let mut converted = Vec::with_capacity(changes.len());
    for change in changes {
        match convert_change(change) {
            Some(c) => converted.push(c),
            None => debug!("Skipping change without resource details in {change_set}"),
        }
    }
    converted
}

fn convert_change(change: &sdk::Change) -> Option<Change> {
    let resource = change.resource_change()?;

    Some(Change {
        logical_id: resource.logical_resource_id().unwrap_or_default().to_string(),
        physical_id: resource.physical_resource_id().map(String::from),
        resource_type: resource.resource_type().unwrap_or_default().to_string(),
        action: ChangeAction::from(resource.action().map_or("", sdk::ChangeAction::as_str)),
        replacement: resource.replacement().map(|r| r.as_str().to_string()),
        scope: resource.scope().iter().map(|s| s.as_str().to_string()).collect(),
        detail_count: resource.details().len(),
    })
}

fn convert_event(event: &sdk::StackEvent) -> Option<StackEvent> {
    let time = event.timestamp();
    let timestamp = chrono::DateTime::from_timestamp(time.secs(), time.subsec_nanos())?;

    Some(StackEvent {
        event_id: event.event_id().to_string(),
        timestamp,
        logical_id: event.logical_resource_id().unwrap_or_default().to_string(),
        resource_type: event.resource_type().unwrap_or_default().to_string(),
        status: event
            .resource_status()
            .map_or("", sdk::ResourceStatus::as_str)
            .to_string(),
        status_reason: event.resource_status_reason().map(String::from),
    })
}
