//! Deployment orchestrator.
//!
//! Drives one deployment through its change-set lifecycle:
//!
//! 1. classify the current stack (waiting out in-progress operations and
//!    deleting stacks that can only be deleted),
//! 2. create a change set and wait until the service has computed it,
//! 3. present the changes and ask for confirmation,
//! 4. execute the change set and wait for the stack to settle.

use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cloudformation::{
    review_url, Capability, Change, ChangeSetDescription, ChangeSetType, CreateChangeSetInput,
    ExecutionStatus, Parameter, Stack, StackClient, StackOperation, StackOutput, Tag,
};
use crate::error::{DeployError, Error, Result};
use crate::progress::{ProgressContext, ProgressReporter, WaitReason};
use crate::prompt::ConfirmPrompt;

use super::changeset::{
    change_set_name, is_no_changes, normalize_capabilities, DEFAULT_CHANGE_SET_PREFIX,
};
use super::classify::{classify, Disposition};

/// Question asked before a change set is executed.
pub const CONFIRM_MESSAGE: &str = "Deploy?";

/// Default interval between stack status polls.
pub const DEFAULT_STACK_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default interval between change-set status polls.
pub const DEFAULT_CHANGE_SET_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything the orchestrator needs to know about one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Stack name.
    pub stack_name: String,
    /// Raw template body.
    pub template_body: String,
    /// Ordered parameters; duplicates are left for the service to reject.
    pub parameters: Vec<Parameter>,
    /// Capabilities to acknowledge.
    pub capabilities: Vec<Capability>,
    /// Stack tags.
    pub tags: Vec<Tag>,
}

impl DeployRequest {
    /// Creates a request without parameters, capabilities or tags.
    #[must_use]
    pub fn new(stack_name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            template_body: template_body.into(),
            parameters: vec![],
            capabilities: vec![],
            tags: vec![],
        }
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }
}

/// How a deployment ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeployOutcome {
    /// The change set was executed and the stack reached its terminal status.
    Deployed {
        /// Whether the stack was created or updated.
        operation: StackOperation,
        /// Stack outputs after the deployment.
        outputs: Vec<StackOutput>,
    },
    /// The template and parameters match what is deployed.
    NoChanges,
    /// The operator declined the change set.
    Rejected,
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    /// Interval between stack status polls.
    pub stack_poll_interval: Duration,
    /// Interval between change-set status polls.
    pub change_set_poll_interval: Duration,
    /// Prefix for generated change-set names.
    pub change_set_prefix: String,
    /// Region used to build console review links; no link without it.
    pub console_region: Option<String>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            stack_poll_interval: DEFAULT_STACK_POLL_INTERVAL,
            change_set_poll_interval: DEFAULT_CHANGE_SET_POLL_INTERVAL,
            change_set_prefix: String::from(DEFAULT_CHANGE_SET_PREFIX),
            console_region: None,
        }
    }
}

/// Stack state once it is ready for a change set.
struct Prepared {
    change_set_type: ChangeSetType,
    snapshot: Option<Stack>,
}

/// Drives change-set deployments.
#[derive(Debug)]
pub struct Deployer<C, R, P> {
    /// Remote stack client.
    client: C,
    /// Progress reporter.
    reporter: R,
    /// Confirmation prompt.
    prompt: P,
    /// Tuning.
    settings: DeploySettings,
}

impl<C, R, P> Deployer<C, R, P>
where
    C: StackClient,
    R: ProgressReporter,
    P: ConfirmPrompt,
{
    /// Creates a deployer with default settings.
    #[must_use]
    pub fn new(client: C, reporter: R, prompt: P) -> Self {
        Self {
            client,
            reporter,
            prompt,
            settings: DeploySettings::default(),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: DeploySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the reporter, e.g. to inspect what it recorded.
    #[must_use]
    pub const fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Runs one deployment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deploy`] when the stack or change set ends up in a
    /// state the deployment cannot continue from, and passes remote and
    /// reporter failures through unchanged.
    pub async fn deploy(&mut self, request: &DeployRequest) -> Result<DeployOutcome> {
        info!("Deploying stack {}", request.stack_name);

        let prepared = self.prepare_stack(&request.stack_name).await?;
        self.run_change_set(request, prepared).await
    }

    /// Classifies the stack until it is ready for a change set.
    async fn prepare_stack(&mut self, stack_name: &str) -> Result<Prepared> {
        loop {
            let stack = self.client.describe_stack(stack_name).await?;

            match classify(stack.as_ref())? {
                Disposition::Fresh => {
                    return Ok(Prepared {
                        change_set_type: ChangeSetType::Create,
                        snapshot: stack,
                    });
                }
                Disposition::Existing => {
                    return Ok(Prepared {
                        change_set_type: ChangeSetType::Update,
                        snapshot: stack,
                    });
                }
                Disposition::Dead => {
                    let stack = stack
                        .ok_or_else(|| Error::internal("dead stack without a snapshot"))?;
                    self.replace_dead_stack(&stack).await?;
                    return Ok(Prepared {
                        change_set_type: ChangeSetType::Create,
                        snapshot: None,
                    });
                }
                Disposition::Busy => {
                    info!("Stack {stack_name} has an operation in progress, waiting for it to finish");
                    self.wait_for_stack(stack_name, stack_name, WaitReason::InProgressExisting)
                        .await?;
                }
            }
        }
    }

    /// Deletes a stack that can only be deleted and waits for the deletion.
    async fn replace_dead_stack(&mut self, stack: &Stack) -> Result<()> {
        warn!(
            "Stack {} is in status {} and must be deleted before it can be created again",
            stack.stack_name, stack.status
        );

        info!("Deleting stack {}", stack.stack_name);
        self.client.delete_stack(&stack.stack_name).await?;

        // Poll by id: by name, a deleted stack simply stops existing.
        let deleted = self
            .wait_for_stack(&stack.stack_id, &stack.stack_name, WaitReason::DeleteExisting)
            .await?;

        match deleted {
            None => Ok(()),
            Some(s) if s.status == StackOperation::Delete.complete_status() => Ok(()),
            Some(s) => Err(DeployError::InvalidCompletionStatus {
                operation: StackOperation::Delete,
                stack: Some(Box::new(s)),
            }
            .into()),
        }
    }

    /// Creates, reviews and (if confirmed) executes the change set.
    async fn run_change_set(
        &mut self,
        request: &DeployRequest,
        prepared: Prepared,
    ) -> Result<DeployOutcome> {
        let stack_name = request.stack_name.as_str();
        let change_set_type = prepared.change_set_type;
        let name = change_set_name(&self.settings.change_set_prefix, Utc::now());

        let input = CreateChangeSetInput {
            stack_name: stack_name.to_string(),
            change_set_name: name.clone(),
            change_set_type,
            template_body: request.template_body.clone(),
            parameters: request.parameters.clone(),
            capabilities: normalize_capabilities(&request.capabilities),
            tags: request.tags.clone(),
        };

        info!(
            "Creating {} change set {name} for stack {stack_name}",
            change_set_type.operation()
        );
        let ids = self.client.create_change_set(&input).await?;

        if let Some(region) = &self.settings.console_region {
            info!("Review: {}", review_url(region, &ids.stack_id, &ids.id));
        }

        let description = self
            .wait_for_change_set(stack_name, &name, prepared.snapshot.as_ref())
            .await?;

        if description.execution_status != ExecutionStatus::Available {
            let review =
                ProgressContext::new(WaitReason::Review, stack_name, prepared.snapshot.as_ref());
            self.reporter.complete(&review).await?;

            if is_no_changes(description.status_reason.as_deref()) {
                info!("No changes to deploy for stack {stack_name}");
                self.delete_change_set(stack_name, &name).await?;
                return Ok(DeployOutcome::NoChanges);
            }

            return Err(DeployError::ChangeSetNotExecutable {
                status: description.status.as_str().to_string(),
                execution_status: description.execution_status.as_str().to_string(),
                reason: description.status_reason.unwrap_or_default(),
            }
            .into());
        }

        let changes = self.collect_changes(stack_name, &name, description).await?;
        debug!("Change set {name} proposes {} change(s)", changes.len());

        let review = ProgressContext::new(WaitReason::Review, stack_name, prepared.snapshot.as_ref())
            .with_changes(&changes);
        self.reporter.complete(&review).await?;

        if !self.prompt.confirm(CONFIRM_MESSAGE).await? {
            info!("Deployment of stack {stack_name} declined");
            self.delete_change_set(stack_name, &name).await?;
            return Ok(DeployOutcome::Rejected);
        }

        info!("Executing change set {name} on stack {stack_name}");
        self.client.execute_change_set(stack_name, &name).await?;

        let operation = change_set_type.operation();
        let finished = self
            .wait_for_stack(&ids.stack_id, stack_name, WaitReason::Executing)
            .await?;

        match finished {
            Some(stack) if stack.status == operation.complete_status() => {
                info!("Stack {stack_name} reached {}", stack.status);
                Ok(DeployOutcome::Deployed {
                    operation,
                    outputs: stack.outputs,
                })
            }
            other => Err(DeployError::InvalidCompletionStatus {
                operation,
                stack: other.map(Box::new),
            }
            .into()),
        }
    }

    async fn delete_change_set(&self, stack_name: &str, change_set: &str) -> Result<()> {
        info!("Deleting change set {change_set} on stack {stack_name}");
        self.client.delete_change_set(stack_name, change_set).await
    }

    /// Polls the change set until the service has finished computing it.
    async fn wait_for_change_set(
        &mut self,
        stack_name: &str,
        change_set: &str,
        snapshot: Option<&Stack>,
    ) -> Result<ChangeSetDescription> {
        loop {
            let description = self
                .client
                .describe_change_set(stack_name, change_set, None)
                .await?;

            let ctx = ProgressContext::new(WaitReason::Review, stack_name, snapshot);
            self.reporter.progress(&ctx).await?;

            if !description.status.is_creating() {
                debug!(
                    "Change set {change_set} is {} / {}",
                    description.status.as_str(),
                    description.execution_status.as_str()
                );
                return Ok(description);
            }

            tokio::time::sleep(self.settings.change_set_poll_interval).await;
        }
    }

    /// Collects every change, following pagination from the first page.
    async fn collect_changes(
        &self,
        stack_name: &str,
        change_set: &str,
        first: ChangeSetDescription,
    ) -> Result<Vec<Change>> {
        let mut changes = first.changes;
        let mut token = first.next_token;

        while let Some(next) = token {
            let page = self
                .client
                .describe_change_set(stack_name, change_set, Some(next))
                .await?;
            changes.extend(page.changes);
            token = page.next_token;
        }

        Ok(changes)
    }

    /// Polls the stack until its status is no longer `*_IN_PROGRESS`.
    ///
    /// `stack_ref` is what gets described (name or id); `stack_name` is what
    /// the reporter is told. Returns the final snapshot, `None` if the stack
    /// is gone.
    async fn wait_for_stack(
        &mut self,
        stack_ref: &str,
        stack_name: &str,
        reason: WaitReason,
    ) -> Result<Option<Stack>> {
        loop {
            let stack = self.client.describe_stack(stack_ref).await?;

            let ctx = ProgressContext::new(reason, stack_name, stack.as_ref());
            self.reporter.progress(&ctx).await?;

            if !stack.as_ref().is_some_and(Stack::is_in_progress) {
                self.reporter.complete(&ctx).await?;
                return Ok(stack);
            }

            debug!(
                "{reason}: {stack_name} is {}",
                stack.as_ref().map_or("", |s| s.status.as_str())
            );
            tokio::time::sleep(self.settings.stack_poll_interval).await;
        }
    }
}
