//! End-to-end deployment scenarios against a scripted in-memory stack service.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stackdeploy::cloudformation::{
    Capability, Change, ChangeAction, ChangeSetDescription, ChangeSetIds, ChangeSetStatus,
    ChangeSetType, CreateChangeSetInput, ExecutionStatus, Parameter, Stack, StackClient,
    StackEventsPage, StackOperation, StackOutput, StackResource, Tag,
};
use stackdeploy::deploy::{
    DeployOutcome, DeployRequest, DeploySettings, Deployer, NO_CHANGES_REASON,
};
use stackdeploy::error::{DeployError, Error, Result};
use stackdeploy::progress::{ProgressContext, ProgressReporter, WaitReason};
use stackdeploy::prompt::{AutoApprove, FnPrompt};

const STACK_NAME: &str = "orders-api";
const STACK_ID: &str = "arn:aws:cloudformation:eu-west-1:123456789012:stack/orders-api/1";
const NEW_STACK_ID: &str = "arn:aws:cloudformation:eu-west-1:123456789012:stack/orders-api/2";
const CHANGE_SET_ID: &str = "arn:aws:cloudformation:eu-west-1:123456789012:changeSet/cs/1";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    DescribeStack(String),
    DeleteStack(String),
    CreateChangeSet(CreateChangeSetInput),
    DescribeChangeSet(Option<String>),
    ExecuteChangeSet,
    DeleteChangeSet,
}

/// Replays scripted answers and records every call.
struct ScriptedService {
    stacks: Mutex<VecDeque<Option<Stack>>>,
    change_sets: Mutex<VecDeque<ChangeSetDescription>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedService {
    fn new(stacks: Vec<Option<Stack>>, change_sets: Vec<ChangeSetDescription>) -> Arc<Self> {
        Arc::new(Self {
            stacks: Mutex::new(stacks.into()),
            change_sets: Mutex::new(change_sets.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    fn created(&self) -> Vec<CreateChangeSetInput> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateChangeSet(input) => Some(input),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StackClient for ScriptedService {
    async fn describe_stack(&self, stack: &str) -> Result<Option<Stack>> {
        self.record(Call::DescribeStack(stack.to_string()));
        let mut stacks = self.stacks.lock().expect("lock");
        let next = if stacks.len() > 1 {
            stacks.pop_front()
        } else {
            stacks.front().cloned()
        };
        Ok(next.flatten())
    }

    async fn delete_stack(&self, stack: &str) -> Result<()> {
        self.record(Call::DeleteStack(stack.to_string()));
        Ok(())
    }

    async fn create_change_set(&self, input: &CreateChangeSetInput) -> Result<ChangeSetIds> {
        self.record(Call::CreateChangeSet(input.clone()));
        Ok(ChangeSetIds {
            id: String::from(CHANGE_SET_ID),
            stack_id: String::from(NEW_STACK_ID),
        })
    }

    async fn describe_change_set(
        &self,
        _stack: &str,
        _change_set: &str,
        next_token: Option<String>,
    ) -> Result<ChangeSetDescription> {
        self.record(Call::DescribeChangeSet(next_token));
        self.change_sets
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or_else(|| Error::internal("change set script exhausted"))
    }

    async fn execute_change_set(&self, _stack: &str, _change_set: &str) -> Result<()> {
        self.record(Call::ExecuteChangeSet);
        Ok(())
    }

    async fn delete_change_set(&self, _stack: &str, _change_set: &str) -> Result<()> {
        self.record(Call::DeleteChangeSet);
        Ok(())
    }

    async fn describe_stack_resources(&self, _stack: &str) -> Result<Vec<StackResource>> {
        Ok(vec![])
    }

    async fn describe_stack_events(
        &self,
        _stack: &str,
        _next_token: Option<String>,
    ) -> Result<StackEventsPage> {
        Ok(StackEventsPage::default())
    }
}

/// One reporter callback.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Report {
    reason: WaitReason,
    done: bool,
    status: Option<String>,
    changes: Option<usize>,
}

#[derive(Debug, Default)]
struct RecordingReporter {
    reports: Vec<Report>,
}

impl RecordingReporter {
    fn push(&mut self, ctx: &ProgressContext<'_>, done: bool) {
        self.reports.push(Report {
            reason: ctx.reason,
            done,
            status: ctx.stack.map(|s| s.status.clone()),
            changes: ctx.changes.map(<[Change]>::len),
        });
    }

    fn completions(&self, reason: WaitReason) -> Vec<&Report> {
        self.reports
            .iter()
            .filter(|r| r.done && r.reason == reason)
            .collect()
    }
}

#[async_trait]
impl ProgressReporter for RecordingReporter {
    async fn progress(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        self.push(ctx, false);
        Ok(())
    }

    async fn complete(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        self.push(ctx, true);
        Ok(())
    }
}

fn stack(id: &str, status: &str) -> Option<Stack> {
    Some(Stack {
        stack_id: id.to_string(),
        stack_name: String::from(STACK_NAME),
        status: status.to_string(),
        status_reason: None,
        outputs: vec![],
    })
}

fn with_outputs(mut stack: Option<Stack>, outputs: &[(&str, &str)]) -> Option<Stack> {
    if let Some(s) = stack.as_mut() {
        s.outputs = outputs
            .iter()
            .map(|(k, v)| StackOutput {
                key: (*k).to_string(),
                value: (*v).to_string(),
                description: None,
            })
            .collect();
    }
    stack
}

fn change(logical_id: &str, action: ChangeAction) -> Change {
    Change {
        logical_id: logical_id.to_string(),
        physical_id: None,
        resource_type: String::from("AWS::SQS::Queue"),
        action,
        replacement: None,
        scope: vec![],
        detail_count: 0,
    }
}

fn pending() -> ChangeSetDescription {
    page(ChangeSetStatus::CreatePending, ExecutionStatus::Unavailable, None, vec![], None)
}

fn ready(changes: Vec<Change>, next_token: Option<&str>) -> ChangeSetDescription {
    page(
        ChangeSetStatus::CreateComplete,
        ExecutionStatus::Available,
        None,
        changes,
        next_token,
    )
}

fn page(
    status: ChangeSetStatus,
    execution_status: ExecutionStatus,
    reason: Option<&str>,
    changes: Vec<Change>,
    next_token: Option<&str>,
) -> ChangeSetDescription {
    ChangeSetDescription {
        change_set_id: Some(String::from(CHANGE_SET_ID)),
        stack_id: Some(String::from(NEW_STACK_ID)),
        status,
        execution_status,
        status_reason: reason.map(String::from),
        changes,
        next_token: next_token.map(String::from),
    }
}

fn settings() -> DeploySettings {
    DeploySettings {
        stack_poll_interval: Duration::ZERO,
        change_set_poll_interval: Duration::ZERO,
        ..DeploySettings::default()
    }
}

fn request() -> DeployRequest {
    DeployRequest::new(STACK_NAME, "Resources: {}")
}

#[tokio::test]
async fn fresh_stack_is_created_and_outputs_returned() {
    let service = ScriptedService::new(
        vec![
            None,
            stack(NEW_STACK_ID, "CREATE_IN_PROGRESS"),
            with_outputs(stack(NEW_STACK_ID, "CREATE_COMPLETE"), &[("QueueUrl", "https://sqs/q")]),
        ],
        vec![
            pending(),
            ready(
                vec![change("Queue", ChangeAction::Add), change("Dlq", ChangeAction::Add)],
                None,
            ),
        ],
    );

    let request = request()
        .with_parameters(vec![Parameter::new("Environment", "prod")])
        .with_tags(vec![Tag::new("team", "platform")]);
    let mut deployer = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings());
    let outcome = deployer.deploy(&request).await.expect("deploy");

    assert_eq!(
        outcome,
        DeployOutcome::Deployed {
            operation: StackOperation::Create,
            outputs: vec![StackOutput {
                key: String::from("QueueUrl"),
                value: String::from("https://sqs/q"),
                description: None,
            }],
        }
    );

    let created = service.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].change_set_type, ChangeSetType::Create);
    assert!(created[0].change_set_name.starts_with("stackdeploy-"));
    assert_eq!(created[0].parameters, vec![Parameter::new("Environment", "prod")]);
    assert_eq!(created[0].tags, vec![Tag::new("team", "platform")]);
    assert_eq!(service.count(|c| matches!(c, Call::DeleteStack(_))), 0);
    assert_eq!(service.count(|c| *c == Call::ExecuteChangeSet), 1);

    // Execution is polled by the id returned from change-set creation.
    assert!(service.calls().contains(&Call::DescribeStack(String::from(NEW_STACK_ID))));

    let reporter = deployer.reporter();
    let review = reporter.completions(WaitReason::Review);
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].changes, Some(2));

    let executing = reporter.completions(WaitReason::Executing);
    assert_eq!(executing.len(), 1);
    assert_eq!(executing[0].status.as_deref(), Some("CREATE_COMPLETE"));
}

#[tokio::test]
async fn unchanged_stack_deletes_the_empty_change_set() {
    let service = ScriptedService::new(
        vec![stack(STACK_ID, "UPDATE_COMPLETE")],
        vec![
            pending(),
            page(
                ChangeSetStatus::Failed,
                ExecutionStatus::Unavailable,
                Some(NO_CHANGES_REASON),
                vec![],
                None,
            ),
        ],
    );

    let outcome = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings())
        .deploy(&request())
        .await
        .expect("no changes is not an error");

    assert_eq!(outcome, DeployOutcome::NoChanges);
    assert_eq!(service.created()[0].change_set_type, ChangeSetType::Update);
    assert_eq!(service.count(|c| *c == Call::DeleteChangeSet), 1);
    assert_eq!(service.count(|c| *c == Call::ExecuteChangeSet), 0);
}

#[tokio::test]
async fn review_wait_completes_once_when_there_is_nothing_to_deploy() {
    let service = ScriptedService::new(
        vec![stack(STACK_ID, "UPDATE_COMPLETE")],
        vec![
            pending(),
            page(
                ChangeSetStatus::Failed,
                ExecutionStatus::Unavailable,
                Some(NO_CHANGES_REASON),
                vec![],
                None,
            ),
        ],
    );

    let mut deployer = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings());
    let outcome = deployer.deploy(&request()).await.expect("no changes");
    assert_eq!(outcome, DeployOutcome::NoChanges);

    let reporter = deployer.reporter();
    let ticks = reporter
        .reports
        .iter()
        .filter(|r| !r.done && r.reason == WaitReason::Review)
        .count();
    assert_eq!(ticks, 2);

    let review = reporter.completions(WaitReason::Review);
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].changes, None);
    assert_eq!(review[0].status.as_deref(), Some("UPDATE_COMPLETE"));

    // The review completion is the last report; nothing was executed.
    assert!(reporter.reports.last().is_some_and(|r| r.done && r.reason == WaitReason::Review));
}

#[tokio::test]
async fn dead_stack_is_deleted_once_then_created() {
    let service = ScriptedService::new(
        vec![
            stack(STACK_ID, "ROLLBACK_COMPLETE"),
            stack(STACK_ID, "DELETE_IN_PROGRESS"),
            stack(STACK_ID, "DELETE_COMPLETE"),
            stack(NEW_STACK_ID, "CREATE_COMPLETE"),
        ],
        vec![ready(vec![change("Queue", ChangeAction::Add)], None)],
    );

    let mut deployer = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings());
    let outcome = deployer.deploy(&request()).await.expect("deploy");

    assert!(matches!(
        outcome,
        DeployOutcome::Deployed {
            operation: StackOperation::Create,
            ..
        }
    ));

    let calls = service.calls();
    assert_eq!(
        &calls[..4],
        &[
            Call::DescribeStack(String::from(STACK_NAME)),
            Call::DeleteStack(String::from(STACK_NAME)),
            Call::DescribeStack(String::from(STACK_ID)),
            Call::DescribeStack(String::from(STACK_ID)),
        ]
    );
    assert_eq!(service.count(|c| matches!(c, Call::DeleteStack(_))), 1);
    assert_eq!(service.created()[0].change_set_type, ChangeSetType::Create);

    let deleted = deployer.reporter().completions(WaitReason::DeleteExisting);
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].status.as_deref(), Some("DELETE_COMPLETE"));
}

#[tokio::test]
async fn failed_delete_of_dead_stack_is_a_delete_completion_error() {
    let service = ScriptedService::new(
        vec![
            stack(STACK_ID, "CREATE_FAILED"),
            stack(STACK_ID, "DELETE_IN_PROGRESS"),
            stack(STACK_ID, "DELETE_FAILED"),
        ],
        vec![],
    );

    let err = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings())
        .deploy(&request())
        .await
        .expect_err("delete failed");

    assert!(matches!(
        err,
        Error::Deploy(DeployError::InvalidCompletionStatus {
            operation: StackOperation::Delete,
            stack: Some(ref s),
        }) if s.status == "DELETE_FAILED"
    ));
    assert!(service.created().is_empty());
}

#[tokio::test]
async fn busy_stack_is_waited_out_then_reclassified() {
    let service = ScriptedService::new(
        vec![
            stack(STACK_ID, "UPDATE_IN_PROGRESS"),
            stack(STACK_ID, "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            stack(STACK_ID, "UPDATE_COMPLETE"),
            stack(STACK_ID, "UPDATE_COMPLETE"),
            stack(NEW_STACK_ID, "UPDATE_COMPLETE"),
        ],
        vec![ready(vec![change("Queue", ChangeAction::Modify)], None)],
    );

    let mut deployer = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings());
    let outcome = deployer.deploy(&request()).await.expect("deploy");

    assert!(matches!(
        outcome,
        DeployOutcome::Deployed {
            operation: StackOperation::Update,
            ..
        }
    ));

    let reporter = deployer.reporter();
    let waits = reporter
        .reports
        .iter()
        .filter(|r| r.reason == WaitReason::InProgressExisting && !r.done)
        .count();
    assert!(waits >= 1);
    assert_eq!(reporter.completions(WaitReason::InProgressExisting).len(), 1);
    assert_eq!(service.created()[0].change_set_type, ChangeSetType::Update);
}

#[tokio::test]
async fn empty_capabilities_are_omitted() {
    let service = ScriptedService::new(
        vec![None, stack(NEW_STACK_ID, "CREATE_COMPLETE")],
        vec![ready(vec![change("Queue", ChangeAction::Add)], None)],
    );

    Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings())
        .deploy(&request().with_capabilities(vec![]))
        .await
        .expect("deploy");

    assert_eq!(service.created()[0].capabilities, None);
}

#[tokio::test]
async fn declared_capabilities_are_sent() {
    let service = ScriptedService::new(
        vec![None, stack(NEW_STACK_ID, "CREATE_COMPLETE")],
        vec![ready(vec![change("Role", ChangeAction::Add)], None)],
    );

    Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings())
        .deploy(&request().with_capabilities(vec![Capability::NamedIam]))
        .await
        .expect("deploy");

    assert_eq!(
        service.created()[0].capabilities,
        Some(vec![Capability::NamedIam])
    );
}

#[tokio::test]
async fn paginated_changes_are_concatenated_in_order() {
    let service = ScriptedService::new(
        vec![stack(STACK_ID, "UPDATE_COMPLETE"), stack(NEW_STACK_ID, "UPDATE_COMPLETE")],
        vec![
            ready(vec![change("A", ChangeAction::Modify)], Some("page-2")),
            ready(vec![change("B", ChangeAction::Add)], Some("page-3")),
            ready(vec![change("C", ChangeAction::Remove)], None),
        ],
    );

    let mut deployer = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings());
    deployer.deploy(&request()).await.expect("deploy");

    let tokens: Vec<Option<String>> = service
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::DescribeChangeSet(token) => Some(token),
            _ => None,
        })
        .collect();
    assert_eq!(
        tokens,
        vec![None, Some(String::from("page-2")), Some(String::from("page-3"))]
    );

    let review = deployer.reporter().completions(WaitReason::Review);
    assert_eq!(review[0].changes, Some(3));
}

#[tokio::test]
async fn declined_change_set_is_deleted_and_never_executed() {
    let service = ScriptedService::new(
        vec![stack(STACK_ID, "UPDATE_COMPLETE")],
        vec![ready(vec![change("Queue", ChangeAction::Remove)], None)],
    );

    let mut asked = Vec::new();
    let outcome = Deployer::new(
        Arc::clone(&service),
        RecordingReporter::default(),
        FnPrompt(|message: &str| {
            asked.push(message.to_string());
            false
        }),
    )
    .with_settings(settings())
    .deploy(&request())
    .await
    .expect("declining is not an error");

    assert_eq!(outcome, DeployOutcome::Rejected);
    assert_eq!(asked, vec![String::from("Deploy?")]);
    assert_eq!(service.count(|c| *c == Call::DeleteChangeSet), 1);
    assert_eq!(service.count(|c| *c == Call::ExecuteChangeSet), 0);
}

#[tokio::test]
async fn failed_change_set_reports_its_reason() {
    let service = ScriptedService::new(
        vec![stack(STACK_ID, "UPDATE_COMPLETE")],
        vec![page(
            ChangeSetStatus::Failed,
            ExecutionStatus::Unavailable,
            Some("Parameters: [Environment] must have values"),
            vec![],
            None,
        )],
    );

    let mut deployer = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings());
    let err = deployer.deploy(&request()).await.expect_err("not executable");

    assert!(matches!(
        err,
        Error::Deploy(DeployError::ChangeSetNotExecutable { ref reason, .. })
            if reason == "Parameters: [Environment] must have values"
    ));
    assert_eq!(service.count(|c| *c == Call::DeleteChangeSet), 0);

    let review = deployer.reporter().completions(WaitReason::Review);
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].changes, None);
}

#[tokio::test]
async fn rolled_back_creation_is_a_completion_error() {
    let service = ScriptedService::new(
        vec![
            None,
            stack(NEW_STACK_ID, "ROLLBACK_IN_PROGRESS"),
            stack(NEW_STACK_ID, "ROLLBACK_COMPLETE"),
        ],
        vec![ready(vec![change("Queue", ChangeAction::Add)], None)],
    );

    let err = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings())
        .deploy(&request())
        .await
        .expect_err("rolled back");

    assert!(err.is_deployment_error());
    assert!(matches!(
        err,
        Error::Deploy(DeployError::InvalidCompletionStatus {
            operation: StackOperation::Create,
            stack: Some(ref s),
        }) if s.status == "ROLLBACK_COMPLETE"
    ));
}

#[tokio::test]
async fn stack_without_a_deployable_status_is_rejected_up_front() {
    let service = ScriptedService::new(vec![stack(STACK_ID, "UPDATE_ROLLBACK_FAILED")], vec![]);

    let err = Deployer::new(Arc::clone(&service), RecordingReporter::default(), AutoApprove)
        .with_settings(settings())
        .deploy(&request())
        .await
        .expect_err("invalid status");

    assert!(matches!(
        err,
        Error::Deploy(DeployError::InvalidPreUpdateStatus { .. })
    ));
    assert_eq!(service.calls().len(), 1);
}
