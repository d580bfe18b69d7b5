//! Event-log progress reporter.
//!
//! Prints stack events as log lines, oldest first, skipping everything that
//! happened before the reporter was created or was already printed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cloudformation::{Change, StackClient, StackEvent};
use crate::error::Result;

use super::reporter::{ProgressContext, ProgressReporter, StatusTone, WaitReason};

/// Reporter that streams new stack events through `tracing`.
#[derive(Debug)]
pub struct LogReporter<C> {
    /// Client used to fetch events.
    client: C,
    /// Timestamp of the newest event already printed.
    last_seen: DateTime<Utc>,
}

impl<C: StackClient> LogReporter<C> {
    /// Creates a reporter that only prints events from now on.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self::since(client, Utc::now())
    }

    /// Creates a reporter that prints events newer than `since`.
    #[must_use]
    pub const fn since(client: C, since: DateTime<Utc>) -> Self {
        Self {
            client,
            last_seen: since,
        }
    }

    /// Fetches events newer than the last printed one, oldest first.
    async fn new_events(&self, stack_id: &str) -> Result<Vec<StackEvent>> {
        let mut fresh = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .client
                .describe_stack_events(stack_id, token.take())
                .await?;

            let mut reached_seen = false;
            for event in page.events {
                if event.timestamp <= self.last_seen {
                    reached_seen = true;
                    break;
                }
                fresh.push(event);
            }

            match page.next_token {
                Some(next) if !reached_seen => token = Some(next),
                _ => break,
            }
        }

        fresh.reverse();
        Ok(fresh)
    }

    async fn print_events(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        let Some(stack) = ctx.stack else {
            return Ok(());
        };

        let events = self.new_events(&stack.stack_id).await?;
        for event in &events {
            log_event(event);
        }
        if let Some(newest) = events.last() {
            self.last_seen = newest.timestamp;
        }

        Ok(())
    }
}

fn log_event(event: &StackEvent) {
    let reason = event.status_reason.as_deref().unwrap_or("");
    let time = event.timestamp.format("%H:%M:%S");
    match StatusTone::of(&event.status) {
        StatusTone::Bad => warn!(
            "{time} {} {} {} {reason}",
            event.logical_id, event.resource_type, event.status
        ),
        _ => info!(
            "{time} {} {} {} {reason}",
            event.logical_id, event.resource_type, event.status
        ),
    }
}

fn log_changes(stack_name: &str, changes: &[Change]) {
    info!("{} proposed change(s) for {stack_name}", changes.len());
    for change in changes {
        info!(
            "  {} {} ({}) replacement={}",
            change.action,
            change.logical_id,
            change.resource_type,
            change.replacement.as_deref().unwrap_or("-")
        );
    }
}

#[async_trait]
impl<C: StackClient> ProgressReporter for LogReporter<C> {
    async fn progress(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        if ctx.reason == WaitReason::Review {
            debug!("Change set for {} still being computed", ctx.stack_name);
            return Ok(());
        }

        self.print_events(ctx).await
    }

    async fn complete(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        if ctx.reason == WaitReason::Review {
            if let Some(changes) = ctx.changes {
                log_changes(ctx.stack_name, changes);
            }
            return Ok(());
        }

        self.print_events(ctx).await?;

        match ctx.stack {
            Some(stack) => info!("{}: {} is {}", ctx.reason, ctx.stack_name, stack.status),
            None => info!("{}: {} no longer exists", ctx.reason, ctx.stack_name),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudformation::{
        ChangeAction, ChangeSetDescription, ChangeSetIds, CreateChangeSetInput, Stack,
        StackEventsPage, StackResource,
    };
    use chrono::TimeZone;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink shared between the subscriber and the assertions.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("lock poisoned")).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (Captured, tracing::subscriber::DefaultGuard) {
        let sink = Captured::default();
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (sink, tracing::subscriber::set_default(subscriber))
    }

    fn no_events() -> PagedEvents {
        PagedEvents {
            pages: vec![],
            requested: Mutex::new(vec![]),
        }
    }

    /// Serves a fixed list of event pages and records the tokens asked for.
    struct PagedEvents {
        pages: Vec<StackEventsPage>,
        requested: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl StackClient for PagedEvents {
        async fn describe_stack(&self, _stack: &str) -> Result<Option<Stack>> {
            Ok(None)
        }
        async fn delete_stack(&self, _stack: &str) -> Result<()> {
            Ok(())
        }
        async fn create_change_set(&self, _input: &CreateChangeSetInput) -> Result<ChangeSetIds> {
            Err(crate::error::Error::internal("unused"))
        }
        async fn describe_change_set(
            &self,
            _stack: &str,
            _change_set: &str,
            _next_token: Option<String>,
        ) -> Result<ChangeSetDescription> {
            Err(crate::error::Error::internal("unused"))
        }
        async fn execute_change_set(&self, _stack: &str, _change_set: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_change_set(&self, _stack: &str, _change_set: &str) -> Result<()> {
            Ok(())
        }
        async fn describe_stack_resources(&self, _stack: &str) -> Result<Vec<StackResource>> {
            Ok(vec![])
        }
        async fn describe_stack_events(
            &self,
            _stack: &str,
            next_token: Option<String>,
        ) -> Result<StackEventsPage> {
            let index = next_token
                .as_deref()
                .map_or(0, |t| t.parse::<usize>().expect("numeric token"));
            self.requested.lock().expect("lock poisoned").push(next_token);
            Ok(self.pages[index].clone())
        }
    }

    fn event(id: &str, minute: u32) -> StackEvent {
        StackEvent {
            event_id: id.to_string(),
            timestamp: Utc
                .with_ymd_and_hms(2026, 1, 1, 12, minute, 0)
                .single()
                .expect("valid time"),
            logical_id: id.to_string(),
            resource_type: String::from("AWS::S3::Bucket"),
            status: String::from("CREATE_COMPLETE"),
            status_reason: None,
        }
    }

    fn stack() -> Stack {
        Stack {
            stack_id: String::from("stack-id"),
            stack_name: String::from("app"),
            status: String::from("CREATE_IN_PROGRESS"),
            status_reason: None,
            outputs: vec![],
        }
    }

    #[tokio::test]
    async fn test_new_events_stops_at_last_seen() {
        let client = PagedEvents {
            pages: vec![
                StackEventsPage {
                    events: vec![event("e4", 4), event("e3", 3)],
                    next_token: Some(String::from("1")),
                },
                StackEventsPage {
                    events: vec![event("e2", 2), event("e1", 1)],
                    next_token: Some(String::from("2")),
                },
                StackEventsPage {
                    events: vec![event("e0", 0)],
                    next_token: None,
                },
            ],
            requested: Mutex::new(vec![]),
        };
        let since = event("seen", 1).timestamp;
        let reporter = LogReporter::since(client, since);

        let events = reporter.new_events("stack-id").await.expect("events");
        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();

        assert_eq!(ids, vec!["e2", "e3", "e4"]);
        assert_eq!(
            *reporter.client.requested.lock().expect("lock poisoned"),
            vec![None, Some(String::from("1"))]
        );
    }

    #[tokio::test]
    async fn test_progress_advances_last_seen() {
        let client = PagedEvents {
            pages: vec![StackEventsPage {
                events: vec![event("e2", 2), event("e1", 1)],
                next_token: None,
            }],
            requested: Mutex::new(vec![]),
        };
        let mut reporter = LogReporter::since(client, event("start", 0).timestamp);
        let snapshot = stack();
        let ctx = ProgressContext::new(WaitReason::Executing, "app", Some(&snapshot));

        reporter.progress(&ctx).await.expect("progress");
        assert_eq!(reporter.last_seen, event("e2", 2).timestamp);

        // Same page again: nothing newer than e2, so nothing is printed twice.
        let again = reporter.new_events("stack-id").await.expect("events");
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_absent_stack_is_not_queried() {
        let client = PagedEvents {
            pages: vec![],
            requested: Mutex::new(vec![]),
        };
        let mut reporter = LogReporter::new(client);
        let ctx = ProgressContext::new(WaitReason::DeleteExisting, "app", None);

        reporter.complete(&ctx).await.expect("complete");
        assert!(reporter.client.requested.lock().expect("lock poisoned").is_empty());
    }

    #[tokio::test]
    async fn test_review_completion_logs_each_change() {
        let (logs, _guard) = capture_logs();
        let changes = vec![Change {
            action: ChangeAction::Add,
            logical_id: String::from("MyQueue"),
            physical_id: None,
            resource_type: String::from("AWS::SQS::Queue"),
            replacement: None,
            scope: vec![],
            detail_count: 0,
        }];
        let mut reporter = LogReporter::new(no_events());
        let ctx = ProgressContext::new(WaitReason::Review, "app", None).with_changes(&changes);

        reporter.complete(&ctx).await.expect("complete");

        let text = logs.text();
        assert!(text.contains("1 proposed change(s) for app"), "{text}");
        assert!(text.contains("Add MyQueue (AWS::SQS::Queue)"), "{text}");
    }

    #[tokio::test]
    async fn test_review_progress_does_not_list_changes() {
        let (logs, _guard) = capture_logs();
        let mut reporter = LogReporter::new(no_events());
        let ctx = ProgressContext::new(WaitReason::Review, "app", None);

        reporter.progress(&ctx).await.expect("progress");

        let text = logs.text();
        assert!(text.contains("still being computed"), "{text}");
        assert!(!text.contains("proposed change"), "{text}");
        assert!(reporter.client.requested.lock().expect("lock poisoned").is_empty());
    }
}
