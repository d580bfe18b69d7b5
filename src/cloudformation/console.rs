//! Console links for reviewing change sets.

/// Builds the console URL that shows a change set's proposed changes.
///
/// The link is informational; nothing parses it back.
#[must_use]
pub fn review_url(region: &str, stack_id: &str, change_set_id: &str) -> String {
    format!(
        "https://{region}.console.aws.amazon.com/cloudformation/home?region={region}#/stacks/changesets/changes?stackId={}&changeSetId={}",
        urlencoding::encode(stack_id),
        urlencoding::encode(change_set_id),
    )
}
