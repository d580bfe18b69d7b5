//! Change-set naming and request shaping.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::cloudformation::Capability;

/// Status reason the service gives when a change set has nothing to do.
///
/// This is matched verbatim; if the service rewords it, "no changes" turns
/// into a [`crate::error::DeployError::ChangeSetNotExecutable`].
pub const NO_CHANGES_REASON: &str =
    "The submitted information didn't contain changes. Submit different information to create a change set.";

/// Default prefix for generated change-set names.
pub const DEFAULT_CHANGE_SET_PREFIX: &str = "stackdeploy";

/// Returns true if the change set failed only because there was nothing to change.
#[must_use]
pub fn is_no_changes(reason: Option<&str>) -> bool {
    reason == Some(NO_CHANGES_REASON)
}

/// Generates a change-set name unique to this attempt.
///
/// Change-set names only allow letters, digits and `-`, so every other
/// character of the timestamp becomes `-`.
#[must_use]
pub fn change_set_name(prefix: &str, now: DateTime<Utc>) -> String {
    let stamp: String = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{prefix}-{stamp}")
}

/// An empty capability list is sent as "omitted".
#[must_use]
pub fn normalize_capabilities(capabilities: &[Capability]) -> Option<Vec<Capability>> {
    if capabilities.is_empty() {
        None
    } else {
        Some(capabilities.to_vec())
    }
}
