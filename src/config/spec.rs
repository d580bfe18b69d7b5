//! Configuration types for the deployment file.
//!
//! These types map to `stackdeploy.yaml`. Parameters and tags keep the order
//! they are written in, since that is the order they are sent in.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;

use crate::cloudformation::{Capability, Parameter, Tag};
use crate::deploy::DEFAULT_CHANGE_SET_PREFIX;

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployConfig {
    /// Stack settings.
    pub stack: StackConfig,
    /// Template parameters.
    #[serde(default)]
    pub parameters: KeyValueList,
    /// Stack tags.
    #[serde(default)]
    pub tags: KeyValueList,
}

/// Stack settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackConfig {
    /// Stack name.
    pub name: String,
    /// Path to the template, relative to the configuration file.
    pub template: PathBuf,
    /// Region; the shared AWS configuration decides when absent.
    #[serde(default)]
    pub region: Option<String>,
    /// Capabilities to acknowledge.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Prefix for generated change-set names.
    #[serde(default)]
    pub change_set_prefix: Option<String>,
}

/// A single `key: value` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValue {
    /// Entry key.
    pub key: String,
    /// Entry value, already stringified.
    pub value: String,
}

/// Ordered `key: value` entries.
///
/// Scalar values are stringified (`2` becomes `"2"`, `true` becomes
/// `"true"`), and a list of scalars becomes a comma-delimited string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Mapping", into = "Mapping")]
pub struct KeyValueList(Vec<KeyValue>);

impl KeyValueList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets `key` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.0.iter_mut().find(|kv| kv.key == key) {
            Some(existing) => existing.value = value,
            None => self.0.push(KeyValue { key, value }),
        }
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the entries into template parameters.
    #[must_use]
    pub fn to_parameters(&self) -> Vec<Parameter> {
        self.iter()
            .map(|kv| Parameter::new(&kv.key, &kv.value))
            .collect()
    }

    /// Converts the entries into stack tags.
    #[must_use]
    pub fn to_tags(&self) -> Vec<Tag> {
        self.iter().map(|kv| Tag::new(&kv.key, &kv.value)).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyValueList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (key, value) in iter {
            list.set(key, value);
        }
        list
    }
}

impl TryFrom<Mapping> for KeyValueList {
    type Error = String;

    fn try_from(mapping: Mapping) -> Result<Self, Self::Error> {
        let mut list = Self::new();

        for (key, value) in mapping {
            let key = scalar(&key).ok_or_else(|| format!("Invalid key: {key:?}"))?;
            let value = match value {
                Value::Sequence(items) => items
                    .iter()
                    .map(|item| {
                        scalar(item).ok_or_else(|| format!("Invalid list item for '{key}'"))
                    })
                    .collect::<Result<Vec<_>, _>>()?
                    .join(","),
                other => scalar(&other)
                    .ok_or_else(|| format!("Value for '{key}' must be a scalar or a list"))?,
            };
            list.set(key, value);
        }

        Ok(list)
    }
}

impl From<KeyValueList> for Mapping {
    fn from(list: KeyValueList) -> Self {
        list.0
            .into_iter()
            .map(|kv| (Value::String(kv.key), Value::String(kv.value)))
            .collect()
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

impl StackConfig {
    /// Returns the change-set prefix, falling back to the default.
    #[must_use]
    pub fn change_set_prefix(&self) -> &str {
        self.change_set_prefix
            .as_deref()
            .unwrap_or(DEFAULT_CHANGE_SET_PREFIX)
    }
}
