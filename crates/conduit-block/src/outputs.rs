//! Output and input maps exchanged with blocks.
//!
//! On the wire both are flat JSON objects of strings. Blocks write their
//! outputs through a per-block enum implementing [`OutputName`], so a typo in
//! an output key is a compile error rather than a silently missing value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Concrete inputs for one block invocation, keyed by input name.
pub type InputMap = BTreeMap<String, String>;

/// A typed output key.
///
/// ```ignore
/// #[derive(Clone, Copy)]
/// enum FilterOutput { Passed, Value }
///
/// impl OutputName for FilterOutput {
///   fn as_str(&self) -> &'static str {
///     match self {
///       FilterOutput::Passed => "passed",
///       FilterOutput::Value => "value",
///     }
///   }
/// }
/// ```
pub trait OutputName: Copy {
  fn as_str(&self) -> &'static str;
}

/// Ordered mapping of output name to string value produced by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs(BTreeMap<String, String>);

impl Outputs {
  pub fn new() -> Self {
    Self(BTreeMap::new())
  }

  /// Builder form of [`Outputs::set`].
  pub fn with<K: OutputName>(mut self, key: K, value: impl Into<String>) -> Self {
    self.set(key, value);
    self
  }

  /// Set a typed output.
  pub fn set<K: OutputName>(&mut self, key: K, value: impl Into<String>) {
    self.0.insert(key.as_str().to_string(), value.into());
  }

  /// Set an output by raw name. Used at the wire boundary (trigger payloads,
  /// stdin, tests) where no typed key exists.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    self.0.insert(key.into(), value.into())
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  /// True when `key` is present with a non-empty value.
  pub fn has_value(&self, key: &str) -> bool {
    self.get(key).is_some_and(|v| !v.is_empty())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Serialize the whole bag as a JSON object string.
  pub fn to_json_string(&self) -> String {
    serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
  }

  pub fn into_inner(self) -> BTreeMap<String, String> {
    self.0
  }
}

impl From<BTreeMap<String, String>> for Outputs {
  fn from(map: BTreeMap<String, String>) -> Self {
    Self(map)
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Outputs {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}
