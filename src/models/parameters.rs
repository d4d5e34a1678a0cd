//! Outbound parameter set
//!
//! A flat map from Piwik PRO parameter name to value. Writes are last-writer
//! wins. A `null` value marks a field as unset; [`ParameterSet::purge`] drops
//! those before the set is serialized.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::value::to_text;

/// Characters escaped in form keys and values, matching `encodeURIComponent`
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, Value>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set a parameter, writing `null` when the value is absent
    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<Value>) {
        self.0.insert(key.into(), value.unwrap_or(Value::Null));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a parameter as a string slice
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Remove every `null` entry
    ///
    /// Zero, `false`, empty strings and empty collections are kept.
    pub fn purge(&mut self) {
        self.0.retain(|_, value| !value.is_null());
    }

    /// Serialize as an `application/x-www-form-urlencoded` body
    ///
    /// Keys and values are percent-encoded. Pairs are
    /// joined with `&` without a trailing separator. `null` entries are
    /// skipped even if the set was not purged.
    pub fn to_form_body(&self) -> String {
        self.0
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, FORM_VALUE),
                    utf8_percent_encode(&to_text(value), FORM_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
