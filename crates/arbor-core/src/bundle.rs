//! Recursive key/value state record used for save/restore.
//!
//! A node's saved state always has the shape
//! `{ KEY_INTERACTOR: <bundle>, KEY_CHILDREN: { tag: <bundle> } }`; the two
//! reserved keys are namespaced so they cannot clash with keys an
//! interactor writes into its own bundle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Reserved key holding the owning interactor's own state.
pub const KEY_INTERACTOR: &str = "arbor.node.interactor";
/// Reserved key holding the `tag -> bundle` map of attached children.
pub const KEY_CHILDREN: &str = "arbor.node.children";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BundleValue {
    Bool(bool),
    Int(i64),
    String(String),
    Bundle(Bundle),
    Typed(serde_json::Value),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    entries: BTreeMap<String, BundleValue>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<BundleValue> {
        self.entries.remove(key)
    }

    /// Returns the boolean stored under `key`, or `default` when there is no
    /// boolean there.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.entries.get(key) {
            Some(BundleValue::Bool(b)) => *b,
            _ => default,
        }
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.entries.insert(key.into(), BundleValue::Bool(value));
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.entries.get(key) {
            Some(BundleValue::Int(i)) => *i,
            _ => default,
        }
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.entries.insert(key.into(), BundleValue::Int(value));
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(BundleValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Passing `None` removes the mapping.
    pub fn put_string(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match value {
            Some(v) => {
                self.entries.insert(key, BundleValue::String(v));
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    pub fn get_bundle(&self, key: &str) -> Option<&Bundle> {
        match self.entries.get(key) {
            Some(BundleValue::Bundle(b)) => Some(b),
            _ => None,
        }
    }

    pub fn get_bundle_mut(&mut self, key: &str) -> Option<&mut Bundle> {
        match self.entries.get_mut(key) {
            Some(BundleValue::Bundle(b)) => Some(b),
            _ => None,
        }
    }

    /// Passing `None` removes the mapping.
    pub fn put_bundle(&mut self, key: impl Into<String>, bundle: Option<Bundle>) {
        let key = key.into();
        match bundle {
            Some(b) => {
                self.entries.insert(key, BundleValue::Bundle(b));
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    /// Stores any serializable value under `key`.
    pub fn put_typed<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let v = serde_json::to_value(value)?;
        self.entries.insert(key.into(), BundleValue::Typed(v));
        Ok(())
    }

    /// `Ok(None)` when nothing typed is stored under `key`.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            Some(BundleValue::Typed(v)) => Ok(Some(serde_json::from_value(v.clone())?)),
            _ => Ok(None),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
