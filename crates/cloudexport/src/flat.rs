//! Flat attribute tree
//!
//! The configuration/state representation of an export. Scalars live at the
//! top level; every nested object is encoded as a zero- or one-element list
//! under its block name (`aws = [{ bucket = ... }]`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat attribute tree of a single export (or of a single block element)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatTree(Map<String, Value>);

impl FlatTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style block insert
    pub fn with_block(mut self, key: impl Into<String>, block: FlatTree) -> Self {
        self.set_block(key, block);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// String value of a scalar attribute; `None` when absent or not a string
    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Tri-state view of a boolean attribute
    pub fn flag(&self, key: &str) -> Flag {
        match self.0.get(key) {
            Some(Value::Bool(true)) => Flag::True,
            Some(Value::Bool(false)) => Flag::False,
            _ => Flag::Unset,
        }
    }

    /// Whether a block is present with at least one element
    pub fn has_block(&self, key: &str) -> bool {
        self.block(key).is_some()
    }

    /// Element 0 of the single-element list stored under `key`
    pub fn block(&self, key: &str) -> Option<FlatTree> {
        match self.0.get(key) {
            Some(Value::Array(items)) => match items.first() {
                Some(Value::Object(map)) => Some(FlatTree(map.clone())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Store `block` as the single element of the list under `key`
    pub fn set_block(&mut self, key: impl Into<String>, block: FlatTree) {
        self.0
            .insert(key.into(), Value::Array(vec![Value::Object(block.0)]));
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for FlatTree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for FlatTree {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Decode-boundary view of a boolean attribute, separating "unset" from "false"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Unset,
    True,
    False,
}

impl Flag {
    /// The boolean value, if one was given
    pub fn value(self) -> Option<bool> {
        match self {
            Flag::Unset => None,
            Flag::True => Some(true),
            Flag::False => Some(false),
        }
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value { Flag::True } else { Flag::False }
    }
}
