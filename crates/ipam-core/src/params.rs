//! Request parameters.
//!
//! Parameters are a flat map of field name to value. A value may also be a typed
//! reference to another resource (or a list of them); resource types turn those into
//! plain ids under their canonical key before a request is sent. Any reference left in
//! place is sent as its id.

use crate::types::Collection;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A reference to a persisted resource of a known collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// Collection the referenced record lives in
    pub collection: Collection,
    /// Server-assigned identifier
    pub id: u64,
}

impl ResourceRef {
    /// Creates a reference.
    #[must_use]
    pub const fn new(collection: Collection, id: u64) -> Self {
        Self { collection, id }
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Plain JSON value
    Value(Value),
    /// Reference to one resource
    Ref(ResourceRef),
    /// References to several resources
    RefList(Vec<ResourceRef>),
}

impl ParamValue {
    /// Converts to the JSON value sent on the wire.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Ref(reference) => Value::from(reference.id),
            Self::RefList(references) => {
                Value::Array(references.iter().map(|r| Value::from(r.id)).collect())
            }
        }
    }

    /// The single reference held by this value, if it is one.
    #[must_use]
    pub const fn as_reference(&self) -> Option<&ResourceRef> {
        match self {
            Self::Ref(reference) => Some(reference),
            _ => None,
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ResourceRef> for ParamValue {
    fn from(reference: ResourceRef) -> Self {
        Self::Ref(reference)
    }
}

/// Request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: BTreeMap<String, ParamValue>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a plain value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert of a resource reference.
    #[must_use]
    pub fn with_ref(mut self, key: impl Into<String>, reference: ResourceRef) -> Self {
        self.insert_param(key, ParamValue::Ref(reference));
        self
    }

    /// Builder-style insert of a list of resource references.
    #[must_use]
    pub fn with_refs(mut self, key: impl Into<String>, references: Vec<ResourceRef>) -> Self {
        self.insert_param(key, ParamValue::RefList(references));
        self
    }

    /// Inserts a plain value, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<ParamValue> {
        self.insert_param(key, ParamValue::Value(value.into()))
    }

    /// Inserts any parameter value, returning the previous value for the key.
    pub fn insert_param(&mut self, key: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.entries.insert(key.into(), value)
    }

    /// Value stored under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }

    /// Overwrites entries with those from `other`.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Converts to the JSON map sent on the wire; references become ids.
    #[must_use]
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_value()))
            .collect()
    }

    /// Encodes as an `application/x-www-form-urlencoded` body.
    ///
    /// Nested arrays and objects use bracket notation (`sections[0]=1`), booleans are
    /// sent as `1`/`0` and nulls are omitted.
    #[must_use]
    pub fn to_form(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.entries {
            encode_form_value(&mut pairs, key, &value.to_value());
        }
        pairs.join("&")
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(key, value)| (key, ParamValue::Value(value)))
                .collect(),
        }
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn encode_form_value(pairs: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push(format!("{}={}", urlencoding::encode(key), u8::from(*b))),
        Value::Number(n) => pairs.push(format!("{}={}", urlencoding::encode(key), n)),
        Value::String(s) => pairs.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(s)
        )),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                encode_form_value(pairs, &format!("{key}[{index}]"), item);
            }
        }
        Value::Object(map) => {
            for (sub_key, item) in map {
                encode_form_value(pairs, &format!("{key}[{sub_key}]"), item);
            }
        }
    }
}
