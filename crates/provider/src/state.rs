//! Resource State Management
//!
//! Handles the attribute tree exchanged with the host and the per-resource
//! data (identifier plus attributes) that resource handlers operate on.

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};

/// Dynamic value that can be encoded/decoded from host state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<DynamicValue>),
    Map(HashMap<String, DynamicValue>),
}

impl DynamicValue {
    pub fn as_map(&self) -> Option<&HashMap<String, DynamicValue>> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_map()?.get(key)
    }

    /// Scalar rendered as a string, coercing numbers and booleans
    pub fn to_attr_string(&self) -> Option<String> {
        match self {
            DynamicValue::String(s) => Some(s.clone()),
            DynamicValue::Number(n) => Some(n.to_string()),
            DynamicValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Null, empty string, empty list and empty map all count as unset
    pub fn is_null_or_empty(&self) -> bool {
        match self {
            DynamicValue::Null => true,
            DynamicValue::String(s) => s.is_empty(),
            DynamicValue::List(l) => l.is_empty(),
            DynamicValue::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }
}

impl Default for DynamicValue {
    fn default() -> Self {
        DynamicValue::Null
    }
}

/// Decode a DynamicValue from JSON bytes
pub fn decode_dynamic_value(data: &[u8]) -> Result<DynamicValue> {
    if data.is_empty() {
        return Ok(DynamicValue::Null);
    }

    let value: DynamicValue = serde_json::from_slice(data)
        .context("Failed to decode attribute tree")?;

    Ok(value)
}

/// Helper to extract a string attribute from a DynamicValue
pub fn get_string_attr(value: &DynamicValue, key: &str) -> String {
    value.get(key)
        .and_then(|v| v.to_attr_string())
        .unwrap_or_default()
}

/// Helper to extract an optional string attribute from a DynamicValue
pub fn get_optional_string_attr(value: &DynamicValue, key: &str) -> Option<String> {
    value.get(key)
        .and_then(|v| v.to_attr_string())
        .filter(|s| !s.is_empty())
}

/// Helper to extract a string-to-string map attribute
pub fn get_string_map_attr(value: &DynamicValue, key: &str) -> BTreeMap<String, String> {
    value.get(key)
        .and_then(|v| v.as_map())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.to_attr_string().map(|s| (k.clone(), s)))
                .collect()
        })
        .unwrap_or_default()
}

/// Helper to extract the members of a nested block set as a list of objects.
///
/// A bare object is accepted as a single-member set.
pub fn get_block_list<'a>(value: &'a DynamicValue, key: &str) -> Vec<&'a DynamicValue> {
    match value.get(key) {
        Some(DynamicValue::List(items)) => items
            .iter()
            .filter(|item| matches!(item, DynamicValue::Map(_)))
            .collect(),
        Some(block @ DynamicValue::Map(_)) if !block.is_null_or_empty() => vec![block],
        _ => Vec::new(),
    }
}

/// Helper to extract the only member of an at-most-one nested block
pub fn get_single_block<'a>(value: &'a DynamicValue, key: &str) -> Option<&'a DynamicValue> {
    get_block_list(value, key).into_iter().next()
}

/// Create a string DynamicValue
pub fn string_value(s: impl Into<String>) -> DynamicValue {
    DynamicValue::String(s.into())
}

/// Create a list DynamicValue
pub fn list_value(items: Vec<DynamicValue>) -> DynamicValue {
    DynamicValue::List(items)
}

/// Create a map DynamicValue from string pairs
pub fn string_map_value(map: &BTreeMap<String, String>) -> DynamicValue {
    DynamicValue::Map(
        map.iter()
            .map(|(k, v)| (k.clone(), string_value(v)))
            .collect(),
    )
}

/// Create a null DynamicValue
pub fn null_value() -> DynamicValue {
    DynamicValue::Null
}

/// Attribute map under construction that skips unset leaves
#[derive(Debug, Default)]
pub struct StateMap(HashMap<String, DynamicValue>);

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a string leaf; `None` leaves the key out
    pub fn set_string(&mut self, key: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.0.insert(key.to_string(), string_value(v));
        }
    }

    /// Insert a string map; an empty map leaves the key out
    pub fn set_string_map(&mut self, key: &str, value: &BTreeMap<String, String>) {
        if !value.is_empty() {
            self.0.insert(key.to_string(), string_map_value(value));
        }
    }

    /// Insert a nested value; null or empty leaves the key out
    pub fn set(&mut self, key: &str, value: DynamicValue) {
        if !value.is_null_or_empty() {
            self.0.insert(key.to_string(), value);
        }
    }

    pub fn into_value(self) -> DynamicValue {
        DynamicValue::Map(self.0)
    }

    /// Wrap as a single-member set
    pub fn into_set(self) -> DynamicValue {
        list_value(vec![self.into_value()])
    }
}

/// Per-resource data owned by the host: identifier plus attributes.
///
/// An empty identifier means the resource does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    attributes: HashMap<String, DynamicValue>,
    /// Non-fatal notices raised by the handler, reported back to the host
    warnings: Vec<String>,
}

impl ResourceData {
    /// Start from a planned configuration (no identifier yet)
    pub fn new(config: &DynamicValue) -> Self {
        let mut data = Self::from_state(config);
        data.id.clear();
        data.attributes.remove("id");
        data
    }

    /// Load from a stored state, picking the identifier out of `id`
    pub fn from_state(state: &DynamicValue) -> Self {
        let attributes = state.as_map().cloned().unwrap_or_default();
        let id = attributes
            .get("id")
            .and_then(|v| v.to_attr_string())
            .unwrap_or_default();
        Self {
            id,
            attributes,
            warnings: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Mark the resource as gone
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.attributes.get(key)
    }

    /// Set an attribute; setting null removes it
    pub fn set(&mut self, key: &str, value: DynamicValue) {
        if value.is_null() {
            self.attributes.remove(key);
        } else {
            self.attributes.insert(key.to_string(), value);
        }
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// The attribute tree without the identifier
    pub fn attributes(&self) -> DynamicValue {
        let mut attrs = self.attributes.clone();
        attrs.remove("id");
        DynamicValue::Map(attrs)
    }

    /// Resulting state, or `None` when the identifier has been cleared
    pub fn into_state(self) -> Option<DynamicValue> {
        if self.id.is_empty() {
            return None;
        }
        let mut attrs = self.attributes;
        attrs.insert("id".to_string(), string_value(self.id));
        Some(DynamicValue::Map(attrs))
    }
}
