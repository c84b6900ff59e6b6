use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One cell of a host row. The host wraps every value as `{ "value": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(default)]
    pub value: Value,
}

impl FieldValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn null() -> Self {
        Self { value: Value::Null }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Category text for this cell, `None` for null.
    pub fn text(&self) -> Option<String> {
        match &self.value {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// A host row: field identifier to wrapped value. Missing keys read as null.
pub type Row = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub label_short: String,
}

impl FieldDescriptor {
    pub fn new(name: &str, label_short: &str) -> Self {
        Self {
            name: name.to_string(),
            label_short: label_short.to_string(),
        }
    }

    pub fn display_label(&self) -> &str {
        if self.label_short.is_empty() {
            self.name.as_str()
        } else {
            self.label_short.as_str()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFields {
    #[serde(default)]
    pub dimension_like: Vec<FieldDescriptor>,
    #[serde(default)]
    pub measure_like: Vec<FieldDescriptor>,
    #[serde(default)]
    pub pivots: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub fields: QueryFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub name: String,
}

/// A flow between two node indices. Parallel links are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn incoming_total(&self, idx: usize) -> f64 {
        self.links
            .iter()
            .filter(|link| link.target == idx)
            .map(|link| link.value)
            .sum()
    }

    pub fn outgoing_total(&self, idx: usize) -> f64 {
        self.links
            .iter()
            .filter(|link| link.source == idx)
            .map(|link| link.value)
            .sum()
    }

    /// Aggregated flow through a node: the larger of its inbound and outbound sums.
    pub fn node_value(&self, idx: usize) -> f64 {
        self.incoming_total(idx).max(self.outgoing_total(idx))
    }
}
