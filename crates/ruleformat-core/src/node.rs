//! Rule tree node model
//!
//! A rule tree is a finite recursive value: scalars, ordered lists and
//! ordered field maps. [`RuleNode`] is the closed sum type the traversal
//! engine matches on, and [`Literal`] is the closed scalar variant shared with
//! the type-mapping tables.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Scalar value carried by a rule tree leaf or a type-mapping entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    /// Stable key that distinguishes both the variant and the value
    ///
    /// `500` and `"500"` must never collide when literals are used as
    /// lookup keys, so the variant name is part of the key.
    pub fn lookup_key(&self) -> String {
        match self {
            Literal::Bool(b) => format!("bool:{}", b),
            Literal::Int(i) => format!("int:{}", i),
            Literal::Float(f) => format!("float:{}", f),
            Literal::Str(s) => format!("str:{}", s),
        }
    }

    /// Variant name, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a literal; `None` for null, arrays and objects
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => Some(number_to_literal(n)),
            Value::String(s) => Some(Literal::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Number(Number::from(*i)),
            // NaN and infinities have no JSON spelling
            Literal::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Literal::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Int(i64::from(i))
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Float(f)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

fn number_to_literal(n: &Number) -> Literal {
    if let Some(i) = n.as_i64() {
        Literal::Int(i)
    } else {
        // u64 beyond i64::MAX lands here as well
        Literal::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Ordered field map of an object node
///
/// Insertion order is kept so a transformed tree serializes with the same
/// field order as its input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, RuleNode)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&RuleNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut RuleNode> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert a field, replacing the value in place if the key already exists
    pub fn insert(&mut self, key: impl Into<String>, value: RuleNode) -> Option<RuleNode> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<RuleNode> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Fields {
    type Item = (String, RuleNode);
    type IntoIter = std::vec::IntoIter<(String, RuleNode)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, RuleNode)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, RuleNode)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

/// A node of a rule tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RuleNode {
    /// Explicit null, also the canonical form of an empty flattened list
    #[default]
    Null,
    Scalar(Literal),
    List(Vec<RuleNode>),
    Object(Fields),
}

impl RuleNode {
    /// Short name of the node kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            RuleNode::Null => "null",
            RuleNode::Scalar(_) => "scalar",
            RuleNode::List(_) => "list",
            RuleNode::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RuleNode::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, RuleNode::List(_))
    }

    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            RuleNode::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RuleNode]> {
        match self {
            RuleNode::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            RuleNode::Scalar(literal) => Some(literal),
            _ => None,
        }
    }

    /// Field lookup on object nodes; `None` for every other kind
    pub fn get(&self, key: &str) -> Option<&RuleNode> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// Total number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + match self {
            RuleNode::List(items) => items.iter().map(RuleNode::node_count).sum(),
            RuleNode::Object(fields) => fields.iter().map(|(_, v)| v.node_count()).sum(),
            RuleNode::Null | RuleNode::Scalar(_) => 0,
        }
    }

    /// Nesting depth; a leaf has depth 1
    pub fn depth(&self) -> usize {
        1 + match self {
            RuleNode::List(items) => items.iter().map(RuleNode::depth).max().unwrap_or(0),
            RuleNode::Object(fields) => fields.iter().map(|(_, v)| v.depth()).max().unwrap_or(0),
            RuleNode::Null | RuleNode::Scalar(_) => 0,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RuleNode::Null => Value::Null,
            RuleNode::Scalar(literal) => literal.to_json(),
            RuleNode::List(items) => Value::Array(items.iter().map(RuleNode::to_json).collect()),
            RuleNode::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for RuleNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RuleNode::Null,
            Value::Bool(b) => RuleNode::Scalar(Literal::Bool(b)),
            Value::Number(n) => RuleNode::Scalar(number_to_literal(&n)),
            Value::String(s) => RuleNode::Scalar(Literal::Str(s)),
            Value::Array(items) => RuleNode::List(items.into_iter().map(RuleNode::from).collect()),
            Value::Object(map) => RuleNode::Object(
                map.into_iter()
                    .map(|(k, v)| (k, RuleNode::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<RuleNode> for Value {
    fn from(node: RuleNode) -> Self {
        match node {
            RuleNode::Null => Value::Null,
            RuleNode::Scalar(literal) => literal.to_json(),
            RuleNode::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            RuleNode::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Literal> for RuleNode {
    fn from(literal: Literal) -> Self {
        RuleNode::Scalar(literal)
    }
}

impl Serialize for RuleNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuleNode::Null => serializer.serialize_unit(),
            RuleNode::Scalar(literal) => literal.serialize(serializer),
            RuleNode::List(items) => serializer.collect_seq(items),
            RuleNode::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for RuleNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RuleNode::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_keeps_shape() {
        let value = json!({
            "name": "default",
            "options": {"enabled": true, "ttl": 300, "ratio": 0.5},
            "children": [null, "x"]
        });
        let node = RuleNode::from(value.clone());

        assert_eq!(node.kind(), "object");
        assert_eq!(
            node.get("options").and_then(|o| o.get("ttl")),
            Some(&RuleNode::Scalar(Literal::Int(300)))
        );
        assert_eq!(Value::from(node), value);
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let node = RuleNode::from(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let keys: Vec<_> = node.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_fields_insert_replaces_in_place() {
        let mut fields = Fields::new();
        fields.insert("a", RuleNode::Null);
        fields.insert("b", RuleNode::Null);
        let previous = fields.insert("a", RuleNode::Scalar(Literal::Int(1)));

        assert_eq!(previous, Some(RuleNode::Null));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(fields.remove("a"), Some(RuleNode::Scalar(Literal::Int(1))));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let node = RuleNode::from(json!(u64::MAX));
        assert!(matches!(node, RuleNode::Scalar(Literal::Float(_))));
    }

    #[test]
    fn test_literal_lookup_key_separates_types() {
        assert_ne!(Literal::Int(500).lookup_key(), Literal::from("500").lookup_key());
        assert_eq!(Literal::Int(500).lookup_key(), "int:500");
    }

    #[test]
    fn test_literal_untagged_deserialization() {
        let literals: Vec<Literal> = serde_json::from_value(json!([true, 7, 1.5, "x"])).unwrap();
        assert_eq!(
            literals,
            vec![
                Literal::Bool(true),
                Literal::Int(7),
                Literal::Float(1.5),
                Literal::from("x"),
            ]
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let value = json!({"cpCode": {"value": [{"id": 101}]}});
        let node: RuleNode = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&node).unwrap(), value);
    }

    #[test]
    fn test_node_count_and_depth() {
        let node = RuleNode::from(json!({"a": [1, {"b": 2}]}));
        // object, list, 1, object, 2
        assert_eq!(node.node_count(), 5);
        assert_eq!(node.depth(), 4);
        assert_eq!(RuleNode::Null.depth(), 1);
    }
}
