//! Structural query keys: the addressing scheme for every fetchable resource.
//!
//! A key is an ordered list of segments: a namespace tag ("repos", "reviews",
//! "feedbacks"), a sub-tag ("list" | "detail" | "stats" | "templates"), and an
//! optional parameter record (pagination + filters) or an entity identifier.
//! Keys compare structurally; parameter records are field-order independent
//! but hash deterministically, and a shorter key acts as a prefix filter over
//! the namespace tree it roots.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A scalar filter/pagination value inside a key's parameter record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Normalized filter + pagination record.
///
/// A `BTreeMap` keeps iteration order stable, so equality ignores the order
/// fields were inserted in while hashing stays deterministic.
pub type ParamRecord = BTreeMap<String, ParamValue>;

/// Build a parameter record from any serializable filter struct.
///
/// `None` fields are dropped, so `{page: 1}` and `{page: 1, search: None}`
/// produce the same record (and therefore the same key).
pub fn params_record<T: Serialize>(params: &T) -> ParamRecord {
    let mut record = ParamRecord::new();
    if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(params) {
        for (field, value) in map {
            let scalar = match value {
                serde_json::Value::Bool(b) => ParamValue::Bool(b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => ParamValue::Int(i),
                    None => continue,
                },
                serde_json::Value::String(s) => ParamValue::Text(s),
                serde_json::Value::Null => continue,
                _ => continue,
            };
            record.insert(field, scalar);
        }
    }
    record
}

/// One segment of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Segment {
    /// A namespace or sub-tag, e.g. "repos" or "list".
    Tag(String),
    /// An entity identifier (detail keys).
    Id(i64),
    /// A normalized parameter record (list/stats keys).
    Params(ParamRecord),
}

/// A hierarchical, structurally-comparable cache key.
///
/// Two keys are equal iff their segment lists are deeply equal. A key built
/// from tags only (no trailing params/id) doubles as a prefix for
/// invalidation: `QueryKey::prefix(&["repos", "list"])` matches every
/// repos-list key regardless of its filter record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    segments: Vec<Segment>,
}

impl QueryKey {
    /// A bare tag-path key, usable both as a full key and as a prefix.
    pub fn prefix(tags: &[&str]) -> Self {
        Self {
            segments: tags.iter().map(|t| Segment::Tag(t.to_string())).collect(),
        }
    }

    /// Key for a list endpoint: `[namespace, "list", params]`.
    pub fn list(namespace: &str, params: ParamRecord) -> Self {
        Self::prefix(&[namespace, "list"]).with_params(params)
    }

    /// Key for a detail endpoint: `[namespace, "detail", id]`.
    pub fn detail(namespace: &str, id: i64) -> Self {
        Self::prefix(&[namespace, "detail"]).with_id(id)
    }

    /// Key for a stats endpoint: `[namespace, "stats", params]`.
    pub fn stats(namespace: &str, params: ParamRecord) -> Self {
        Self::prefix(&[namespace, "stats"]).with_params(params)
    }

    /// Key for a templates endpoint: `[namespace, "templates"]`.
    pub fn templates(namespace: &str) -> Self {
        Self::prefix(&[namespace, "templates"])
    }

    /// Append a parameter record segment.
    pub fn with_params(mut self, params: ParamRecord) -> Self {
        self.segments.push(Segment::Params(params));
        self
    }

    /// Append an entity identifier segment.
    pub fn with_id(mut self, id: i64) -> Self {
        self.segments.push(Segment::Id(id));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Structural prefix test: every segment of `self` must equal the
    /// corresponding leading segment of `key`.
    pub fn is_prefix_of(&self, key: &QueryKey) -> bool {
        self.segments.len() <= key.segments.len()
            && self
                .segments
                .iter()
                .zip(key.segments.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            match segment {
                Segment::Tag(tag) => write!(f, "{tag}")?,
                Segment::Id(id) => write!(f, "{id}")?,
                Segment::Params(params) => {
                    let json = serde_json::to_string(params).map_err(|_| fmt::Error)?;
                    write!(f, "{json}")?;
                }
            }
        }
        Ok(())
    }
}
