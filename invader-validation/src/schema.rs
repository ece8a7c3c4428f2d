// Schema fragments

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// JSON type a field must hold after coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Dict,
    List,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Dict => "dict",
            FieldType::List => "list",
        }
    }

    pub(crate) fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Dict => value.is_object(),
            FieldType::List => value.is_array(),
        }
    }
}

/// Normalization applied before type checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerce {
    /// Strings and integral floats become integers, `""` becomes null
    Int,
}

/// Constraints on one field
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
    pub kind: Option<FieldType>,
    pub required: bool,
    pub nullable: bool,
    pub allowed: Option<Vec<Value>>,
    pub coerce: Option<Coerce>,
    pub regex: Option<Regex>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub schema: Option<Schema>,
}

impl FieldRule {
    pub fn of(kind: FieldType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    pub fn list() -> Self {
        Self::of(FieldType::List)
    }

    /// Nested document validated against `schema`
    pub fn dict(schema: Schema) -> Self {
        Self {
            kind: Some(FieldType::Dict),
            schema: Some(schema),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Restrict the value to `values`. An empty list rejects every value.
    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn coerce(mut self, coerce: Coerce) -> Self {
        self.coerce = Some(coerce);
        self
    }

    /// String values must match `regex` in full
    pub fn regex(mut self, regex: Regex) -> Self {
        self.regex = Some(regex);
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }
}

/// A set of field rules, the unit that services compose and extend
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, FieldRule>,
    allow_unknown: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Schema::insert`]
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.insert(name, rule);
        self
    }

    /// Add or replace the rule for `name`
    pub fn insert(&mut self, name: impl Into<String>, rule: FieldRule) {
        self.fields.insert(name.into(), rule);
    }

    /// Merge `other` into this fragment; rules in `other` win on conflicts
    pub fn extend(mut self, other: Schema) -> Self {
        self.fields.extend(other.fields);
        self.allow_unknown |= other.allow_unknown;
        self
    }

    /// Accept fields that have no rule (they are passed through untouched)
    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn allows_unknown(&self) -> bool {
        self.allow_unknown
    }

    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldRule> {
        self.fields.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldRule> {
        self.fields.remove(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldRule)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
