// Document validation and normalization

use crate::{Coerce, FieldRule, Schema, ValidationError, ValidationErrors};
use serde_json::{Map, Value};

impl Schema {
    /// Validate `document` and return its normalized form (coerced values,
    /// unknown fields passed through only when allowed).
    pub fn validate(&self, document: &Value) -> Result<Value, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let normalized = match document {
            Value::Object(map) => Value::Object(self.validate_map(map, "", &mut errors)),
            other => {
                errors.add(
                    ValidationError::new("", "document must be of dict type")
                        .with_constraint("type")
                        .with_value(other.to_string()),
                );
                Value::Null
            }
        };

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(errors)
        }
    }

    /// Validate a flat string map such as a parsed query string
    pub fn validate_params(
        &self,
        params: &std::collections::HashMap<String, String>,
    ) -> Result<Value, ValidationErrors> {
        let document: Map<String, Value> = params
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        self.validate(&Value::Object(document))
    }

    fn validate_map(
        &self,
        map: &Map<String, Value>,
        prefix: &str,
        errors: &mut ValidationErrors,
    ) -> Map<String, Value> {
        let mut normalized = Map::new();

        for (key, value) in map {
            if self.contains(key) {
                continue;
            }
            if self.allows_unknown() {
                normalized.insert(key.clone(), value.clone());
            } else {
                errors.add(
                    ValidationError::new(path(prefix, key), "unknown field")
                        .with_constraint("unknown"),
                );
            }
        }

        for (name, rule) in self.fields() {
            let field = path(prefix, name);
            match map.get(name) {
                None => {
                    if rule.required {
                        errors.add(
                            ValidationError::new(field, "required field")
                                .with_constraint("required"),
                        );
                    }
                }
                Some(value) => {
                    if let Some(value) = validate_value(rule, value, &field, errors) {
                        normalized.insert(name.clone(), value);
                    }
                }
            }
        }

        normalized
    }
}

fn path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn coerce(coerce: Coerce, value: &Value) -> Result<Value, String> {
    match coerce {
        Coerce::Int => match value {
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err(format!("{} is not an integral number", n)),
            },
            Value::Bool(b) => Ok(Value::from(i64::from(*b))),
            Value::Null => Ok(Value::Null),
            other => Err(format!("cannot convert {} to an integer", other)),
        },
    }
}

fn validate_value(
    rule: &FieldRule,
    raw: &Value,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let value = match rule.coerce {
        Some(c) => match coerce(c, raw) {
            Ok(value) => value,
            Err(reason) => {
                errors.add(
                    ValidationError::new(field, format!("field '{}' cannot be coerced: {}", field, reason))
                        .with_constraint("coerce")
                        .with_value(raw.to_string()),
                );
                return None;
            }
        },
        None => raw.clone(),
    };

    if value.is_null() {
        if rule.nullable {
            return Some(Value::Null);
        }
        errors.add(ValidationError::new(field, "null value not allowed").with_constraint("nullable"));
        return None;
    }

    if let Some(kind) = rule.kind {
        if !kind.matches(&value) {
            errors.add(
                ValidationError::new(field, format!("must be of {} type", kind.name()))
                    .with_constraint("type")
                    .with_value(value.to_string()),
            );
            return None;
        }
    }

    let before = errors.len();

    if let Some(allowed) = &rule.allowed {
        if !allowed.contains(&value) {
            errors.add(
                ValidationError::new(field, format!("unallowed value {}", value))
                    .with_constraint("allowed")
                    .with_value(value.to_string()),
            );
        }
    }

    if let (Some(regex), Some(text)) = (&rule.regex, value.as_str()) {
        let full_match = regex
            .find(text)
            .map(|m| m.start() == 0 && m.end() == text.len())
            .unwrap_or(false);
        if !full_match {
            errors.add(
                ValidationError::new(field, format!("value does not match regex '{}'", regex.as_str()))
                    .with_constraint("regex")
                    .with_value(text.to_string()),
            );
        }
    }

    if let Some(number) = value.as_i64() {
        if let Some(min) = rule.min {
            if number < min {
                errors.add(
                    ValidationError::new(field, format!("min value is {}", min))
                        .with_constraint("min")
                        .with_value(number.to_string()),
                );
            }
        }
        if let Some(max) = rule.max {
            if number > max {
                errors.add(
                    ValidationError::new(field, format!("max value is {}", max))
                        .with_constraint("max")
                        .with_value(number.to_string()),
                );
            }
        }
    }

    if let (Some(schema), Value::Object(map)) = (&rule.schema, &value) {
        let nested = schema.validate_map(map, field, errors);
        return (errors.len() == before).then_some(Value::Object(nested));
    }

    (errors.len() == before).then_some(value)
}
