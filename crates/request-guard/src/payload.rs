//! Incoming JSON payload guard.
//!
//! A [`PayloadGuard`] checks a request body in a fixed order and stops at the
//! first failure: byte size, JSON syntax, object root, nesting depth,
//! injection patterns, then per-field rules. Each rejection maps to an HTTP
//! status through [`PayloadRejection::status`].

use regex::RegexSet;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{GuardBuildError, PayloadRejection};

/// Default raw body limit (64 KiB).
pub const DEFAULT_MAX_BYTES: usize = 65_536;

/// Default container nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 8;

const INJECTION_PATTERNS: [&str; 11] = [
    r"(?i)\$where\b",
    r"(?i)\$\s*gt\b|\$\s*lt\b|\$\s*ne\b|\$\s*in\b|\$\s*regex\b",
    r"(?i)<\s*script[\s>]",
    r"(?i)javascript\s*:",
    r"(?i)on[a-z0-9_]+\s*=",
    r"(?i)union\s+select\b",
    r"(?i)insert\s+into\b",
    r"(?i)drop\s+table\b",
    r";\s*--",
    r"\.\./",
    r"\x00",
];

/// Expected shape of a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A string, optionally bounded in UTF-16 code units.
    String {
        /// Maximum length.
        max_len: Option<usize>,
    },
    /// A number, optionally bounded on either side (inclusive).
    Number {
        /// Inclusive lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
    },
    /// A boolean.
    Boolean,
    /// An array, optionally bounded in length.
    Array {
        /// Maximum item count.
        max_items: Option<usize>,
    },
    /// A JSON object.
    Object,
}

impl FieldKind {
    /// JSON type name used in rejection messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Boolean => "boolean",
            Self::Array { .. } => "array",
            Self::Object => "object",
        }
    }
}

/// Constraint on one top-level field of the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    /// Top-level key.
    pub name: String,
    /// Expected type and bounds.
    pub kind: FieldKind,
    /// Whether an absent or null value is rejected.
    pub required: bool,
}

impl FieldRule {
    /// A field that must be present and non-null.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// A field that is checked only when present.
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    fn check(&self, value: &Value) -> Result<(), PayloadRejection> {
        let wrong_type = || PayloadRejection::WrongType {
            name: self.name.clone(),
            expected: self.kind.type_name(),
            actual: json_type_name(value),
        };
        match (&self.kind, value) {
            (FieldKind::String { max_len }, Value::String(text)) => {
                if let Some(limit) = *max_len
                    && text.encode_utf16().count() > limit
                {
                    return Err(PayloadRejection::TooLong {
                        name: self.name.clone(),
                        max_len: limit,
                    });
                }
                Ok(())
            }
            (FieldKind::Number { min, max }, Value::Number(number)) => {
                let Some(amount) = number.as_f64() else {
                    return Err(wrong_type());
                };
                if let Some(floor) = *min
                    && amount < floor
                {
                    return Err(PayloadRejection::BelowMinimum {
                        name: self.name.clone(),
                        min: floor,
                    });
                }
                if let Some(ceiling) = *max
                    && amount > ceiling
                {
                    return Err(PayloadRejection::AboveMaximum {
                        name: self.name.clone(),
                        max: ceiling,
                    });
                }
                Ok(())
            }
            (FieldKind::Array { max_items }, Value::Array(items)) => {
                if let Some(limit) = *max_items
                    && items.len() > limit
                {
                    return Err(PayloadRejection::TooManyItems {
                        name: self.name.clone(),
                        max_items: limit,
                    });
                }
                Ok(())
            }
            (FieldKind::Boolean, Value::Bool(_)) | (FieldKind::Object, Value::Object(_)) => Ok(()),
            _ => Err(wrong_type()),
        }
    }
}

/// Builder for [`PayloadGuard`].
#[derive(Debug, Clone)]
pub struct PayloadGuardBuilder {
    max_bytes: usize,
    max_depth: usize,
    scan_injections: bool,
    fields: Vec<FieldRule>,
}

impl PayloadGuardBuilder {
    /// Sets the raw body limit in bytes.
    #[must_use]
    pub const fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the container nesting limit.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enables or disables the injection pattern scan.
    #[must_use]
    pub const fn scan_injections(mut self, enabled: bool) -> Self {
        self.scan_injections = enabled;
        self
    }

    /// Adds a field rule. Rules are checked in insertion order.
    #[must_use]
    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Compiles the injection patterns and returns the guard.
    ///
    /// # Errors
    ///
    /// Returns [`GuardBuildError::InvalidPattern`] if the pattern set fails to
    /// compile.
    pub fn build(self) -> Result<PayloadGuard, GuardBuildError> {
        let patterns = RegexSet::new(INJECTION_PATTERNS)?;
        Ok(PayloadGuard {
            max_bytes: self.max_bytes,
            max_depth: self.max_depth,
            scan_injections: self.scan_injections,
            fields: self.fields,
            patterns,
        })
    }
}

/// Validates untrusted JSON request bodies.
///
/// # Examples
///
/// ```
/// use request_guard::{FieldKind, FieldRule, PayloadGuard};
///
/// let guard = PayloadGuard::builder()
///     .max_bytes(8192)
///     .field(FieldRule::required("target", FieldKind::String { max_len: Some(253) }))
///     .build()
///     .expect("patterns compile");
///
/// let data = guard.validate_str(r#"{"target":"example.com"}"#).expect("accepted");
/// assert_eq!(data.get("target").and_then(|v| v.as_str()), Some("example.com"));
///
/// let rejected = guard.validate_str("{}").expect_err("target is required");
/// assert_eq!(rejected.status(), 400);
/// ```
#[derive(Debug, Clone)]
pub struct PayloadGuard {
    max_bytes: usize,
    max_depth: usize,
    scan_injections: bool,
    fields: Vec<FieldRule>,
    patterns: RegexSet,
}

impl PayloadGuard {
    /// Starts a builder with the default limits and no field rules.
    #[must_use]
    pub const fn builder() -> PayloadGuardBuilder {
        PayloadGuardBuilder {
            max_bytes: DEFAULT_MAX_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            scan_injections: true,
            fields: Vec::new(),
        }
    }

    /// Validates a raw body, starting with its byte size.
    ///
    /// # Errors
    ///
    /// Returns the first [`PayloadRejection`] encountered.
    pub fn validate_str(&self, body: &str) -> Result<Map<String, Value>, PayloadRejection> {
        let bytes = body.len();
        if bytes > self.max_bytes {
            return Err(PayloadRejection::TooLarge {
                bytes,
                max_bytes: self.max_bytes,
            });
        }
        let value: Value =
            serde_json::from_str(body).map_err(|_| PayloadRejection::InvalidJson)?;
        self.validate_value(value)
    }

    /// Validates an already-parsed value. The size check is skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`PayloadRejection`] encountered.
    pub fn validate_value(&self, value: Value) -> Result<Map<String, Value>, PayloadRejection> {
        let Value::Object(map) = value else {
            return Err(PayloadRejection::NotAnObject);
        };
        if map
            .values()
            .any(|child| exceeds_depth(child, 1, self.max_depth))
        {
            return Err(PayloadRejection::TooDeep {
                max_depth: self.max_depth,
            });
        }
        if self.scan_injections && map.values().any(|child| self.contains_injection(child)) {
            warn!("suspicious pattern detected in request payload");
            return Err(PayloadRejection::SuspiciousPattern);
        }
        for rule in &self.fields {
            match map.get(&rule.name) {
                None | Some(Value::Null) => {
                    if rule.required {
                        return Err(PayloadRejection::MissingField {
                            name: rule.name.clone(),
                        });
                    }
                }
                Some(found) => rule.check(found)?,
            }
        }
        Ok(map)
    }

    fn contains_injection(&self, value: &Value) -> bool {
        match value {
            Value::String(text) => self.patterns.is_match(text),
            Value::Array(items) => items.iter().any(|item| self.contains_injection(item)),
            Value::Object(map) => map.values().any(|child| self.contains_injection(child)),
            Value::Null | Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

/// Whether any value below `value` sits deeper than `max_depth`, the root
/// object being depth zero.
fn exceeds_depth(value: &Value, depth: usize, max_depth: usize) -> bool {
    if depth > max_depth {
        return true;
    }
    let next = depth.saturating_add(1);
    match value {
        Value::Array(items) => items.iter().any(|item| exceeds_depth(item, next, max_depth)),
        Value::Object(map) => map
            .values()
            .any(|child| exceeds_depth(child, next, max_depth)),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
