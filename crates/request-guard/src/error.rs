//! Error types for the request-guard crate.
//!
//! Payload rejections carry the HTTP status a route should answer with;
//! webhook errors describe events that cannot be turned into an access
//! grant.

use thiserror::Error;

/// Reasons an incoming JSON payload is refused.
///
/// Messages never include the offending content; they are safe to return to
/// the caller verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadRejection {
    /// The raw body exceeds the configured byte limit.
    #[error("payload too large: {bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Size of the raw body in bytes.
        bytes: usize,
        /// Configured limit.
        max_bytes: usize,
    },

    /// The body is not valid JSON.
    #[error("invalid JSON")]
    InvalidJson,

    /// The body parsed, but its root is not a JSON object.
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// Containers are nested deeper than allowed.
    #[error("JSON nesting exceeds maximum depth of {max_depth}")]
    TooDeep {
        /// Configured depth limit.
        max_depth: usize,
    },

    /// A string value matched a known injection pattern.
    #[error("suspicious pattern detected in request payload")]
    SuspiciousPattern,

    /// A required field is absent or null.
    #[error("missing required field: \"{name}\"")]
    MissingField {
        /// Field name.
        name: String,
    },

    /// A field holds a value of the wrong JSON type.
    #[error("field \"{name}\" must be of type {expected}, got {actual}")]
    WrongType {
        /// Field name.
        name: String,
        /// Type required by the rule.
        expected: &'static str,
        /// Type found in the payload.
        actual: &'static str,
    },

    /// A string field is longer than allowed.
    #[error("field \"{name}\" exceeds max length of {max_len}")]
    TooLong {
        /// Field name.
        name: String,
        /// Maximum length in UTF-16 code units.
        max_len: usize,
    },

    /// A number field is below its minimum.
    #[error("field \"{name}\" must be at least {min}")]
    BelowMinimum {
        /// Field name.
        name: String,
        /// Inclusive lower bound.
        min: f64,
    },

    /// A number field is above its maximum.
    #[error("field \"{name}\" must be at most {max}")]
    AboveMaximum {
        /// Field name.
        name: String,
        /// Inclusive upper bound.
        max: f64,
    },

    /// An array field holds too many items.
    #[error("field \"{name}\" exceeds max items of {max_items}")]
    TooManyItems {
        /// Field name.
        name: String,
        /// Maximum item count.
        max_items: usize,
    },
}

impl PayloadRejection {
    /// HTTP status code a route should answer with.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_guard::PayloadRejection;
    ///
    /// assert_eq!(PayloadRejection::InvalidJson.status(), 400);
    /// assert_eq!(PayloadRejection::SuspiciousPattern.status(), 422);
    /// ```
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::TooLarge { .. } => 413,
            Self::InvalidJson | Self::NotAnObject | Self::MissingField { .. } => 400,
            Self::TooDeep { .. }
            | Self::SuspiciousPattern
            | Self::WrongType { .. }
            | Self::TooLong { .. }
            | Self::BelowMinimum { .. }
            | Self::AboveMaximum { .. }
            | Self::TooManyItems { .. } => 422,
        }
    }
}

/// Errors raised while interpreting a commerce webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// The event body is not a well-formed event envelope.
    #[error("malformed webhook event: {message}")]
    Malformed {
        /// Description of the parse error.
        message: String,
    },

    /// The event type is not handled.
    #[error("unsupported webhook event type '{event_type}'")]
    UnsupportedEvent {
        /// Event type as sent by the provider.
        event_type: String,
    },

    /// The checkout session has not been paid.
    #[error("checkout session '{session_id}' is not paid")]
    NotPaid {
        /// Checkout session identifier.
        session_id: String,
    },

    /// The checkout session carries no customer.
    #[error("checkout session '{session_id}' has no customer")]
    MissingCustomer {
        /// Checkout session identifier.
        session_id: String,
    },

    /// A subscription plan was purchased without a subscription id.
    #[error("checkout session '{session_id}' for a subscription plan has no subscription id")]
    MissingSubscription {
        /// Checkout session identifier.
        session_id: String,
    },
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed {
            message: err.to_string(),
        }
    }
}

/// Errors raised while building a [`crate::PayloadGuard`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardBuildError {
    /// The injection pattern set failed to compile.
    #[error("failed to compile injection patterns: {message}")]
    InvalidPattern {
        /// Description of the regex error.
        message: String,
    },
}

impl From<regex::Error> for GuardBuildError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Tests for request-guard error types.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(PayloadRejection::TooLarge { bytes: 10, max_bytes: 5 }, 413)]
    #[case(PayloadRejection::InvalidJson, 400)]
    #[case(PayloadRejection::NotAnObject, 400)]
    #[case(PayloadRejection::MissingField { name: "target".to_owned() }, 400)]
    #[case(PayloadRejection::TooDeep { max_depth: 8 }, 422)]
    #[case(PayloadRejection::SuspiciousPattern, 422)]
    #[case(PayloadRejection::TooManyItems { name: "tags".to_owned(), max_items: 3 }, 422)]
    fn rejections_map_to_http_statuses(#[case] rejection: PayloadRejection, #[case] status: u16) {
        assert_eq!(rejection.status(), status);
    }

    #[test]
    fn wrong_type_message_names_both_types() {
        let err = PayloadRejection::WrongType {
            name: "target".to_owned(),
            expected: "string",
            actual: "number",
        };

        assert_eq!(
            err.to_string(),
            "field \"target\" must be of type string, got number"
        );
    }

    #[test]
    fn unsupported_event_message_includes_type() {
        let err = WebhookError::UnsupportedEvent {
            event_type: "invoice.paid".to_owned(),
        };

        assert!(err.to_string().contains("invoice.paid"));
    }
}
