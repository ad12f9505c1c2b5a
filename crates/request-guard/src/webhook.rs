//! Commerce webhook event parsing.
//!
//! Events arrive as `{"type": ..., "data": {"object": ...}}`. Only the event
//! types that affect access are modelled; anything else is reported as
//! [`WebhookError::UnsupportedEvent`] so the route can acknowledge and
//! ignore it. Signature verification, token signing, and email delivery are
//! handled by collaborators outside this crate.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WebhookError;

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Version of the access grant layout.
pub const ACCESS_GRANT_VERSION: u8 = 1;

/// Plans a checkout can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPlan {
    /// 24-hour access.
    Daypass,
    /// Individual subscription.
    Pro,
    /// Team subscription.
    Team,
}

impl AccessPlan {
    /// Maps a product name from checkout metadata; unknown names are `Pro`.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_guard::AccessPlan;
    ///
    /// assert_eq!(AccessPlan::from_product("TEAM"), AccessPlan::Team);
    /// assert_eq!(AccessPlan::from_product(""), AccessPlan::Pro);
    /// ```
    #[must_use]
    pub fn from_product(product: &str) -> Self {
        match product.to_lowercase().as_str() {
            "team" => Self::Team,
            "daypass" => Self::Daypass,
            _ => Self::Pro,
        }
    }

    /// Whether the plan is backed by a recurring subscription.
    #[must_use]
    pub const fn is_subscription(self) -> bool {
        matches!(self, Self::Pro | Self::Team)
    }

    /// How long a grant for this plan stays valid.
    #[must_use]
    pub const fn validity(self) -> TimeDelta {
        match self {
            Self::Daypass => TimeDelta::hours(24),
            Self::Pro | Self::Team => TimeDelta::days(30),
        }
    }
}

/// A provider identifier that may arrive either bare or as an expanded
/// object carrying an `id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExpandableId {
    /// Bare identifier string.
    Id(String),
    /// Expanded object.
    Object {
        /// Identifier of the expanded object.
        id: String,
    },
}

impl ExpandableId {
    /// The identifier, whichever form it arrived in.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

/// Contact details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerDetails {
    /// Email entered by the customer.
    #[serde(default)]
    pub email: Option<String>,
}

/// A completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    /// Session identifier.
    pub id: String,
    /// Payment state, e.g. `paid`.
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Session state, e.g. `complete`.
    #[serde(default)]
    pub status: Option<String>,
    /// Customer reference.
    #[serde(default)]
    pub customer: Option<ExpandableId>,
    /// Subscription reference, for subscription plans.
    #[serde(default)]
    pub subscription: Option<ExpandableId>,
    /// Email supplied when the session was created.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Details entered during checkout.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Free-form metadata; `product` selects the plan.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Plan selected by the `product` metadata entry.
    #[must_use]
    pub fn plan(&self) -> AccessPlan {
        self.metadata
            .get("product")
            .map_or(AccessPlan::Pro, |product| AccessPlan::from_product(product))
    }

    /// Whether the session has been paid for or completed.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
            || self.status.as_deref() == Some("complete")
    }

    /// Delivery address: the checkout-entered email wins over the one the
    /// session was created with. Empty strings count as absent.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.as_deref())
            .filter(|email| !email.is_empty())
            .or_else(|| self.customer_email.as_deref().filter(|email| !email.is_empty()))
    }

    /// Builds the access grant for this session, valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::NotPaid`] for unpaid sessions,
    /// [`WebhookError::MissingCustomer`] without a customer, and
    /// [`WebhookError::MissingSubscription`] when a subscription plan has no
    /// subscription id.
    pub fn access_grant(&self, now: DateTime<Utc>) -> Result<AccessGrant, WebhookError> {
        if !self.is_paid() {
            return Err(WebhookError::NotPaid {
                session_id: self.id.clone(),
            });
        }
        let customer_id = present_id(self.customer.as_ref()).ok_or_else(|| {
            WebhookError::MissingCustomer {
                session_id: self.id.clone(),
            }
        })?;
        let plan = self.plan();
        let subscription_id = if plan.is_subscription() {
            let id = present_id(self.subscription.as_ref()).ok_or_else(|| {
                WebhookError::MissingSubscription {
                    session_id: self.id.clone(),
                }
            })?;
            Some(id.to_owned())
        } else {
            None
        };
        Ok(AccessGrant {
            version: ACCESS_GRANT_VERSION,
            plan,
            customer_id: customer_id.to_owned(),
            subscription_id,
            issued_at: now,
            expires_at: now + plan.validity(),
        })
    }
}

fn present_id(reference: Option<&ExpandableId>) -> Option<&str> {
    reference.map(ExpandableId::id).filter(|id| !id.is_empty())
}

/// A cancelled subscription.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: String,
    /// Customer reference.
    #[serde(default)]
    pub customer: Option<ExpandableId>,
    /// Subscription state, e.g. `canceled`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Claims handed to the token signer after a paid checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    /// Layout version.
    #[serde(rename = "v")]
    pub version: u8,
    /// Granted plan.
    pub plan: AccessPlan,
    /// Paying customer.
    pub customer_id: String,
    /// Subscription backing the grant, absent for day passes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Issue time, serialised as Unix seconds.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    /// Expiry time, serialised as Unix seconds.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

/// Webhook events that affect access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// `checkout.session.completed`
    CheckoutCompleted(CheckoutSession),
    /// `customer.subscription.deleted`
    SubscriptionDeleted(Subscription),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    object: Value,
}

impl WebhookEvent {
    /// Parses a verified event body.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Malformed`] when the envelope or object does
    /// not parse, and [`WebhookError::UnsupportedEvent`] for other event
    /// types.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_guard::{WebhookError, WebhookEvent};
    ///
    /// let body = r#"{"type":"invoice.paid","data":{"object":{}}}"#;
    /// assert!(matches!(
    ///     WebhookEvent::parse(body),
    ///     Err(WebhookError::UnsupportedEvent { .. })
    /// ));
    /// ```
    pub fn parse(body: &str) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_str(body)?;
        match raw.event_type.as_str() {
            CHECKOUT_COMPLETED => Ok(Self::CheckoutCompleted(serde_json::from_value(
                raw.data.object,
            )?)),
            SUBSCRIPTION_DELETED => Ok(Self::SubscriptionDeleted(serde_json::from_value(
                raw.data.object,
            )?)),
            _ => Err(WebhookError::UnsupportedEvent {
                event_type: raw.event_type,
            }),
        }
    }

    /// Provider event type string.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted(_) => CHECKOUT_COMPLETED,
            Self::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for webhook parsing and access grants.

    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
            .single()
            .expect("valid fixture time")
    }

    fn checkout_body(object: &Value) -> String {
        json!({ "type": CHECKOUT_COMPLETED, "data": { "object": object } }).to_string()
    }

    fn session(object: &Value) -> CheckoutSession {
        match WebhookEvent::parse(&checkout_body(object)).expect("parsed") {
            WebhookEvent::CheckoutCompleted(session) => session,
            other => panic!("expected checkout, got {other:?}"),
        }
    }

    #[rstest]
    #[case("team", AccessPlan::Team)]
    #[case("DayPass", AccessPlan::Daypass)]
    #[case("pro", AccessPlan::Pro)]
    #[case("enterprise", AccessPlan::Pro)]
    fn plans_come_from_product_metadata(#[case] product: &str, #[case] expected: AccessPlan) {
        let parsed = session(&json!({ "id": "cs_1", "metadata": { "product": product } }));

        assert_eq!(parsed.plan(), expected);
    }

    #[test]
    fn missing_metadata_defaults_to_pro() {
        assert_eq!(session(&json!({ "id": "cs_1" })).plan(), AccessPlan::Pro);
    }

    #[rstest]
    #[case(json!({ "id": "cs_1", "payment_status": "paid" }), true)]
    #[case(json!({ "id": "cs_1", "status": "complete" }), true)]
    #[case(json!({ "id": "cs_1", "payment_status": "unpaid", "status": "open" }), false)]
    fn paid_sessions_are_detected(#[case] object: Value, #[case] paid: bool) {
        assert_eq!(session(&object).is_paid(), paid);
    }

    #[test]
    fn customer_details_email_wins() {
        let parsed = session(&json!({
            "id": "cs_1",
            "customer_email": "created@example.com",
            "customer_details": { "email": "entered@example.com" }
        }));

        assert_eq!(parsed.email(), Some("entered@example.com"));
    }

    #[rstest]
    fn daypass_grant_lasts_a_day_without_subscription(now: DateTime<Utc>) {
        let parsed = session(&json!({
            "id": "cs_1",
            "payment_status": "paid",
            "customer": "cus_1",
            "metadata": { "product": "daypass" }
        }));

        let grant = parsed.access_grant(now).expect("grant");

        assert_eq!(grant.subscription_id, None);
        assert_eq!(grant.expires_at - grant.issued_at, TimeDelta::hours(24));
    }

    #[rstest]
    fn subscription_grant_accepts_expanded_objects(now: DateTime<Utc>) {
        let parsed = session(&json!({
            "id": "cs_1",
            "status": "complete",
            "customer": { "id": "cus_1", "email": "x@example.com" },
            "subscription": { "id": "sub_1" },
            "metadata": { "product": "team" }
        }));

        let grant = parsed.access_grant(now).expect("grant");

        assert_eq!(grant.customer_id, "cus_1");
        assert_eq!(grant.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(grant.expires_at - grant.issued_at, TimeDelta::days(30));
    }

    #[rstest]
    fn grant_serialises_as_token_claims(now: DateTime<Utc>) {
        let parsed = session(&json!({
            "id": "cs_1",
            "payment_status": "paid",
            "customer": "cus_1",
            "subscription": "sub_1"
        }));

        let claims = serde_json::to_value(parsed.access_grant(now).expect("grant"))
            .expect("serialised");

        assert_eq!(
            claims,
            json!({
                "v": 1,
                "plan": "pro",
                "customerId": "cus_1",
                "subscriptionId": "sub_1",
                "iat": now.timestamp(),
                "exp": (now + TimeDelta::days(30)).timestamp(),
            })
        );
    }

    #[rstest]
    #[case(
        json!({ "id": "cs_1", "customer": "cus_1" }),
        WebhookError::NotPaid { session_id: "cs_1".to_owned() }
    )]
    #[case(
        json!({ "id": "cs_1", "payment_status": "paid" }),
        WebhookError::MissingCustomer { session_id: "cs_1".to_owned() }
    )]
    #[case(
        json!({ "id": "cs_1", "payment_status": "paid", "customer": "cus_1" }),
        WebhookError::MissingSubscription { session_id: "cs_1".to_owned() }
    )]
    fn incomplete_sessions_grant_nothing(
        now: DateTime<Utc>,
        #[case] object: Value,
        #[case] expected: WebhookError,
    ) {
        assert_eq!(session(&object).access_grant(now), Err(expected));
    }

    #[test]
    fn subscription_deletions_parse() {
        let body = json!({
            "type": SUBSCRIPTION_DELETED,
            "data": { "object": { "id": "sub_1", "customer": "cus_1", "status": "canceled" } }
        })
        .to_string();

        let event = WebhookEvent::parse(&body).expect("parsed");

        assert_eq!(event.event_type(), SUBSCRIPTION_DELETED);
        let WebhookEvent::SubscriptionDeleted(subscription) = event else {
            panic!("expected subscription deletion");
        };
        assert_eq!(
            subscription.customer.as_ref().map(ExpandableId::id),
            Some("cus_1")
        );
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"type":"checkout.session.completed"}"#)]
    #[case(r#"{"type":"checkout.session.completed","data":{"object":{"status":"paid"}}}"#)]
    fn malformed_events_are_rejected(#[case] body: &str) {
        assert!(matches!(
            WebhookEvent::parse(body),
            Err(WebhookError::Malformed { .. })
        ));
    }
}
