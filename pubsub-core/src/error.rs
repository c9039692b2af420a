// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pubsub-specific stanza error carriers.

use core::fmt;

use minidom::Element;
use xmpp_parsers::ns;
use xmpp_parsers::stanza_error::{DefinedCondition, ErrorType, StanzaError};

/// Every fallible outcome of decoding, dispatching or rendering a pubsub
/// request.
#[derive(Debug, Clone, PartialEq)]
pub enum PubSubFault {
    /// A request was malformed: missing attribute, wrong form type, and
    /// similar decoding failures.
    BadRequest {
        /// The pubsub-errors application condition local name, if any.
        pubsub_condition: Option<&'static str>,
        /// Human readable detail, carried in the stanza error as `<text/>`.
        text: Option<String>,
    },

    /// A backend refused or failed a request with a specific defined
    /// condition and pubsub-errors application condition.
    PubSubError {
        /// The XMPP defined condition.
        condition: DefinedCondition,
        /// The pubsub-errors application condition local name.
        pubsub_condition: &'static str,
        /// The XEP-0060 feature name this error pins, if any.
        feature: Option<&'static str>,
    },

    /// The client-side `subscribe` call resolved with a pending
    /// subscription.
    SubscriptionPending,

    /// The client-side `subscribe` call resolved with a subscription that
    /// still needs to be configured.
    SubscriptionUnconfigured,
}

impl PubSubFault {
    /// `BadRequest` with no application condition, just descriptive text.
    pub fn bad_request(text: impl Into<String>) -> PubSubFault {
        PubSubFault::BadRequest {
            pubsub_condition: None,
            text: Some(text.into()),
        }
    }

    /// `BadRequest` carrying the `nodeid-required` application condition.
    pub fn nodeid_required() -> PubSubFault {
        PubSubFault::BadRequest {
            pubsub_condition: Some("nodeid-required"),
            text: None,
        }
    }

    /// `BadRequest` carrying the `jid-required` application condition.
    pub fn jid_required() -> PubSubFault {
        PubSubFault::BadRequest {
            pubsub_condition: Some("jid-required"),
            text: None,
        }
    }

    /// `BadRequest` carrying the `item-required` application condition,
    /// used when an `item`/`retract` child is missing its `id` attribute.
    pub fn item_required() -> PubSubFault {
        PubSubFault::BadRequest {
            pubsub_condition: None,
            text: None,
        }
    }

    /// `feature-not-implemented` refusal naming the XEP-0060 feature.
    pub fn unsupported(feature: &'static str) -> PubSubFault {
        PubSubFault::PubSubError {
            condition: DefinedCondition::FeatureNotImplemented,
            pubsub_condition: "unsupported",
            feature: Some(feature),
        }
    }

    /// `not-acceptable`, used by the `default` pre-check on an unknown node
    /// type.
    pub fn not_acceptable() -> PubSubFault {
        PubSubFault::PubSubError {
            condition: DefinedCondition::NotAcceptable,
            pubsub_condition: "",
            feature: None,
        }
    }

    /// Bare `feature-not-implemented`, used when no child of `<pubsub>`
    /// matches any known verb.
    pub fn not_implemented() -> PubSubFault {
        PubSubFault::PubSubError {
            condition: DefinedCondition::FeatureNotImplemented,
            pubsub_condition: "",
            feature: None,
        }
    }
}

impl fmt::Display for PubSubFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PubSubFault::BadRequest { text: Some(t), .. } => write!(f, "bad request: {t}"),
            PubSubFault::BadRequest { pubsub_condition: Some(c), .. } => {
                write!(f, "bad request: {c}")
            }
            PubSubFault::BadRequest { .. } => write!(f, "bad request"),
            PubSubFault::PubSubError { pubsub_condition, feature: Some(feature), .. } => {
                write!(f, "pubsub error ({pubsub_condition}): feature {feature} refused")
            }
            PubSubFault::PubSubError { pubsub_condition, .. } => {
                write!(f, "pubsub error ({pubsub_condition})")
            }
            PubSubFault::SubscriptionPending => write!(f, "subscription is pending"),
            PubSubFault::SubscriptionUnconfigured => write!(f, "subscription needs configuration"),
        }
    }
}

impl std::error::Error for PubSubFault {}

impl From<PubSubFault> for StanzaError {
    fn from(fault: PubSubFault) -> StanzaError {
        match fault {
            PubSubFault::BadRequest { pubsub_condition, text } => {
                let mut error = StanzaError {
                    type_: ErrorType::Modify,
                    by: None,
                    defined_condition: DefinedCondition::BadRequest,
                    texts: Default::default(),
                    other: None,
                };
                if let Some(text) = text {
                    error.texts.insert("en".to_string(), text);
                }
                if let Some(name) = pubsub_condition {
                    error.other = Some(Element::builder(name, ns::PUBSUB_ERRORS).build());
                }
                error
            }
            PubSubFault::PubSubError { condition, pubsub_condition, feature } => {
                let mut other = Element::builder(pubsub_condition, ns::PUBSUB_ERRORS);
                if let Some(feature) = feature {
                    other = other.attr("feature", feature);
                }
                StanzaError {
                    type_: ErrorType::Cancel,
                    by: None,
                    defined_condition: condition,
                    texts: Default::default(),
                    other: if pubsub_condition.is_empty() {
                        None
                    } else {
                        Some(other.build())
                    },
                }
            }
            PubSubFault::SubscriptionPending | PubSubFault::SubscriptionUnconfigured => {
                StanzaError::new(
                    ErrorType::Modify,
                    DefinedCondition::NotAcceptable,
                    "en",
                    fault.to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodeid_required_carries_application_condition() {
        let fault = PubSubFault::nodeid_required();
        let error = StanzaError::from(fault);
        assert_eq!(error.defined_condition, DefinedCondition::BadRequest);
        let other = error.other.unwrap();
        assert!(other.is("nodeid-required", ns::PUBSUB_ERRORS));
    }

    #[test]
    fn unsupported_carries_feature_attribute() {
        let fault = PubSubFault::unsupported("publish");
        let error = StanzaError::from(fault);
        assert_eq!(error.defined_condition, DefinedCondition::FeatureNotImplemented);
        let other = error.other.unwrap();
        assert!(other.is("unsupported", ns::PUBSUB_ERRORS));
        assert_eq!(other.attr("feature"), Some("publish"));
    }
}
