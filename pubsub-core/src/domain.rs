// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Domain types shared by the service and client handlers.

use std::collections::BTreeMap;

use jid::Jid;
use minidom::Element;
use xmpp_parsers::pubsub::SubscriptionState;

/// A value carried by a configuration or options form field: either a
/// single scalar, or a sequence of them for multi-valued fields.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// A single value, as carried by e.g. `text-single`/`list-single`.
    Single(String),
    /// Several values, as carried by e.g. `text-multi`/`list-multi`.
    Multi(Vec<String>),
}

impl FormValue {
    /// Returns the value as a slice, regardless of arity.
    pub fn as_slice(&self) -> &[String] {
        match self {
            FormValue::Single(v) => std::slice::from_ref(v),
            FormValue::Multi(v) => v,
        }
    }
}

/// A subscriber's subscription to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    /// The identifier of the node subscribed to. The root node is denoted
    /// by `None`.
    pub node_identifier: Option<String>,

    /// The subscribing entity.
    pub subscriber: Jid,

    /// The subscription state.
    pub state: SubscriptionState,

    /// Subscription options, keyed by form field name.
    pub options: BTreeMap<String, FormValue>,
}

impl Subscription {
    /// Create a subscription with no options set.
    pub fn new(node_identifier: Option<String>, subscriber: Jid, state: SubscriptionState) -> Self {
        Subscription {
            node_identifier,
            subscriber,
            state,
            options: BTreeMap::new(),
        }
    }
}

/// The type of a pubsub node, as requested by `create`/`default` and
/// reported by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A leaf node: items are published directly to it.
    Leaf,
    /// A collection node: a grouping of other nodes.
    Collection,
}

impl NodeType {
    /// The `pubsub#node_type` form field value for this node type.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Leaf => "leaf",
            NodeType::Collection => "collection",
        }
    }

    /// Parse a `pubsub#node_type` form field value, defaulting to `Leaf`
    /// when the field is absent. Returns `None` if the field is present but
    /// names neither `"leaf"` nor `"collection"`.
    pub fn from_field_value(value: Option<&str>) -> Option<NodeType> {
        match value {
            None => Some(NodeType::Leaf),
            Some("leaf") => Some(NodeType::Leaf),
            Some("collection") => Some(NodeType::Collection),
            Some(_) => None,
        }
    }
}

/// Per-node metadata as reported by a backend to the discovery adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    /// The type of the node.
    pub node_type: NodeType,

    /// Additional meta-data fields, `(var, value)` pairs, as surfaced in a
    /// result-type form in the meta-data namespace.
    pub meta_data: Vec<(String, String)>,
}

/// An opaque item published to a node.
///
/// Kept as the raw XML element, never decoded into a structured type, so
/// that arbitrary payloads round-trip unmodified between backend and wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// The item identifier, unique within a node when enforced by the
    /// backend.
    pub id: Option<String>,

    /// The full `<item/>` element, namespace `pubsub`, including the `id`
    /// attribute and payload child if any.
    pub element: Element,
}

impl Item {
    /// Build an `<item/>` element in the pubsub namespace with the given
    /// id and optional payload.
    pub fn new(id: Option<&str>, payload: Option<Element>) -> Item {
        let mut builder = Element::builder("item", xmpp_parsers::ns::PUBSUB);
        if let Some(id) = id {
            builder = builder.attr("id", id);
        }
        let element = builder.append_all(payload).build();
        Item {
            id: id.map(String::from),
            element,
        }
    }
}

impl From<Item> for Element {
    fn from(item: Item) -> Element {
        item.element
    }
}

/// An element carried by an items notification: either a published item, or
/// the retraction of a previously published one.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOrRetract {
    /// A new or updated item.
    Item(Item),
    /// The id of a retracted item.
    Retract(String),
}
