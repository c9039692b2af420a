// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The service-side half of the protocol: dispatching decoded requests to a
//! [`PubSubBackend`] and composing the IQ responses and notifications that
//! go back out on the wire.

use jid::Jid;
use log::{trace, warn};
use minidom::Element;

use xmpp_parsers::data_forms::{DataForm, DataFormType, Field, FieldType};
use xmpp_parsers::disco::{DiscoInfoResult, DiscoItemsResult, Feature, Identity, Item as DiscoItem};
use xmpp_parsers::ns;

use crate::domain::{FormValue, Item, NodeInfo, NodeType, Subscription};
use crate::error::PubSubFault;
use crate::request::{PubSubRequest, Verb};
use crate::shim;

/// The capabilities a pubsub service backend offers.
///
/// Every method defaults to refusing the operation with
/// [`PubSubFault::unsupported`], naming the XEP-0060 feature that would be
/// required; backends override only the methods for the features they
/// implement.
pub trait PubSubBackend {
    /// Fetch metadata about a node for service discovery. `None` means the
    /// node does not exist, or the root node carries no metadata.
    async fn node_info(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
    ) -> Result<Option<NodeInfo>, PubSubFault> {
        Ok(None)
    }

    /// List the child nodes of `service`, for service discovery.
    async fn nodes(&self, _requestor: Option<&Jid>, _service: &Jid) -> Result<Vec<String>, PubSubFault> {
        Ok(Vec::new())
    }

    /// Publish `items` to `node_identifier`.
    async fn publish(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
        _items: Vec<Item>,
    ) -> Result<(), PubSubFault> {
        Err(PubSubFault::unsupported("publish"))
    }

    /// Subscribe `subscriber` to `node_identifier`.
    async fn subscribe(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
        _subscriber: &Jid,
    ) -> Result<Subscription, PubSubFault> {
        Err(PubSubFault::unsupported("subscribe"))
    }

    /// Unsubscribe `subscriber` from `node_identifier`.
    async fn unsubscribe(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
        _subscriber: &Jid,
    ) -> Result<(), PubSubFault> {
        Err(PubSubFault::unsupported("subscribe"))
    }

    /// List a requestor's subscriptions at `service`.
    async fn subscriptions(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
    ) -> Result<Vec<Subscription>, PubSubFault> {
        Err(PubSubFault::unsupported("retrieve-subscriptions"))
    }

    /// List a requestor's affiliations at `service`, as `(node, affiliation)`
    /// pairs.
    async fn affiliations(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
    ) -> Result<Vec<(String, String)>, PubSubFault> {
        Err(PubSubFault::unsupported("retrieve-affiliations"))
    }

    /// Create a node, optionally honouring a suggested identifier. Returns
    /// the actual identifier assigned.
    async fn create(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: Option<&str>,
    ) -> Result<String, PubSubFault> {
        Err(PubSubFault::unsupported("create-nodes"))
    }

    /// The configuration option schema this backend exposes, as
    /// `(field_name, label)` pairs.
    fn configuration_options(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    /// The default configuration values for a newly created node of
    /// `node_type`.
    async fn default_configuration(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_type: NodeType,
    ) -> Result<Vec<(String, FormValue)>, PubSubFault> {
        Err(PubSubFault::unsupported("retrieve-default"))
    }

    /// The current configuration of `node_identifier`.
    async fn configuration(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
    ) -> Result<Vec<(String, FormValue)>, PubSubFault> {
        Err(PubSubFault::unsupported("config-node"))
    }

    /// Apply new configuration `values` to `node_identifier`.
    async fn set_configuration(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
        _values: Vec<(String, FormValue)>,
    ) -> Result<(), PubSubFault> {
        Err(PubSubFault::unsupported("config-node"))
    }

    /// Retrieve items from `node_identifier`, optionally limited to
    /// `max_items` most recent ones, or a specific set of `item_identifiers`.
    async fn items(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
        _max_items: Option<u32>,
        _item_identifiers: &[String],
    ) -> Result<Vec<Item>, PubSubFault> {
        Err(PubSubFault::unsupported("retrieve-items"))
    }

    /// Retract `item_identifiers` from `node_identifier`.
    async fn retract(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
        _item_identifiers: &[String],
    ) -> Result<(), PubSubFault> {
        Err(PubSubFault::unsupported("retract-items"))
    }

    /// Remove every item from `node_identifier`.
    async fn purge(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
    ) -> Result<(), PubSubFault> {
        Err(PubSubFault::unsupported("purge-nodes"))
    }

    /// Delete `node_identifier` entirely.
    async fn delete(
        &self,
        _requestor: Option<&Jid>,
        _service: &Jid,
        _node_identifier: &str,
    ) -> Result<(), PubSubFault> {
        Err(PubSubFault::unsupported("delete-nodes"))
    }
}

/// Service discovery identity reported for the service itself, absent a
/// node identifier in the request.
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    /// The disco category, e.g. `"pubsub"`.
    pub category: &'static str,
    /// The disco type, e.g. `"generic"`.
    pub type_: &'static str,
    /// A human readable name.
    pub name: &'static str,
}

impl Default for ServiceIdentity {
    fn default() -> ServiceIdentity {
        ServiceIdentity {
            category: "pubsub",
            type_: "generic",
            name: "Generic Publish-Subscribe Service",
        }
    }
}

/// A XEP-0060 publish-subscribe service: request dispatch, discovery and
/// notification composition, parameterised over a [`PubSubBackend`].
pub struct Service<B: PubSubBackend> {
    backend: B,
    /// Service discovery identity, absent a specific node.
    pub disco_identity: ServiceIdentity,
    /// Supported `http://jabber.org/protocol/pubsub#<feature>` suffixes
    /// advertised on service discovery of the root node.
    pub pub_sub_features: Vec<&'static str>,
    /// When set, `disco_items` on the root node always returns an empty
    /// list, regardless of what the backend's node listing would yield.
    pub hide_nodes: bool,
}

impl<B: PubSubBackend> Service<B> {
    /// Wrap a backend with default discovery metadata.
    pub fn new(backend: B) -> Service<B> {
        Service {
            backend,
            disco_identity: ServiceIdentity::default(),
            pub_sub_features: Vec::new(),
            hide_nodes: false,
        }
    }

    /// Dispatch a decoded request to the appropriate backend call and
    /// compose the `<pubsub/>`/`<pubsub-owner/>` response payload. Returns
    /// `None` when the operation has no body (an empty IQ result suffices).
    pub async fn dispatch(&self, request: &PubSubRequest) -> Result<Option<Element>, PubSubFault> {
        trace!("pubsub request: {:?}", request);
        let service = request
            .recipient
            .as_ref()
            .ok_or_else(|| PubSubFault::bad_request("missing recipient"))?;
        let requestor = request.sender.as_ref();

        let result = self.dispatch_verb(request, requestor, service).await;
        if let Err(ref fault) = result {
            warn!("pubsub request refused: {}", fault);
        }
        result
    }

    async fn dispatch_verb(
        &self,
        request: &PubSubRequest,
        requestor: Option<&Jid>,
        service: &Jid,
    ) -> Result<Option<Element>, PubSubFault> {
        match request.verb {
            Verb::Publish => {
                let node_identifier = require_node(request)?;
                let items = request
                    .items
                    .iter()
                    .cloned()
                    .map(|element| Item {
                        id: element.attr("id").map(str::to_string),
                        element,
                    })
                    .collect();
                self.backend
                    .publish(requestor, service, node_identifier, items)
                    .await?;
                Ok(None)
            }
            Verb::Subscribe => {
                let node_identifier = request.node_identifier.as_deref().unwrap_or("");
                let subscriber = request
                    .subscriber
                    .as_ref()
                    .ok_or_else(PubSubFault::jid_required)?;
                let subscription = self
                    .backend
                    .subscribe(requestor, service, node_identifier, subscriber)
                    .await?;
                Ok(Some(subscription_response(&subscription)))
            }
            Verb::Unsubscribe => {
                let node_identifier = request.node_identifier.as_deref().unwrap_or("");
                let subscriber = request
                    .subscriber
                    .as_ref()
                    .ok_or_else(PubSubFault::jid_required)?;
                self.backend
                    .unsubscribe(requestor, service, node_identifier, subscriber)
                    .await?;
                Ok(None)
            }
            Verb::OptionsGet | Verb::OptionsSet => Err(PubSubFault::unsupported("subscription-options")),
            Verb::Subscriptions => {
                let subscriptions = self.backend.subscriptions(requestor, service).await?;
                Ok(Some(subscriptions_response(&subscriptions)))
            }
            Verb::Affiliations => {
                let affiliations = self.backend.affiliations(requestor, service).await?;
                Ok(Some(affiliations_response(&affiliations)))
            }
            Verb::Create => {
                let suggested = request.node_identifier.as_deref();
                let assigned = self.backend.create(requestor, service, suggested).await?;
                if suggested.is_none() || suggested != Some(assigned.as_str()) {
                    let mut create = Element::builder("create", ns::PUBSUB).build();
                    create.set_attr("node", assigned);
                    Ok(Some(Element::builder("pubsub", ns::PUBSUB).append(create).build()))
                } else {
                    Ok(None)
                }
            }
            Verb::Default => {
                let node_type = request.node_type.unwrap_or(NodeType::Leaf);
                let values = self
                    .backend
                    .default_configuration(requestor, service, node_type)
                    .await?;
                let form = self.configuration_form(DataFormType::Form, &values);
                let default = Element::builder("default", ns::PUBSUB_OWNER).append(form).build();
                Ok(Some(
                    Element::builder("pubsub", ns::PUBSUB_OWNER).append(default).build(),
                ))
            }
            Verb::ConfigureGet => {
                let node_identifier = request.node_identifier.as_deref().unwrap_or("");
                let values = self.backend.configuration(requestor, service, node_identifier).await?;
                let form = self.configuration_form(DataFormType::Form, &values);
                let mut configure = Element::builder("configure", ns::PUBSUB_OWNER).append(form).build();
                if !node_identifier.is_empty() {
                    configure.set_attr("node", node_identifier);
                }
                Ok(Some(
                    Element::builder("pubsub", ns::PUBSUB_OWNER).append(configure).build(),
                ))
            }
            Verb::ConfigureSet => {
                if request.options.is_empty() {
                    return Ok(None);
                }
                let node_identifier = request.node_identifier.as_deref().unwrap_or("");
                let values = request
                    .options
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                self.backend
                    .set_configuration(requestor, service, node_identifier, values)
                    .await?;
                Ok(None)
            }
            Verb::Items => {
                let node_identifier = require_node(request)?;
                let results = self
                    .backend
                    .items(
                        requestor,
                        service,
                        node_identifier,
                        request.max_items,
                        &request.item_identifiers,
                    )
                    .await?;
                let mut items = Element::builder("items", ns::PUBSUB).build();
                items.set_attr("node", node_identifier);
                for item in results {
                    items.append_child(item.element);
                }
                Ok(Some(Element::builder("pubsub", ns::PUBSUB).append(items).build()))
            }
            Verb::Retract => {
                let node_identifier = require_node(request)?;
                self.backend
                    .retract(requestor, service, node_identifier, &request.item_identifiers)
                    .await?;
                Ok(None)
            }
            Verb::Purge => {
                let node_identifier = require_node(request)?;
                self.backend.purge(requestor, service, node_identifier).await?;
                Ok(None)
            }
            Verb::Delete => {
                let node_identifier = require_node(request)?;
                self.backend.delete(requestor, service, node_identifier).await?;
                Ok(None)
            }
            Verb::AffiliationsGet | Verb::AffiliationsSet => {
                Err(PubSubFault::unsupported("modify-affiliations"))
            }
            Verb::SubscriptionsGet | Verb::SubscriptionsSet => {
                Err(PubSubFault::unsupported("manage-subscriptions"))
            }
        }
    }

    fn configuration_form(&self, type_: DataFormType, values: &[(String, FormValue)]) -> Element {
        let options = self.backend.configuration_options();
        let mut fields = Vec::new();
        for (name, value) in values {
            let Some((var, label)) = options.iter().find(|(var, _)| *var == name.as_str()) else {
                continue;
            };
            let mut field = Field::new(var, FieldType::TextSingle);
            field.label = Some(label.to_string());
            field.values = value.as_slice().to_vec();
            fields.push(field);
        }
        Element::from(DataForm::new(type_, ns::PUBSUB_NODE_CONFIG, fields))
    }

    /// Answer a disco#info query, naming the service itself (absent a node)
    /// or a specific node's type and meta-data (when named).
    pub async fn disco_info(
        &self,
        requestor: Option<&Jid>,
        service: &Jid,
        node_identifier: &str,
    ) -> Result<DiscoInfoResult, PubSubFault> {
        let mut identities = Vec::new();
        let mut features = Vec::new();
        let mut extensions = Vec::new();

        if node_identifier.is_empty() {
            identities.push(Identity::new_anonymous(
                self.disco_identity.category,
                self.disco_identity.type_,
            ));
            features.push(Feature::new(ns::DISCO_ITEMS));
            features.extend(
                self.pub_sub_features
                    .iter()
                    .map(|feature| Feature::new(format!("{}#{}", ns::PUBSUB, feature))),
            );
        }

        if let Some(info) = self.backend.node_info(requestor, service, node_identifier).await? {
            identities.push(Identity::new_anonymous("pubsub", info.node_type.as_str()));
            if !info.meta_data.is_empty() {
                let mut field = Field::new("pubsub#node_type", FieldType::TextSingle)
                    .with_value(info.node_type.as_str());
                field.label = Some("The type of node (collection or leaf)".to_string());
                let mut fields = vec![field];
                for (var, value) in info.meta_data {
                    fields.push(Field::new(&var, FieldType::TextSingle).with_value(&value));
                }
                extensions.push(DataForm::new(DataFormType::Result_, ns::PUBSUB_META_DATA, fields));
            }
        }

        if identities.is_empty() {
            return Err(PubSubFault::bad_request("unknown node"));
        }

        Ok(DiscoInfoResult {
            node: if node_identifier.is_empty() {
                None
            } else {
                Some(node_identifier.to_string())
            },
            identities,
            features,
            extensions,
        })
    }

    /// Answer a disco#items query, listing the service's child nodes
    /// whenever the query did not itself target a specific node.
    pub async fn disco_items(
        &self,
        requestor: Option<&Jid>,
        service: &Jid,
        node_identifier: &str,
    ) -> Result<DiscoItemsResult, PubSubFault> {
        if !node_identifier.is_empty() || self.hide_nodes {
            return Ok(DiscoItemsResult {
                node: (!node_identifier.is_empty()).then(|| node_identifier.to_string()),
                items: Vec::new(),
            });
        }
        let nodes = self.backend.nodes(requestor, service).await?;
        Ok(DiscoItemsResult {
            node: None,
            items: nodes
                .into_iter()
                .map(|node| DiscoItem {
                    jid: service.clone(),
                    node: Some(node),
                    name: None,
                })
                .collect(),
        })
    }

    /// Build the `<message/>` notifications for a publish, one per
    /// subscriber, tagging items re-published via a collection node with a
    /// `Collection` SHIM header.
    pub fn notify_publish(
        &self,
        service: &Jid,
        node_identifier: &str,
        notifications: &[(Jid, Vec<Subscription>, Vec<Item>)],
    ) -> Vec<Element> {
        notifications
            .iter()
            .map(|(subscriber, subscriptions, items)| {
                let action_children = items.iter().map(|item| item.element.clone()).collect();
                create_notification(
                    service,
                    node_identifier,
                    subscriber,
                    "items",
                    subscriptions,
                    action_children,
                )
            })
            .collect()
    }

    /// Build the `<message/>` notifications for a node deletion.
    pub fn notify_delete(
        &self,
        service: &Jid,
        node_identifier: &str,
        subscribers: &[Jid],
        redirect_uri: Option<&str>,
    ) -> Vec<Element> {
        subscribers
            .iter()
            .map(|subscriber| {
                let action_children = redirect_uri
                    .map(|uri| {
                        let mut redirect = Element::builder("redirect", ns::PUBSUB_EVENT).build();
                        redirect.set_attr("uri", uri);
                        redirect
                    })
                    .into_iter()
                    .collect();
                create_notification(service, node_identifier, subscriber, "delete", &[], action_children)
            })
            .collect()
    }
}

fn require_node(request: &PubSubRequest) -> Result<&str, PubSubFault> {
    request
        .node_identifier
        .as_deref()
        .filter(|node| !node.is_empty())
        .ok_or_else(PubSubFault::nodeid_required)
}

fn create_notification(
    service: &Jid,
    node_identifier: &str,
    subscriber: &Jid,
    event_type: &str,
    subscriptions: &[Subscription],
    action_children: Vec<Element>,
) -> Element {
    let mut action = Element::builder(event_type, ns::PUBSUB_EVENT)
        .append_all(action_children)
        .build();
    action.set_attr("node", node_identifier);

    let event = Element::builder("event", ns::PUBSUB_EVENT).append(action).build();

    let mut message = Element::builder("message", ns::DEFAULT_NS).append(event).build();
    message.set_attr("from", service.to_string());
    message.set_attr("to", subscriber.to_string());

    let headers: Vec<(String, String)> = subscriptions
        .iter()
        .filter(|subscription| subscription.node_identifier.as_deref() != Some(node_identifier))
        .filter_map(|subscription| {
            subscription
                .node_identifier
                .clone()
                .map(|node| ("Collection".to_string(), node))
        })
        .collect();
    if !headers.is_empty() {
        message.append_child(shim::build_headers(headers));
    }

    message
}

fn subscription_response(subscription: &Subscription) -> Element {
    let mut element = Element::builder("subscription", ns::PUBSUB).build();
    if let Some(node) = &subscription.node_identifier {
        element.set_attr("node", node.clone());
    }
    element.set_attr("jid", subscription.subscriber.to_string());
    element.set_attr("subscription", subscription.state.to_string());
    Element::builder("pubsub", ns::PUBSUB).append(element).build()
}

fn subscriptions_response(subscriptions: &[Subscription]) -> Element {
    let mut container = Element::builder("subscriptions", ns::PUBSUB).build();
    for subscription in subscriptions {
        let mut item = Element::builder("subscription", ns::PUBSUB).build();
        if let Some(node) = &subscription.node_identifier {
            item.set_attr("node", node.clone());
        }
        item.set_attr("jid", subscription.subscriber.to_string());
        item.set_attr("subscription", subscription.state.to_string());
        container.append_child(item);
    }
    Element::builder("pubsub", ns::PUBSUB).append(container).build()
}

fn affiliations_response(affiliations: &[(String, String)]) -> Element {
    let mut container = Element::builder("affiliations", ns::PUBSUB).build();
    for (node, affiliation) in affiliations {
        let mut item = Element::builder("affiliation", ns::PUBSUB).build();
        item.set_attr("node", node.clone());
        item.set_attr("affiliation", affiliation.clone());
        container.append_child(item);
    }
    Element::builder("pubsub", ns::PUBSUB).append(container).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend;

    impl PubSubBackend for EchoBackend {
        async fn publish(
            &self,
            _requestor: Option<&Jid>,
            _service: &Jid,
            _node_identifier: &str,
            _items: Vec<Item>,
        ) -> Result<(), PubSubFault> {
            Ok(())
        }
    }

    fn jid(s: &str) -> Jid {
        s.parse().unwrap()
    }

    #[test]
    fn require_node_rejects_empty_node() {
        let mut request = bare_request(Verb::Purge);
        request.node_identifier = Some(String::new());
        let error = require_node(&request).unwrap_err();
        assert_eq!(error, PubSubFault::nodeid_required());
    }

    fn bare_request(verb: Verb) -> PubSubRequest {
        PubSubRequest {
            verb,
            sender: Some(jid("user@example.org")),
            recipient: Some(jid("pubsub.example.org")),
            node_identifier: None,
            node_type: None,
            items: Vec::new(),
            item_identifiers: Vec::new(),
            max_items: None,
            subscriber: None,
            subscription_identifier: None,
            options: Default::default(),
        }
    }

    #[test]
    fn publish_dispatches_to_backend() {
        let service = Service::new(EchoBackend);
        let mut request = bare_request(Verb::Publish);
        request.node_identifier = Some("news".to_string());
        let response = futures::executor::block_on(service.dispatch(&request)).unwrap();
        assert!(response.is_none());
    }

    #[test]
    fn unsupported_verb_yields_unsupported_fault() {
        let service = Service::new(EchoBackend);
        let request = bare_request(Verb::AffiliationsGet);
        let error = futures::executor::block_on(service.dispatch(&request)).unwrap_err();
        assert!(matches!(error, PubSubFault::PubSubError { .. }));
    }
}
