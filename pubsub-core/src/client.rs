// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The client-side half of the protocol: building outgoing requests,
//! decoding their results, and dispatching inbound notifications.

use jid::Jid;
use minidom::Element;

use xmpp_parsers::iq::IqType;
use xmpp_parsers::ns;

use crate::domain::{Item, ItemOrRetract};
use crate::error::PubSubFault;
use crate::event::{self, Notification};
use crate::request::{PubSubRequest, Verb};
use crate::stream::{XmlStream, XmlStreamError};

impl From<XmlStreamError> for PubSubFault {
    fn from(error: XmlStreamError) -> PubSubFault {
        PubSubFault::bad_request(error.to_string())
    }
}

fn bare_request(verb: Verb, sender: Option<Jid>, recipient: Jid) -> PubSubRequest {
    PubSubRequest {
        verb,
        sender,
        recipient: Some(recipient),
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

fn stanza_error_to_fault(error: xmpp_parsers::stanza_error::StanzaError) -> PubSubFault {
    PubSubFault::bad_request(
        error
            .texts
            .get("en")
            .cloned()
            .unwrap_or_else(|| format!("{:?}", error.defined_condition)),
    )
}

/// A publish-subscribe client: the request-sending half of the protocol,
/// parameterised over the stream the IQs actually travel through.
pub struct Client<S: XmlStream> {
    stream: S,
    sender: Option<Jid>,
    next_id: std::cell::Cell<u64>,
}

impl<S: XmlStream> Client<S> {
    /// Wrap a stream, optionally stamping every outgoing request with
    /// `sender` as its `from`.
    pub fn new(stream: S, sender: Option<Jid>) -> Client<S> {
        Client {
            stream,
            sender,
            next_id: std::cell::Cell::new(0),
        }
    }

    fn next_request_id(&self) -> String {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        format!("pubsub{id}")
    }

    /// Send `request` and return the `<pubsub/>`/`<pubsub-owner/>` payload
    /// of its `result` response, or `None` for an empty result.
    async fn send(&self, request: PubSubRequest) -> Result<Option<Element>, PubSubFault> {
        let iq = request.to_iq(self.next_request_id());
        let response = self.stream.send_iq(iq).await?;
        match response.payload {
            IqType::Result(payload) => Ok(payload),
            IqType::Error(error) => Err(stanza_error_to_fault(error)),
            _ => Err(PubSubFault::bad_request("expected a result or error IQ")),
        }
    }

    /// Create a node at `service`, optionally suggesting `node_identifier`.
    /// Returns the identifier the service actually assigned.
    pub async fn create_node(
        &self,
        service: Jid,
        node_identifier: Option<String>,
    ) -> Result<String, PubSubFault> {
        let mut request = bare_request(Verb::Create, self.sender.clone(), service);
        request.node_identifier = node_identifier.clone();
        let payload = self.send(request).await?;
        let assigned = payload
            .as_ref()
            .and_then(|pubsub| pubsub.get_child("create", ns::PUBSUB))
            .and_then(|create| create.attr("node"))
            .map(str::to_string);
        assigned
            .or(node_identifier)
            .ok_or_else(|| PubSubFault::bad_request("service assigned no node identifier"))
    }

    /// Delete a node at `service`.
    pub async fn delete_node(&self, service: Jid, node_identifier: String) -> Result<(), PubSubFault> {
        let mut request = bare_request(Verb::Delete, self.sender.clone(), service);
        request.node_identifier = Some(node_identifier);
        self.send(request).await?;
        Ok(())
    }

    /// Subscribe `subscriber` to `node_identifier` at `service`.
    ///
    /// Returns `Err(PubSubFault::SubscriptionPending)` or
    /// `Err(PubSubFault::SubscriptionUnconfigured)` when the service could
    /// not immediately grant a full subscription.
    pub async fn subscribe(
        &self,
        service: Jid,
        node_identifier: String,
        subscriber: Jid,
    ) -> Result<(), PubSubFault> {
        let mut request = bare_request(Verb::Subscribe, self.sender.clone(), service);
        request.node_identifier = Some(node_identifier);
        request.subscriber = Some(subscriber);
        let payload = self.send(request).await?;
        let state = payload
            .as_ref()
            .and_then(|pubsub| pubsub.get_child("subscription", ns::PUBSUB))
            .and_then(|subscription| subscription.attr("subscription"))
            .unwrap_or("subscribed");

        match state {
            "pending" => Err(PubSubFault::SubscriptionPending),
            "unconfigured" => Err(PubSubFault::SubscriptionUnconfigured),
            _ => Ok(()),
        }
    }

    /// Unsubscribe `subscriber` from `node_identifier` at `service`.
    pub async fn unsubscribe(
        &self,
        service: Jid,
        node_identifier: String,
        subscriber: Jid,
    ) -> Result<(), PubSubFault> {
        let mut request = bare_request(Verb::Unsubscribe, self.sender.clone(), service);
        request.node_identifier = Some(node_identifier);
        request.subscriber = Some(subscriber);
        self.send(request).await?;
        Ok(())
    }

    /// Publish `items` to `node_identifier` at `service`.
    pub async fn publish(
        &self,
        service: Jid,
        node_identifier: String,
        items: Vec<Item>,
    ) -> Result<(), PubSubFault> {
        let mut request = bare_request(Verb::Publish, self.sender.clone(), service);
        request.node_identifier = Some(node_identifier);
        request.items = items.into_iter().map(Into::into).collect();
        self.send(request).await?;
        Ok(())
    }

    /// Retrieve previously published items from `node_identifier` at
    /// `service`, optionally limited to `max_items` most recent ones.
    pub async fn items(
        &self,
        service: Jid,
        node_identifier: String,
        max_items: Option<u32>,
    ) -> Result<Vec<Item>, PubSubFault> {
        let mut request = bare_request(Verb::Items, self.sender.clone(), service);
        request.node_identifier = Some(node_identifier);
        request.max_items = max_items;
        let payload = self.send(request).await?;
        let items = payload
            .as_ref()
            .and_then(|pubsub| pubsub.get_child("items", ns::PUBSUB))
            .map(|items| {
                items
                    .children()
                    .filter(|child| child.is("item", ns::PUBSUB))
                    .cloned()
                    .map(|element| Item {
                        id: element.attr("id").map(str::to_string),
                        element,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }
}

/// Dispatch an inbound notification message to the appropriate observer
/// callback, mirroring the three notification kinds XEP-0060 defines.
pub trait NotificationObserver {
    /// Called for new, updated or retracted items.
    fn items_received(&self, sender: Jid, node_identifier: String, items: Vec<ItemOrRetract>);

    /// Called when a node is deleted.
    fn delete_received(&self, sender: Jid, node_identifier: String, redirect_uri: Option<String>);

    /// Called when a node's items are purged.
    fn purge_received(&self, sender: Jid, node_identifier: String);
}

/// Decode `message` and dispatch it to `observer`, doing nothing if the
/// message carries no recognised pubsub event.
pub fn dispatch_notification<O: NotificationObserver>(
    message: &xmpp_parsers::message::Message,
    observer: &O,
) {
    match event::parse(message) {
        Some(Notification::Items(items_event)) => {
            let items = items_event
                .items
                .into_iter()
                .map(|element| {
                    if element.name() == "retract" {
                        ItemOrRetract::Retract(element.attr("id").unwrap_or_default().to_string())
                    } else {
                        ItemOrRetract::Item(Item {
                            id: element.attr("id").map(str::to_string),
                            element,
                        })
                    }
                })
                .collect();
            observer.items_received(items_event.event.sender, items_event.event.node_identifier, items);
        }
        Some(Notification::Delete(delete_event)) => {
            observer.delete_received(
                delete_event.event.sender,
                delete_event.event.node_identifier,
                delete_event.redirect_uri,
            );
        }
        Some(Notification::Purge(purge_event)) => {
            observer.purge_received(purge_event.event.sender, purge_event.event.node_identifier);
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::test_support::RecordingStream;
    use xmpp_parsers::iq::Iq;

    fn jid(s: &str) -> Jid {
        s.parse().unwrap()
    }

    fn result_iq(id: &str, body: &str) -> Iq {
        let elem: Element = format!("<iq xmlns='jabber:client' type='result' id='{id}'>{body}</iq>")
            .parse()
            .unwrap();
        Iq::try_from(elem).unwrap()
    }

    #[test]
    fn create_node_prefers_service_assigned_identifier() {
        let stream = RecordingStream::default();
        stream.responses.borrow_mut().push(result_iq(
            "pubsub0",
            "<pubsub xmlns='http://jabber.org/protocol/pubsub'><create node='generated-1'/></pubsub>",
        ));
        let client = Client::new(stream, Some(jid("user@example.org")));
        let assigned =
            futures::executor::block_on(client.create_node(jid("pubsub.example.org"), None)).unwrap();
        assert_eq!(assigned, "generated-1");
    }

    #[test]
    fn subscribe_reports_pending_state() {
        let stream = RecordingStream::default();
        stream.responses.borrow_mut().push(result_iq(
            "pubsub0",
            "<pubsub xmlns='http://jabber.org/protocol/pubsub'>\
               <subscription node='news' jid='user@example.org' subscription='pending'/>\
             </pubsub>",
        ));
        let client = Client::new(stream, Some(jid("user@example.org")));
        let error = futures::executor::block_on(client.subscribe(
            jid("pubsub.example.org"),
            "news".to_string(),
            jid("user@example.org"),
        ))
        .unwrap_err();
        assert_eq!(error, PubSubFault::SubscriptionPending);
    }

    #[test]
    fn items_extracts_item_elements() {
        let stream = RecordingStream::default();
        stream.responses.borrow_mut().push(result_iq(
            "pubsub0",
            "<pubsub xmlns='http://jabber.org/protocol/pubsub'>\
               <items node='news'><item id='1'/><item id='2'/></items>\
             </pubsub>",
        ));
        let client = Client::new(stream, None);
        let items = futures::executor::block_on(client.items(
            jid("pubsub.example.org"),
            "news".to_string(),
            None,
        ))
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id.as_deref(), Some("1"));
    }

    struct RecordingObserver {
        items: std::cell::RefCell<Vec<(String, Vec<ItemOrRetract>)>>,
    }

    impl NotificationObserver for RecordingObserver {
        fn items_received(&self, _sender: Jid, node_identifier: String, items: Vec<ItemOrRetract>) {
            self.items.borrow_mut().push((node_identifier, items));
        }

        fn delete_received(&self, _sender: Jid, _node_identifier: String, _redirect_uri: Option<String>) {}

        fn purge_received(&self, _sender: Jid, _node_identifier: String) {}
    }

    #[test]
    fn dispatch_notification_calls_items_received() {
        let message: Element = "<message xmlns='jabber:client' from='pubsub.example.org' to='user@example.org'>\
               <event xmlns='http://jabber.org/protocol/pubsub#event'>\
                 <items node='news'><item id='1'/></items>\
               </event>\
             </message>"
            .parse()
            .unwrap();
        let message = xmpp_parsers::message::Message::try_from(message).unwrap();
        let observer = RecordingObserver { items: Default::default() };
        dispatch_notification(&message, &observer);
        let recorded = observer.items.borrow();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "news");
        match &recorded[0].1[..] {
            [ItemOrRetract::Item(item)] => assert_eq!(item.id.as_deref(), Some("1")),
            other => panic!("expected a single item, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_notification_preserves_retractions() {
        let message: Element = "<message xmlns='jabber:client' from='pubsub.example.org' to='user@example.org'>\
               <event xmlns='http://jabber.org/protocol/pubsub#event'>\
                 <items node='news'><retract id='2'/></items>\
               </event>\
             </message>"
            .parse()
            .unwrap();
        let message = xmpp_parsers::message::Message::try_from(message).unwrap();
        let observer = RecordingObserver { items: Default::default() };
        dispatch_notification(&message, &observer);
        let recorded = observer.items.borrow();
        assert_eq!(recorded[0].1, vec![ItemOrRetract::Retract("2".to_string())]);
    }
}
