// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Inbound pubsub notifications, decoded from the `<event/>` child of a
//! `<message/>` stanza.

use std::collections::BTreeMap;

use jid::Jid;
use log::trace;
use minidom::Element;

use xmpp_parsers::message::Message;
use xmpp_parsers::ns;

use crate::shim;

/// Fields common to every pubsub notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PubSubEvent {
    /// The entity the notification was received from.
    pub sender: Jid,
    /// The entity the notification was sent to.
    pub recipient: Jid,
    /// The node the event pertains to.
    pub node_identifier: String,
    /// SHIM headers carried by the enclosing message, if any.
    pub headers: BTreeMap<String, Vec<String>>,
}

/// New, updated or retracted items.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsEvent {
    /// Fields common to every notification.
    pub event: PubSubEvent,
    /// The `<item/>`/`<retract/>` children, kept opaque.
    pub items: Vec<Element>,
}

/// A node was deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteEvent {
    /// Fields common to every notification.
    pub event: PubSubEvent,
    /// The URI subscribers should redirect to, if the deletion notice named
    /// one.
    pub redirect_uri: Option<String>,
}

/// A node's items were purged.
#[derive(Debug, Clone, PartialEq)]
pub struct PurgeEvent {
    /// Fields common to every notification.
    pub event: PubSubEvent,
}

/// The decoded variants of a pubsub notification, dispatched on the local
/// name of the action element found inside `<event/>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// See [`ItemsEvent`].
    Items(ItemsEvent),
    /// See [`DeleteEvent`].
    Delete(DeleteEvent),
    /// See [`PurgeEvent`].
    Purge(PurgeEvent),
}

/// Decode an inbound `<message/>` into a [`Notification`], returning `None`
/// when the message is missing a `from` or `to` address, carries no
/// `<event xmlns='...#event'/>` child, or the action element inside it is
/// not recognised.
pub fn parse(message: &Message) -> Option<Notification> {
    let sender = message.from.clone()?;
    let recipient = message.to.clone()?;

    let event_element = message
        .payloads
        .iter()
        .find(|child| child.is("event", ns::PUBSUB_EVENT))?;

    let action = event_element
        .children()
        .find(|child| child.ns() == ns::PUBSUB_EVENT)?;

    let node_identifier = action.attr("node").unwrap_or_default().to_string();

    let mut wrapper = Element::builder("wrapper", ns::DEFAULT_NS).build();
    for child in &message.payloads {
        wrapper.append_child(child.clone());
    }
    let headers = shim::extract_headers(&wrapper);

    let event = PubSubEvent {
        sender,
        recipient,
        node_identifier,
        headers,
    };

    match action.name() {
        "items" => {
            let items = action
                .children()
                .filter(|child| child.name() == "item" || child.name() == "retract")
                .cloned()
                .collect();
            Some(Notification::Items(ItemsEvent { event, items }))
        }
        "delete" => {
            let redirect_uri = action
                .children()
                .find(|child| child.name() == "redirect")
                .and_then(|redirect| redirect.attr("uri"))
                .map(str::to_string);
            Some(Notification::Delete(DeleteEvent { event, redirect_uri }))
        }
        "purge" => Some(Notification::Purge(PurgeEvent { event })),
        other => {
            trace!("unrecognised pubsub event action: {}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> Message {
        let elem: Element = format!(
            "<message xmlns='jabber:client' from='pubsub.example.org' to='user@example.org'>{body}</message>"
        )
        .parse()
        .unwrap();
        Message::try_from(elem).unwrap()
    }

    #[test]
    fn parses_items_notification() {
        let msg = message(
            "<event xmlns='http://jabber.org/protocol/pubsub#event'>\
               <items node='news'><item id='1'/></items>\
             </event>",
        );
        let notification = parse(&msg).unwrap();
        match notification {
            Notification::Items(items_event) => {
                assert_eq!(items_event.event.node_identifier, "news");
                assert_eq!(items_event.items.len(), 1);
            }
            _ => panic!("expected an items notification"),
        }
    }

    #[test]
    fn parses_delete_notification_with_redirect() {
        let msg = message(
            "<event xmlns='http://jabber.org/protocol/pubsub#event'>\
               <delete node='news'><redirect uri='xmpp:new@example.org?;node=news'/></delete>\
             </event>",
        );
        let notification = parse(&msg).unwrap();
        match notification {
            Notification::Delete(delete_event) => {
                assert_eq!(delete_event.event.node_identifier, "news");
                assert_eq!(
                    delete_event.redirect_uri.as_deref(),
                    Some("xmpp:new@example.org?;node=news")
                );
            }
            _ => panic!("expected a delete notification"),
        }
    }

    #[test]
    fn parses_purge_notification() {
        let msg = message(
            "<event xmlns='http://jabber.org/protocol/pubsub#event'>\
               <purge node='news'/>\
             </event>",
        );
        let notification = parse(&msg).unwrap();
        assert!(matches!(notification, Notification::Purge(_)));
    }

    #[test]
    fn message_without_event_yields_none() {
        let msg = message("<body>hello</body>");
        assert!(parse(&msg).is_none());
    }

    #[test]
    fn message_without_from_yields_none() {
        let elem: Element = "<message xmlns='jabber:client' to='user@example.org'>\
               <event xmlns='http://jabber.org/protocol/pubsub#event'>\
                 <purge node='news'/>\
               </event>\
             </message>"
            .parse()
            .unwrap();
        let msg = Message::try_from(elem).unwrap();
        assert!(parse(&msg).is_none());
    }

    #[test]
    fn message_without_to_yields_none() {
        let elem: Element = "<message xmlns='jabber:client' from='pubsub.example.org'>\
               <event xmlns='http://jabber.org/protocol/pubsub#event'>\
                 <purge node='news'/>\
               </event>\
             </message>"
            .parse()
            .unwrap();
        let msg = Message::try_from(elem).unwrap();
        assert!(parse(&msg).is_none());
    }
}
