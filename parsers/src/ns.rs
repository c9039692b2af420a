// Copyright (c) 2017 Emmanuel Gil Peyrot <linkmauve@linkmauve.fr>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! XML namespace constants used throughout this crate.

/// The namespace of the top-level stanza elements (`<iq/>`, `<message/>`,
/// `<presence/>`), which differs depending on whether we act as a client or
/// as a server-side component.
pub const DEFAULT_NS: &str = if cfg!(feature = "component") {
    "jabber:component:accept"
} else {
    "jabber:client"
};

/// `urn:ietf:params:xml:ns:xmpp-stanzas`, carries the defined stanza-error
/// conditions.
pub const XMPP_STANZAS: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

/// `jabber:x:data`, XEP-0004 Data Forms.
pub const DATA_FORMS: &str = "jabber:x:data";

/// `urn:xmpp:media-element`, XEP-0221 media element used inside Data Form
/// fields.
pub const MEDIA_ELEMENT: &str = "urn:xmpp:media-element";

/// `http://jabber.org/protocol/disco#info`, XEP-0030 Service Discovery
/// (info request/result).
pub const DISCO_INFO: &str = "http://jabber.org/protocol/disco#info";

/// `http://jabber.org/protocol/disco#items`, XEP-0030 Service Discovery
/// (items request/result).
pub const DISCO_ITEMS: &str = "http://jabber.org/protocol/disco#items";

/// `http://jabber.org/protocol/pubsub`, XEP-0060 core pubsub requests.
pub const PUBSUB: &str = "http://jabber.org/protocol/pubsub";

/// `http://jabber.org/protocol/pubsub#event`, XEP-0060 event notifications.
pub const PUBSUB_EVENT: &str = "http://jabber.org/protocol/pubsub#event";

/// `http://jabber.org/protocol/pubsub#errors`, XEP-0060 application error
/// conditions.
pub const PUBSUB_ERRORS: &str = "http://jabber.org/protocol/pubsub#errors";

/// `http://jabber.org/protocol/pubsub#owner`, XEP-0060 owner requests.
pub const PUBSUB_OWNER: &str = "http://jabber.org/protocol/pubsub#owner";

/// `http://jabber.org/protocol/pubsub#node_config`, form namespace for node
/// configuration.
pub const PUBSUB_NODE_CONFIG: &str = "http://jabber.org/protocol/pubsub#node_config";

/// `http://jabber.org/protocol/pubsub#meta-data`, form namespace for node
/// meta-data disco extensions.
pub const PUBSUB_META_DATA: &str = "http://jabber.org/protocol/pubsub#meta-data";

/// `http://jabber.org/protocol/pubsub#subscribe_options`, form namespace for
/// subscription options.
pub const PUBSUB_SUBSCRIBE_OPTIONS: &str = "http://jabber.org/protocol/pubsub#subscribe_options";

/// `http://jabber.org/protocol/shim`, XEP-0131 Stanza Headers and Internet
/// Metadata, used here to carry the `Collection` header on event
/// notifications.
pub const SHIM: &str = "http://jabber.org/protocol/shim";
