// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An implementation of the XMPP Publish-Subscribe protocol
//! ([XEP-0060](https://xmpp.org/extensions/xep-0060.html)), independent of
//! any particular connection or transport.
//!
//! [`request::PubSubRequest`] is the wire codec: a single verb plus the
//! ordered parameter list the verb table assigns it, parsed out of an
//! inbound IQ or rendered onto an outbound one. [`service::Service`]
//! dispatches decoded requests to a [`service::PubSubBackend`]
//! implementation and composes responses and notifications.
//! [`client::Client`] is the other side: building requests and decoding
//! their results, and dispatching inbound [`event::Notification`]s. Both
//! sides talk to the network exclusively through [`stream::XmlStream`].

pub mod client;
pub mod domain;
pub mod error;
pub mod event;
pub mod request;
pub mod service;
pub mod shim;
pub mod stream;

pub use client::Client;
pub use domain::{FormValue, Item, NodeInfo, NodeType, Subscription};
pub use error::PubSubFault;
pub use event::Notification;
pub use request::{PubSubRequest, Verb};
pub use service::{PubSubBackend, Service};
pub use stream::XmlStream;
