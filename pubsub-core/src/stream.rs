// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The abstraction a [`crate::client::Client`] sends stanzas through.
//!
//! Transport, reconnection and request/response correlation are someone
//! else's job; an implementor only has to get a stanza onto the wire and,
//! for IQs, hand back the matching response once it arrives. The shape
//! mirrors a connection's IQ tracker: one outstanding request per id, solved
//! by whichever mechanism the transport already uses to demultiplex
//! incoming stanzas.

use core::fmt;

use minidom::Element;

use xmpp_parsers::iq::Iq;

/// Failure to send a stanza or to get a response to an IQ.
#[derive(Debug)]
pub enum XmlStreamError {
    /// The underlying connection was lost before a response arrived.
    Disconnected,

    /// The transport reported an error while sending.
    Send(String),
}

impl fmt::Display for XmlStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlStreamError::Disconnected => f.write_str("disconnected before a response arrived"),
            XmlStreamError::Send(message) => write!(f, "send error: {message}"),
        }
    }
}

impl std::error::Error for XmlStreamError {}

/// A connection able to send stanzas and correlate IQ responses.
pub trait XmlStream {
    /// Send a fire-and-forget stanza, such as a notification `<message/>`.
    async fn send(&self, stanza: Element) -> Result<(), XmlStreamError>;

    /// Send an IQ and wait for its matching `result`/`error` response.
    async fn send_iq(&self, iq: Iq) -> Result<Iq, XmlStreamError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::RefCell;

    /// An in-memory [`XmlStream`] that records sent stanzas and plays back
    /// pre-programmed IQ responses in order, for unit tests.
    #[derive(Default)]
    pub struct RecordingStream {
        pub sent: RefCell<Vec<Element>>,
        pub responses: RefCell<Vec<Iq>>,
    }

    impl XmlStream for RecordingStream {
        async fn send(&self, stanza: Element) -> Result<(), XmlStreamError> {
            self.sent.borrow_mut().push(stanza);
            Ok(())
        }

        async fn send_iq(&self, iq: Iq) -> Result<Iq, XmlStreamError> {
            self.sent.borrow_mut().push(Element::from(iq));
            self.responses
                .borrow_mut()
                .pop()
                .ok_or(XmlStreamError::Disconnected)
        }
    }
}
