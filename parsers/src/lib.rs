// Copyright (c) 2017 Emmanuel Gil Peyrot <linkmauve@linkmauve.fr>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Collection of parsers and serialisers for a focused set of XMPP
//! extensions: stanza errors, data forms, service discovery and the pubsub
//! wire primitives, trimmed down to what the pubsub engine in this
//! workspace needs.

extern crate alloc;

pub use jid;
pub use minidom;
pub use minidom::Element;
pub use xso::error::Error;

#[macro_use]
mod util;

pub mod data_forms;
pub mod disco;
pub mod iq;
pub mod media_element;
pub mod message;
pub mod ns;
pub mod pubsub;
pub mod stanza_error;
