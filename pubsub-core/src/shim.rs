// Copyright (c) 2025 xmpp-rs contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stanza Headers and Internet Metadata (XEP-0131), used here to carry the
//! `Collection` header on collection-node re-publication notifications.

use std::collections::BTreeMap;

use minidom::Element;
use xmpp_parsers::ns;

/// Extract the SHIM headers carried by a stanza's `<headers/>` child, if
/// any, keyed by header name with values in wire order. Returns an empty
/// map when the stanza has no SHIM headers.
pub fn extract_headers(stanza: &Element) -> BTreeMap<String, Vec<String>> {
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for child in stanza.children() {
        if !child.is("headers", ns::SHIM) {
            continue;
        }
        for header in child.children() {
            if !header.is("header", ns::SHIM) {
                continue;
            }
            if let Some(name) = header.attr("name") {
                headers.entry(name.to_string()).or_default().push(header.text());
            }
        }
    }
    headers
}

/// Build a `<headers xmlns='http://jabber.org/protocol/shim'/>` element
/// from an ordered sequence of `(name, value)` pairs.
pub fn build_headers<I, S>(pairs: I) -> Element
where
    I: IntoIterator<Item = (S, S)>,
    S: Into<String>,
{
    Element::builder("headers", ns::SHIM)
        .append_all(pairs.into_iter().map(|(name, value)| {
            Element::builder("header", ns::SHIM)
                .attr("name", name.into())
                .append(value.into())
        }))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_single_header() {
        let headers = build_headers(vec![("Collection", "news")]);
        let mut message = Element::builder("message", ns::DEFAULT_NS).build();
        message.append_child(headers);
        let extracted = extract_headers(&message);
        assert_eq!(
            extracted.get("Collection").map(Vec::as_slice),
            Some(["news".to_string()].as_slice())
        );
    }

    #[test]
    fn repeated_header_name_collects_all_values() {
        let headers = build_headers(vec![("Collection", "news"), ("Collection", "sports")]);
        let mut message = Element::builder("message", ns::DEFAULT_NS).build();
        message.append_child(headers);
        let extracted = extract_headers(&message);
        assert_eq!(
            extracted.get("Collection").map(Vec::as_slice),
            Some(["news".to_string(), "sports".to_string()].as_slice())
        );
    }

    #[test]
    fn no_headers_child_yields_empty() {
        let message = Element::builder("message", ns::DEFAULT_NS).build();
        assert!(extract_headers(&message).is_empty());
    }
}
