// Copyright (c) 2017 Emmanuel Gil Peyrot <linkmauve@linkmauve.fr>
// Copyright (c) 2017 Maxime “pep” Buquet <pep+code@bouah.net>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use minidom::{Element, IntoAttributeValue};

use jid::Jid;

use xso::error::{Error, FromElementError};

use crate::ns;
use crate::stanza_error::StanzaError;

/// Should be implemented on every known payload of an `<iq type='get'/>`.
pub trait IqGetPayload: TryFrom<Element> + Into<Element> {}

/// Should be implemented on every known payload of an `<iq type='set'/>`.
pub trait IqSetPayload: TryFrom<Element> + Into<Element> {}

/// Should be implemented on every known payload of an `<iq type='result'/>`.
pub trait IqResultPayload: TryFrom<Element> + Into<Element> {}

/// The payload carried by an `<iq/>`, together with its `@type`.
///
/// Payloads are kept as the raw [`Element`] here: the request/response
/// machinery built on top of `Iq` parses them further according to the
/// namespace and child name it is looking for, rather than this crate
/// pre-parsing every possible payload shape.
#[derive(Debug, Clone)]
pub enum IqType {
    /// Payload of a `type='get'` request.
    Get(Element),

    /// Payload of a `type='set'` request.
    Set(Element),

    /// Payload of a `type='result'` response, absent for an empty result.
    Result(Option<Element>),

    /// Payload of a `type='error'` response.
    Error(StanzaError),
}

impl IntoAttributeValue for IqType {
    fn into_attribute_value(self) -> Option<String> {
        Some(
            match self {
                IqType::Get(_) => "get",
                IqType::Set(_) => "set",
                IqType::Result(_) => "result",
                IqType::Error(_) => "error",
            }
            .to_owned(),
        )
    }
}

/// The main structure representing the `<iq/>` stanza.
#[derive(Debug, Clone)]
pub struct Iq {
    /// The JID emitting this stanza.
    pub from: Option<Jid>,

    /// The recipient of this stanza.
    pub to: Option<Jid>,

    /// The @id attribute of this stanza, which is required in order to match
    /// a request with its response.
    pub id: String,

    /// The type of this IQ, together with its payload.
    pub payload: IqType,
}

impl Iq {
    /// Creates a get-type `<iq/>` with the given payload.
    pub fn from_get<P: IqGetPayload, I: Into<String>>(id: I, payload: P) -> Iq {
        Iq {
            from: None,
            to: None,
            id: id.into(),
            payload: IqType::Get(payload.into()),
        }
    }

    /// Creates a set-type `<iq/>` with the given payload.
    pub fn from_set<P: IqSetPayload, I: Into<String>>(id: I, payload: P) -> Iq {
        Iq {
            from: None,
            to: None,
            id: id.into(),
            payload: IqType::Set(payload.into()),
        }
    }

    /// Creates a result-type `<iq/>` with no payload.
    pub fn empty_result<I: Into<String>>(id: I) -> Iq {
        Iq {
            from: None,
            to: None,
            id: id.into(),
            payload: IqType::Result(None),
        }
    }

    /// Creates a result-type `<iq/>` with the given payload.
    pub fn from_result<P: IqResultPayload, I: Into<String>>(
        id: I,
        payload: Option<P>,
    ) -> Iq {
        Iq {
            from: None,
            to: None,
            id: id.into(),
            payload: IqType::Result(payload.map(Into::into)),
        }
    }

    /// Creates an error-type `<iq/>` with the given stanza error.
    pub fn from_error<I: Into<String>>(id: I, error: StanzaError) -> Iq {
        Iq {
            from: None,
            to: None,
            id: id.into(),
            payload: IqType::Error(error),
        }
    }

    /// Sets the `from` attribute on this `<iq/>`.
    pub fn with_from(mut self, from: Jid) -> Iq {
        self.from = Some(from);
        self
    }

    /// Sets the `to` attribute on this `<iq/>`.
    pub fn with_to(mut self, to: Jid) -> Iq {
        self.to = Some(to);
        self
    }
}

impl TryFrom<Element> for Iq {
    type Error = FromElementError;

    fn try_from(root: Element) -> Result<Iq, FromElementError> {
        check_self!(root, "iq", DEFAULT_NS);
        check_no_unknown_attributes!(root, "iq", ["from", "to", "id", "type", "xml:lang"]);
        let from = get_attr!(root, "from", Option);
        let to = get_attr!(root, "to", Option);
        let id = get_attr!(root, "id", Required);
        let type_: String = get_attr!(root, "type", Required);

        let mut payload = None;
        let mut error_payload = None;
        for elem in root.children() {
            if payload.is_some() || error_payload.is_some() {
                return Err(Error::Other("Wrong number of children in iq element.").into());
            }
            if type_ == "error" {
                if elem.is("error", ns::DEFAULT_NS) || elem.is("error", ns::XMPP_STANZAS) {
                    error_payload = Some(StanzaError::try_from(elem.clone())?);
                } else {
                    payload = Some(elem.clone());
                }
            } else {
                payload = Some(elem.clone());
            }
        }

        let type_ = match type_.as_str() {
            "get" => match payload {
                Some(payload) => IqType::Get(payload),
                None => {
                    return Err(
                        Error::Other("Wrong number of children in iq element.").into(),
                    )
                }
            },
            "set" => match payload {
                Some(payload) => IqType::Set(payload),
                None => {
                    return Err(
                        Error::Other("Wrong number of children in iq element.").into(),
                    )
                }
            },
            "result" => IqType::Result(payload),
            "error" => match error_payload {
                Some(error) => IqType::Error(error),
                None => {
                    return Err(
                        Error::Other("Wrong number of children in iq element.").into(),
                    )
                }
            },
            _ => return Err(Error::Other("Unknown iq type.").into()),
        };

        Ok(Iq {
            from,
            to,
            id,
            payload: type_,
        })
    }
}

impl From<Iq> for Element {
    fn from(iq: Iq) -> Element {
        let mut stanza = Element::builder("iq", ns::DEFAULT_NS)
            .attr("from", iq.from)
            .attr("to", iq.to)
            .attr("id", Some(iq.id))
            .attr("type", iq.payload.clone())
            .build();
        let child = match iq.payload {
            IqType::Get(elem) | IqType::Set(elem) | IqType::Result(Some(elem)) => Some(elem),
            IqType::Error(error) => Some(error.into()),
            IqType::Result(None) => None,
        };
        if let Some(child) = child {
            stanza.append_child(child);
        }
        stanza
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stanza_error::{DefinedCondition, ErrorType};

    #[test]
    fn test_require_type() {
        let elem: Element = "<iq xmlns='jabber:client' id='one'/>".parse().unwrap();
        let error = Iq::try_from(elem).unwrap_err();
        match error {
            FromElementError::Invalid(Error::Other(string)) => {
                assert_eq!(string, "Required attribute 'type' missing.")
            }
            _ => panic!(),
        }
    }

    #[test]
    fn test_get() {
        let elem: Element = "<iq xmlns='jabber:client' id='one' type='get'>
            <foo/>
        </iq>"
            .parse()
            .unwrap();
        let iq = Iq::try_from(elem).unwrap();
        let query: Element = "<foo/>".parse().unwrap();
        assert_eq!(iq.from, None);
        assert_eq!(iq.to, None);
        assert_eq!(iq.id, "one");
        match iq.payload {
            IqType::Get(element) => assert_eq!(element, query),
            _ => panic!(),
        }
    }

    #[test]
    fn test_result_empty() {
        let elem: Element = "<iq xmlns='jabber:client' id='one' type='result'/>"
            .parse()
            .unwrap();
        let iq = Iq::try_from(elem).unwrap();
        assert!(matches!(iq.payload, IqType::Result(None)));
    }

    #[test]
    fn test_error() {
        let elem: Element = "<iq xmlns='jabber:client' id='one' type='error'>
            <ping xmlns='urn:xmpp:ping'/>
            <error type='cancel'>
                <service-unavailable xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/>
            </error>
        </iq>"
            .parse()
            .unwrap();
        let iq = Iq::try_from(elem).unwrap();
        match iq.payload {
            IqType::Error(error) => {
                assert_eq!(error.type_, ErrorType::Cancel);
                assert_eq!(error.defined_condition, DefinedCondition::ServiceUnavailable);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn test_serialise() {
        let elem: Element = "<iq xmlns='jabber:client' id='one' type='result'/>"
            .parse()
            .unwrap();
        let iq2 = Iq::empty_result("one");
        let elem2 = Element::from(iq2);
        assert_eq!(elem, elem2);
    }
}
