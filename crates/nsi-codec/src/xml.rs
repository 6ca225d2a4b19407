//! Namespace-aware parser that surfaces a namespace-*stripped* dictionary:
//! local element names become keys, attributes merge into the same
//! dictionary, and repeated siblings naturally collect into a list.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    Text(String),
    Dict(XmlDict),
}

/// A single XML element, flattened to its local name with attributes and
/// child elements merged into one lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlDict {
    entries: HashMap<String, Vec<XmlValue>>,
}

impl XmlDict {
    fn insert(&mut self, key: String, value: XmlValue) {
        self.entries.entry(key).or_default().push(value);
    }

    pub fn get_str(&self, key: &str) -> crate::Result<&str> {
        match self.entries.get(key).and_then(|v| v.first()) {
            Some(XmlValue::Text(s)) => Ok(s),
            Some(XmlValue::Dict(_)) => Err(Error::FieldType {
                field: key.to_string(),
                expected: "text",
                value: "<nested element>".to_string(),
            }),
            None => Err(Error::MissingField(key.to_string())),
        }
    }

    pub fn child(&self, key: &str) -> crate::Result<&XmlDict> {
        match self.entries.get(key).and_then(|v| v.first()) {
            Some(XmlValue::Dict(d)) => Ok(d),
            Some(XmlValue::Text(_)) => Err(Error::FieldType {
                field: key.to_string(),
                expected: "element",
                value: "<text>".to_string(),
            }),
            None => Err(Error::MissingField(key.to_string())),
        }
    }

    /// All repeated occurrences of `key`, in document order.
    pub fn children(&self, key: &str) -> Vec<&XmlDict> {
        self.entries
            .get(key)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| match v {
                        XmlValue::Dict(d) => Some(d),
                        XmlValue::Text(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_uuid(&self, key: &str) -> crate::Result<Uuid> {
        let raw = self.get_str(key)?;
        Uuid::parse_str(raw).map_err(|_| Error::FieldType {
            field: key.to_string(),
            expected: "uuid",
            value: raw.to_string(),
        })
    }

    pub fn get_timestamp(&self, key: &str) -> crate::Result<DateTime<Utc>> {
        let raw = self.get_str(key)?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| Error::FieldType {
                field: key.to_string(),
                expected: "RFC3339 timestamp",
                value: raw.to_string(),
            })
    }

    pub fn get_bool(&self, key: &str) -> crate::Result<bool> {
        let raw = self.get_str(key)?;
        raw.parse().map_err(|_| Error::FieldType {
            field: key.to_string(),
            expected: "bool",
            value: raw.to_string(),
        })
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Strip any `prefix:` namespace qualifier, leaving the local name.
fn local_name(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    match s.split_once(':') {
        Some((_, local)) => local.to_string(),
        None => s.into_owned(),
    }
}

/// Parse `xml` and return the dictionary for its single root element.
pub fn parse_dict(xml: &str) -> crate::Result<XmlDict> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Walk to the first Start/Empty event, then parse it as the root.
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::Xml(e.to_string()))?
        {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref());
                let mut dict = XmlDict::default();
                for attr in e.attributes().flatten() {
                    let key = local_name(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::Xml(e.to_string()))?
                        .into_owned();
                    dict.insert(key, XmlValue::Text(value));
                }
                parse_children(&mut reader, &mut dict)?;
                let mut root = XmlDict::default();
                root.insert(name, XmlValue::Dict(dict));
                return Ok(root);
            }
            Event::Empty(e) => {
                let name = local_name(e.name().as_ref());
                let mut dict = XmlDict::default();
                for attr in e.attributes().flatten() {
                    let key = local_name(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::Xml(e.to_string()))?
                        .into_owned();
                    dict.insert(key, XmlValue::Text(value));
                }
                let mut root = XmlDict::default();
                root.insert(name, XmlValue::Dict(dict));
                return Ok(root);
            }
            Event::Eof => return Err(Error::Xml("empty document".to_string())),
            _ => continue,
        }
    }
}

/// Consume events until the matching `End` for the element whose `Start`
/// was already consumed by the caller, populating `dict` with every child
/// element and the text content directly inside it.
fn parse_children(
    reader: &mut Reader<&[u8]>,
    dict: &mut XmlDict,
) -> crate::Result<()> {
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::Xml(e.to_string()))?
        {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref());
                let mut child = XmlDict::default();
                for attr in e.attributes().flatten() {
                    let key = local_name(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::Xml(e.to_string()))?
                        .into_owned();
                    child.insert(key, XmlValue::Text(value));
                }
                parse_children(reader, &mut child)?;
                dict.insert(name, XmlValue::Dict(child));
            }
            Event::Empty(e) => {
                let name = local_name(e.name().as_ref());
                let mut child = XmlDict::default();
                for attr in e.attributes().flatten() {
                    let key = local_name(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::Xml(e.to_string()))?
                        .into_owned();
                    child.insert(key, XmlValue::Text(value));
                }
                dict.insert(name, XmlValue::Dict(child));
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::Xml(e.to_string()))?
                    .into_owned();
                if !text.trim().is_empty() {
                    dict.insert("#text".to_string(), XmlValue::Text(text));
                }
            }
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(Error::Xml("unexpected end of document".to_string())),
            _ => continue,
        }
    }
}

/// Flatten a leaf dict's `#text` entry the way [`XmlDict::get_str`] would if
/// the element had no attributes or children — used when a template models
/// a simple `<tag>value</tag>` leaf as a one-entry dict rather than text.
impl XmlDict {
    pub fn text(&self) -> crate::Result<&str> {
        self.get_str("#text")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_namespace_prefixes() {
        let xml = r#"<soap:Envelope xmlns:soap="urn:x"><soap:Body><reserve correlationId="abc"/></soap:Body></soap:Envelope>"#;
        let dict = parse_dict(xml).unwrap();
        let envelope = dict.child("Envelope").unwrap();
        let body = envelope.child("Body").unwrap();
        let reserve = body.child("reserve").unwrap();
        assert_eq!(reserve.get_str("correlationId").unwrap(), "abc");
    }

    #[test]
    fn repeated_siblings_become_a_list() {
        let xml = r#"<root><item>a</item><item>b</item></root>"#;
        let dict = parse_dict(xml).unwrap();
        let root = dict.child("root").unwrap();
        assert_eq!(root.children("item").len(), 2);
    }

    #[test]
    fn single_relation_and_relation_list_both_parse() {
        let single = r#"<port><Relation type="hasInboundPort">a</Relation></port>"#;
        let list = r#"<port><Relation type="hasInboundPort">a</Relation><Relation type="hasOutboundPort">b</Relation></port>"#;
        assert_eq!(
            parse_dict(single).unwrap().child("port").unwrap().children("Relation").len(),
            1
        );
        assert_eq!(
            parse_dict(list).unwrap().child("port").unwrap().children("Relation").len(),
            2
        );
    }

    #[test]
    fn coerces_known_field_types() {
        let xml = r#"<x connectionId="11111111-1111-1111-1111-111111111111" timeStamp="2026-01-01T00:00:00Z"/>"#;
        let dict = parse_dict(xml).unwrap();
        let x = dict.child("x").unwrap();
        assert!(x.get_uuid("connectionId").is_ok());
        assert!(x.get_timestamp("timeStamp").is_ok());
    }
}
