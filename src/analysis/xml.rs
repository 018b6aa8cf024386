//! XML to JSON value conversion
//!
//! Elements become objects keyed by child name, attributes are stored as
//! `@name`, text next to children or attributes as `#text`, and repeated
//! children collapse into an array. A leaf element is its text, or null.

use crate::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart) -> Result<Self> {
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let value = attr.unescape_value().map_err(xml_error)?;
            fields.insert(
                format!("@{}", String::from_utf8_lossy(attr.key.as_ref())),
                Value::String(value.into_owned()),
            );
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            fields,
            text: String::new(),
        })
    }

    fn into_value(self) -> Value {
        let text = self.text.trim();
        if self.fields.is_empty() {
            return if text.is_empty() { Value::Null } else { Value::String(text.to_string()) };
        }
        let mut fields = self.fields;
        if !text.is_empty() {
            fields.insert("#text".to_string(), Value::String(text.to_string()));
        }
        Value::Object(fields)
    }
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::InvalidInput(format!("invalid XML: {}", err))
}

fn insert(fields: &mut Map<String, Value>, key: String, value: Value) {
    match fields.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key, value);
        }
    }
}

/// Parse a document into a JSON object holding its root element
pub fn to_value(text: &str) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut stack = vec![Element {
        name: String::new(),
        fields: Map::new(),
        text: String::new(),
    }];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(format!("{} at byte {}", e, reader.buffer_position())))?;
        match event {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                if let Some(parent) = stack.last_mut() {
                    insert(&mut parent.fields, element.name.clone(), element.into_value());
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(xml_error("unexpected closing tag"));
                }
                if let Some(element) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        insert(&mut parent.fields, element.name.clone(), element.into_value());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match stack.pop() {
        Some(document) if stack.is_empty() => Ok(Value::Object(document.fields)),
        _ => Err(xml_error("unclosed element at end of input")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repeated_children_become_arrays() {
        let value = to_value(
            r#"<?xml version="1.0"?>
            <catalog>
              <book id="b1"><title>Rust</title><price>39.5</price></book>
              <book id="b2"><title>SQL &amp; You</title><price>20</price></book>
              <note/>
            </catalog>"#,
        )
        .unwrap();

        assert_eq!(
            value,
            json!({
                "catalog": {
                    "book": [
                        { "@id": "b1", "title": "Rust", "price": "39.5" },
                        { "@id": "b2", "title": "SQL & You", "price": "20" }
                    ],
                    "note": null
                }
            })
        );
    }

    #[test]
    fn test_attributes_with_text() {
        let value = to_value(r#"<p lang="en">hi<![CDATA[ <there>]]></p>"#).unwrap();
        assert_eq!(value, json!({ "p": { "@lang": "en", "#text": "hi <there>" } }));
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(matches!(to_value("<a></b>"), Err(Error::InvalidInput(_))));
        assert!(to_value("<a><b>1</b>").is_err());
    }
}
