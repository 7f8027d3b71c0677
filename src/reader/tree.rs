//! Minimal element tree over `quick-xml` events.
//!
//! The format carries all data in attributes, so text content is dropped.
//! Attribute values are unescaped on the way in.

use crate::err::{DeserializationError, DeserializationResult as Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn required_attr(&self, key: &'static str) -> Result<&str> {
        self.attr(key)
            .ok_or_else(|| DeserializationError::MissingAttribute {
                element: self.name.clone(),
                attribute: key,
            })
    }

    /// `true` only for `key='yes'`.
    pub fn flag(&self, key: &str) -> bool {
        self.attr(key) == Some("yes")
    }

    pub fn parse_attr<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>> {
        match self.attr(key) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                DeserializationError::InvalidAttributeValue {
                    element: self.name.clone(),
                    attribute: key,
                    value: value.to_owned(),
                }
            }),
        }
    }

    pub fn invalid(&self, key: &'static str, value: &str) -> DeserializationError {
        DeserializationError::InvalidAttributeValue {
            element: self.name.clone(),
            attribute: key,
            value: value.to_owned(),
        }
    }

    pub fn unexpected_child(&self, child: &XmlElement) -> DeserializationError {
        DeserializationError::UnexpectedElement {
            parent: self.name.clone(),
            found: child.name.clone(),
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(XmlElement {
            name,
            attributes,
            children: Vec::new(),
        })
    }
}

/// Parse `input` into its root element.
pub(crate) fn parse_document(input: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(XmlElement::from_start(&start)?);
            }
            Event::Empty(empty) => {
                let element = XmlElement::from_start(&empty)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(end) => {
                let element = stack.pop().ok_or_else(|| DeserializationError::Unbalanced {
                    message: format!(
                        "closing tag `{}` without an open element",
                        String::from_utf8_lossy(end.name().as_ref())
                    ),
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            // Declarations, comments and whitespace carry nothing.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DeserializationError::Unbalanced {
            message: format!("element `{}` is never closed", open.name),
        });
    }

    root.ok_or(DeserializationError::EmptyDocument)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(DeserializationError::Unbalanced {
                message: format!("second root element `{}`", element.name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_single_quoted() {
        let root = parse_document(
            "<a version='1.0'>\n  <b name='operator&lt;'/>\n  <c>\n    <d/>\n  </c>\n</a>\n",
        )
        .expect("valid document");

        assert_eq!(root.name, "a");
        assert_eq!(root.attr("version"), Some("1.0"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].attr("name"), Some("operator<"));
        assert_eq!(root.children[1].children[0].name, "d");
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(matches!(
            parse_document("   "),
            Err(DeserializationError::EmptyDocument)
        ));
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        assert!(parse_document("<a><b/>").is_err());
    }
}
