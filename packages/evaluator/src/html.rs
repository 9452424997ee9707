use crate::value::{Object, Value};

/// Build the final markup for one node.
///
/// With a closing character the tag is emitted as `<tag attrs CLOSER>` and the content
/// is ignored. Without an element only the content is returned.
pub fn compose(
    element: Option<&str>,
    attributes: &Object,
    content: &str,
    closing_character: Option<&str>,
) -> String {
    let Some(element) = element else {
        return content.to_string();
    };

    let attributes = serialize_attributes(attributes);
    let mut out = String::with_capacity(element.len() * 2 + attributes.len() + content.len() + 5);

    out.push('<');
    out.push_str(element);
    if !attributes.is_empty() {
        out.push(' ');
        out.push_str(&attributes);
    }

    if let Some(closer) = closing_character {
        out.push(' ');
        out.push_str(closer);
        out.push('>');
        return out;
    }

    out.push('>');
    out.push_str(content);
    out.push_str("</");
    out.push_str(element);
    out.push('>');
    out
}

/// `key="value"` pairs separated by spaces. Empty strings and `true` render as bare keys,
/// `false` is left out.
pub fn serialize_attributes(attributes: &Object) -> String {
    attributes
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Bool(false) | Value::Null => None,
            Value::Bool(true) => Some(key.clone()),
            Value::String(s) if s.is_empty() => Some(key.clone()),
            other => Some(format!(
                "{}=\"{}\"",
                key,
                escape_attribute(&other.to_string())
            )),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_attribute(text: &str) -> String {
    text.replace('"', "&quot;")
}
