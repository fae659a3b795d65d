use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structural copy of a DOM subtree, independent of node identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomSnapshot {
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<DomSnapshot>,
    },

    Text { content: String },
}

impl DomSnapshot {
    pub fn element(tag: impl Into<String>) -> Self {
        DomSnapshot::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        DomSnapshot::Text {
            content: content.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let DomSnapshot::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, child: DomSnapshot) -> Self {
        if let DomSnapshot::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<DomSnapshot>) -> Self {
        if let DomSnapshot::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    /// Merge adjacent text nodes and drop empty ones, the way
    /// `Node.normalize()` does
    pub fn normalized(&self) -> DomSnapshot {
        match self {
            DomSnapshot::Text { content } => DomSnapshot::text(content.clone()),
            DomSnapshot::Element {
                tag,
                attributes,
                children,
            } => {
                let mut merged: Vec<DomSnapshot> = Vec::new();
                for child in children.iter().map(DomSnapshot::normalized) {
                    if let DomSnapshot::Text { content } = &child {
                        if content.is_empty() {
                            continue;
                        }
                        if let Some(DomSnapshot::Text { content: prev }) = merged.last_mut() {
                            prev.push_str(content);
                            continue;
                        }
                    }
                    merged.push(child);
                }
                DomSnapshot::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                    children: merged,
                }
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            DomSnapshot::Text { content } => escape_into(content, false, out),
            DomSnapshot::Element {
                tag,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_merges_adjacent_text() {
        let snapshot = DomSnapshot::element("p").with_children(vec![
            DomSnapshot::text("a"),
            DomSnapshot::text(""),
            DomSnapshot::text("b"),
            DomSnapshot::element("br"),
        ]);

        let expected = DomSnapshot::element("p")
            .with_child(DomSnapshot::text("ab"))
            .with_child(DomSnapshot::element("br"));

        assert_eq!(snapshot.normalized(), expected);
    }

    #[test]
    fn test_to_html_escapes() {
        let snapshot = DomSnapshot::element("span")
            .with_attr("title", "a \"b\"")
            .with_child(DomSnapshot::text("x < y"));
        assert_eq!(
            snapshot.to_html(),
            r#"<span title="a &quot;b&quot;">x &lt; y</span>"#
        );
    }
}
