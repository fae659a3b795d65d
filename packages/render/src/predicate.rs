use scribe_tree::Node;
use std::fmt;
use std::rc::Rc;

/// Eligibility test deciding whether a renderer may handle a node
#[derive(Clone)]
pub struct Predicate {
    label: String,
    test: Rc<dyn Fn(&Node) -> bool>,
}

impl Predicate {
    pub fn new(label: impl Into<String>, test: impl Fn(&Node) -> bool + 'static) -> Self {
        Self {
            label: label.into(),
            test: Rc::new(test),
        }
    }

    /// Matches nodes of one kind
    pub fn kind(kind: &str) -> Self {
        let expected = kind.to_string();
        Self::new(format!("kind == {kind}"), move |node| node.is(&expected))
    }

    /// Matches nodes carrying an attribute
    pub fn has_attribute(name: &str) -> Self {
        let expected = name.to_string();
        Self::new(format!("has {name}"), move |node| {
            node.attribute(&expected).is_some()
        })
    }

    pub fn and(self, other: Predicate) -> Self {
        let label = format!("{} && {}", self.label, other.label);
        Self::new(label, move |node| self.matches(node) && other.matches(node))
    }

    pub fn matches(&self, node: &Node) -> bool {
        (self.test)(node)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.label).finish()
    }
}
