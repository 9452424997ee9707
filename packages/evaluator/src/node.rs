use crate::binding::{Binding, Bindings};
use crate::error::ExprError;
use crate::utility::UtilityCall;
use crate::value::{Object, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One unit of the declarative template tree.
///
/// The binding forms of `element` and `children` get their own fields; every key the
/// core does not know (`visibleIf`, `foreach`, `class`, ...) is kept in `fields` for
/// extensions to interpret.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,

    #[serde(rename = "__element", default, skip_serializing_if = "Option::is_none")]
    pub element_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Bindings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Bindings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Children>,

    #[serde(rename = "__children", default, skip_serializing_if = "Option::is_none")]
    pub children_path: Option<String>,

    #[serde(rename = "==children", default, skip_serializing_if = "Option::is_none")]
    pub children_expression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_character: Option<String>,

    #[serde(flatten)]
    pub fields: Object,
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            element: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            children: Some(Children::Text(content.into())),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, content: impl Into<String>) -> Self {
        self.children = Some(Children::Text(content.into()));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        match &mut self.children {
            Some(Children::Nodes(nodes)) => nodes.push(child),
            _ => self.children = Some(Children::Nodes(vec![child])),
        }
        self
    }

    /// Attach an attribute using the raw key syntax (`href`, `__href`, `==href`).
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Bindings::default)
            .insert_raw(key, value.into());
        self
    }

    /// Attach a prop using the raw key syntax.
    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props
            .get_or_insert_with(Bindings::default)
            .insert_raw(key, value.into());
        self
    }

    pub fn with_children_path(mut self, path: impl Into<String>) -> Self {
        self.children_path = Some(path.into());
        self
    }

    pub fn with_children_expression(mut self, source: impl Into<String>) -> Self {
        self.children_expression = Some(source.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Remove an extension field, keeping the order of the others.
    pub fn take_field(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Replace (or add) a literal attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes
            .get_or_insert_with(Bindings::default)
            .set(name, Binding::Literal(value.into()));
    }
}

/// Content of a node's `children` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Children {
    Text(String),
    Nodes(Vec<Node>),
    Call(UtilityCall),
}

/// What a render call accepts: a single node or an ordered list of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Unit {
    Nodes(Vec<Node>),
    Node(Box<Node>),
}

impl Unit {
    pub fn nodes(&self) -> &[Node] {
        match self {
            Unit::Nodes(nodes) => nodes,
            Unit::Node(node) => std::slice::from_ref(node.as_ref()),
        }
    }
}

impl From<Node> for Unit {
    fn from(node: Node) -> Self {
        Unit::Node(Box::new(node))
    }
}

impl From<Vec<Node>> for Unit {
    fn from(nodes: Vec<Node>) -> Self {
        Unit::Nodes(nodes)
    }
}

impl TryFrom<Value> for Unit {
    type Error = ExprError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match &value {
            Value::Object(_) | Value::Array(_) => {}
            other => {
                return Err(ExprError::InvalidRenderTarget {
                    message: format!("got {}", other.type_name()),
                })
            }
        }

        serde_json::from_value(value.into()).map_err(|e| ExprError::InvalidRenderTarget {
            message: e.to_string(),
        })
    }
}

/// Named component definitions, read-only during a render pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    components: IndexMap<String, Unit>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, unit: impl Into<Unit>) {
        self.components.insert(name.into(), unit.into());
    }

    pub fn with(mut self, name: impl Into<String>, unit: impl Into<Unit>) -> Self {
        self.insert(name, unit);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Merge another registry in; later definitions win.
    pub fn extend(&mut self, other: Registry) {
        self.components.extend(other.components);
    }
}
