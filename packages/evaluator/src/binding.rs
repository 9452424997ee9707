use crate::error::EvalResult;
use crate::expression::evaluate_soft;
use crate::scope::Scope;
use crate::utility::{apply_call, UtilityCall};
use crate::value::{Object, Value};
use futures::future;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PATH_PREFIX: &str = "__";
const EXPRESSION_PREFIX: &str = "==";

/// How one field gets its value. Decided from the key prefix when the tree is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Literal(Value),
    Path(String),
    Expression(String),
    Call(UtilityCall),
}

impl Binding {
    pub fn is_literal(&self) -> bool {
        matches!(self, Binding::Literal(_))
    }
}

/// Ordered field map (`attributes` or `props`) with its bindings already classified.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, Value>", into = "IndexMap<String, Value>")]
pub struct Bindings {
    entries: Vec<(String, Binding)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a raw key/value pair and append it.
    ///
    /// `__name` with a string value is a path, `==name` with a string value an expression.
    /// Only the first prefix is stripped. Any other pair is a literal under the raw key,
    /// unless the value has the `{utility, parameters}` shape.
    pub fn insert_raw(&mut self, key: &str, value: Value) {
        let (name, binding) = match value {
            Value::String(path) if key.starts_with(PATH_PREFIX) => {
                (&key[PATH_PREFIX.len()..], Binding::Path(path))
            }
            Value::String(source) if key.starts_with(EXPRESSION_PREFIX) => {
                (&key[EXPRESSION_PREFIX.len()..], Binding::Expression(source))
            }
            other => match UtilityCall::from_value(&other) {
                Some(call) => (key, Binding::Call(call)),
                None => (key, Binding::Literal(other)),
            },
        };

        self.entries.push((name.to_string(), binding));
    }

    /// Replace the binding for `name` in place, or append it.
    pub fn set(&mut self, name: &str, binding: Binding) {
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(index) => {
                self.entries[index].1 = binding;
                let mut seen = 0;
                self.entries.retain(|(n, _)| {
                    if n != name {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.entries.push((name.to_string(), binding)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, binding)| binding)
    }

    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<IndexMap<String, Value>> for Bindings {
    fn from(raw: IndexMap<String, Value>) -> Self {
        let mut bindings = Bindings::new();
        for (key, value) in raw {
            bindings.insert_raw(&key, value);
        }
        bindings
    }
}

impl From<Bindings> for IndexMap<String, Value> {
    fn from(bindings: Bindings) -> Self {
        bindings
            .entries
            .into_iter()
            .map(|(name, binding)| match binding {
                Binding::Literal(value) => (name, value),
                Binding::Path(path) => (format!("{}{}", PATH_PREFIX, name), Value::String(path)),
                Binding::Expression(source) => (
                    format!("{}{}", EXPRESSION_PREFIX, name),
                    Value::String(source),
                ),
                Binding::Call(call) => (name, call.to_value()),
            })
            .collect()
    }
}

/// Resolve every binding concurrently. Declaration order is kept and absent values
/// are dropped.
pub async fn resolve(bindings: Option<&Bindings>, scope: &Scope<'_>) -> EvalResult<Object> {
    let Some(bindings) = bindings else {
        return Ok(Object::new());
    };

    let values = future::try_join_all(
        bindings
            .entries
            .iter()
            .map(|(_, binding)| resolve_binding(binding, scope)),
    )
    .await?;

    Ok(bindings
        .entries
        .iter()
        .zip(values)
        .filter_map(|((name, _), value)| value.map(|v| (name.clone(), v)))
        .collect())
}

/// Resolve one binding. `None` means the field is dropped.
pub async fn resolve_binding(binding: &Binding, scope: &Scope<'_>) -> EvalResult<Option<Value>> {
    let value = match binding {
        Binding::Literal(Value::Null) => return Ok(None),
        Binding::Literal(value) => return Ok(Some(value.clone())),
        Binding::Path(path) => {
            let value = scope.lookup(path);
            if value.is_none() {
                debug!(path = %path, "Path lookup missed");
            }
            value
        }
        Binding::Expression(source) => evaluate_soft(source, scope).await?,
        Binding::Call(call) => apply_call(call, scope).await?,
    };

    // computed empty strings count as absent, literal ones render as bare attributes
    Ok(value.filter(|v| !matches!(v, Value::Null) && v.as_str() != Some("")))
}
