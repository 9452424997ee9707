use super::{Extension, Rewrite};
use crate::error::{EvalError, EvalResult};
use crate::expression::evaluate_soft;
use crate::node::Node;
use crate::scope::Scope;
use crate::utility::apply_utility;
use crate::value::{Object, Value};
use futures::future::{BoxFuture, FutureExt};
use tracing::{error, warn};

/// Folds `class`, `__class`, `==class` and `classList` into the `class` attribute,
/// in that order.
#[derive(Debug, Clone, Default)]
pub struct ClassShortcut {
    transform: Option<String>,
}

impl ClassShortcut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass the joined class string through a registered utility before it is set,
    /// e.g. to expand atomic CSS shorthands.
    pub fn with_transform(mut self, utility: impl Into<String>) -> Self {
        self.transform = Some(utility.into());
        self
    }

    async fn transform(&self, classes: String, scope: &Scope<'_>) -> EvalResult<String> {
        let Some(name) = &self.transform else {
            return Ok(classes);
        };

        let Some(utility) = scope.utilities().get(name) else {
            error!(utility = %name, "Class transform utility not found");
            return Err(EvalError::UtilityNotFound { name: name.clone() });
        };

        match utility
            .invoke(scope.receiver(), vec![Value::String(classes.clone())])
            .await
        {
            Ok(Value::String(transformed)) => Ok(transformed),
            Ok(other) => Ok(other.to_string()),
            Err(e) => {
                warn!(utility = %name, error = %e, "Class transform failed");
                Ok(classes)
            }
        }
    }
}

impl Extension for ClassShortcut {
    fn name(&self) -> &str {
        "classShortcut"
    }

    fn apply<'a>(
        &'a self,
        mut node: Node,
        scope: &'a Scope<'a>,
    ) -> BoxFuture<'a, EvalResult<Rewrite>> {
        async move {
            let plain = node.take_field("class");
            let path = node.take_field("__class");
            let expression = node.take_field("==class");
            let list = node.take_field("classList");

            let mut classes: Vec<String> = Vec::new();

            match plain {
                Some(Value::String(class)) => classes.push(class),
                Some(Value::Object(map)) => classes.extend(conditional_classes(&map, scope).await?),
                Some(other) => classes.extend(class_name(other)),
                None => {}
            }

            if let Some(Value::String(path)) = path {
                classes.extend(scope.lookup(&path).and_then(class_name));
            }

            if let Some(Value::String(source)) = expression {
                classes.extend(evaluate_soft(&source, scope).await?.and_then(class_name));
            }

            if let Some(Value::Object(map)) = list {
                classes.extend(conditional_classes(&map, scope).await?);
            }

            let classes: Vec<String> = classes.into_iter().filter(|c| !c.is_empty()).collect();
            if classes.is_empty() {
                return Ok(Rewrite::Continue(node));
            }

            let joined = self.transform(classes.join(" "), scope).await?;
            if !joined.is_empty() {
                node.set_attribute("class", joined);
            }

            Ok(Rewrite::Continue(node))
        }
        .boxed()
    }
}

/// A computed class value. `null` and `false` contribute nothing.
fn class_name(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(class) => Some(class),
        other => Some(other.to_string()),
    }
}

/// `{ "class-name": condition }`, keeping names whose condition is truthy.
async fn conditional_classes(map: &Object, scope: &Scope<'_>) -> EvalResult<Vec<String>> {
    let mut classes = Vec::new();

    for (class, condition) in map {
        let enabled = match condition {
            Value::String(source) if source.is_empty() => None,
            Value::String(source) => evaluate_soft(source, scope).await?,
            other => apply_utility(other, scope).await?,
        };

        if enabled.map_or(false, |v| v.is_truthy()) {
            classes.push(class.clone());
        }
    }

    Ok(classes)
}
