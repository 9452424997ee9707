use super::{Extension, Rewrite};
use crate::error::{EvalError, EvalResult};
use crate::expression::evaluate_soft;
use crate::node::{Children, Node, Unit};
use crate::scope::Scope;
use crate::utility::apply_utility;
use crate::value::{Object, Value};
use futures::future::{self, BoxFuture, FutureExt};
use tracing::{debug, error};

const FIELD: &str = "foreach";

/// `foreach: [iterable, template]`. Renders the template once per item and makes the
/// joined output the node's children. Each item sees props `{...item, value: item}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Foreach;

impl Extension for Foreach {
    fn name(&self) -> &str {
        "foreach"
    }

    fn apply<'a>(
        &'a self,
        mut node: Node,
        scope: &'a Scope<'a>,
    ) -> BoxFuture<'a, EvalResult<Rewrite>> {
        async move {
            let Some(declaration) = node.take_field(FIELD) else {
                return Ok(Rewrite::Continue(node));
            };

            let (source, template) = match declaration {
                Value::Array(mut parts) if parts.len() == 2 => {
                    let template = parts.pop().unwrap_or_default();
                    let source = parts.pop().unwrap_or_default();
                    (source, template)
                }
                other => {
                    return Err(EvalError::InvalidUnit {
                        message: format!(
                            "foreach expects [iterable, template], got {}",
                            other.type_name()
                        ),
                    })
                }
            };

            let items = match &source {
                Value::String(expression) => evaluate_soft(expression, scope).await?,
                other => apply_utility(other, scope).await?,
            };

            let items = match items {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(other) => {
                    error!(expression = %source, found = other.type_name(), "foreach source is not an array");
                    return Err(EvalError::IterationSource {
                        expression: source.to_string(),
                        found: other.type_name().to_string(),
                    });
                }
            };

            let unit = Unit::try_from(template).map_err(|e| EvalError::InvalidUnit {
                message: format!("foreach template: {}", e),
            })?;

            debug!(items = items.len(), "Rendering foreach");

            let rendered = future::try_join_all(
                items
                    .into_iter()
                    .map(|item| scope.render_with_props(&unit, item_props(item))),
            )
            .await?;

            node.children = Some(Children::Text(rendered.concat()));
            Ok(Rewrite::Continue(node))
        }
        .boxed()
    }
}

fn item_props(item: Value) -> Value {
    let mut props = match &item {
        Value::Object(map) => map.clone(),
        _ => Object::new(),
    };
    props.insert("value".to_string(), item);
    Value::Object(props)
}
