use super::{Extension, Rewrite};
use crate::error::EvalResult;
use crate::expression::evaluate_soft;
use crate::node::Node;
use crate::scope::Scope;
use crate::utility::apply_utility;
use crate::value::Value;
use futures::future::{BoxFuture, FutureExt};

const FIELD: &str = "visibleIf";

/// Drops a node whose `visibleIf` is falsy, undefined or an empty array.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleIf;

impl Extension for VisibleIf {
    fn name(&self) -> &str {
        "visibleIf"
    }

    fn apply<'a>(
        &'a self,
        mut node: Node,
        scope: &'a Scope<'a>,
    ) -> BoxFuture<'a, EvalResult<Rewrite>> {
        async move {
            let Some(condition) = node.take_field(FIELD) else {
                return Ok(Rewrite::Continue(node));
            };

            let visible = match &condition {
                Value::String(source) if source.is_empty() => None,
                Value::String(source) => evaluate_soft(source, scope).await?,
                other => apply_utility(other, scope).await?,
            };

            match visible {
                Some(value) if !value.is_blank() => Ok(Rewrite::Continue(node)),
                _ => Ok(Rewrite::Stop),
            }
        }
        .boxed()
    }
}
