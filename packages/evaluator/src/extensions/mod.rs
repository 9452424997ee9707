//! Node rewrites applied before structural evaluation.

mod class_shortcut;
mod foreach;
mod visible_if;

pub use class_shortcut::ClassShortcut;
pub use foreach::Foreach;
pub use visible_if::VisibleIf;

use crate::error::EvalResult;
use crate::node::Node;
use crate::scope::Scope;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one extension.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// Hand the (possibly changed) node to the next extension.
    Continue(Node),
    /// Render nothing for this node.
    Stop,
}

/// A node rewrite. Extensions run in registration order, each seeing the previous output.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn apply<'a>(&'a self, node: Node, scope: &'a Scope<'a>) -> BoxFuture<'a, EvalResult<Rewrite>>;
}

/// Run `node` through every extension. The first `Stop` ends the chain.
pub async fn apply_extensions(
    node: Node,
    extensions: &[Arc<dyn Extension>],
    scope: &Scope<'_>,
) -> EvalResult<Rewrite> {
    let mut node = node;

    for extension in extensions {
        match extension.apply(node, scope).await? {
            Rewrite::Continue(next) => node = next,
            Rewrite::Stop => {
                debug!(extension = extension.name(), "Extension stopped node");
                return Ok(Rewrite::Stop);
            }
        }
    }

    Ok(Rewrite::Continue(node))
}

/// The canonical chain: visibility guard, class shortcut, iteration.
pub fn default_extensions() -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(VisibleIf),
        Arc::new(ClassShortcut::new()),
        Arc::new(Foreach),
    ]
}
