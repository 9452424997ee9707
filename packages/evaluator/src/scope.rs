use crate::error::EvalResult;
use crate::node::Unit;
use crate::renderer::Renderer;
use crate::utility::{Receiver, Utilities};
use crate::value::Value;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

static NO_PROPS: Value = Value::Null;

/// Everything a binding, expression or extension can see while one node renders.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    renderer: &'a Renderer,
    props: &'a Value,
    depth: usize,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(renderer: &'a Renderer, props: &'a Value, depth: usize) -> Self {
        Self {
            renderer,
            props,
            depth,
        }
    }

    pub fn context(&self) -> &'a Value {
        self.renderer.context()
    }

    pub fn props(&self) -> &'a Value {
        self.props
    }

    pub fn utilities(&self) -> &'a Utilities {
        self.renderer.utilities()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Same renderer and depth, different props.
    pub fn with_props<'b>(&self, props: &'b Value) -> Scope<'b>
    where
        'a: 'b,
    {
        Scope {
            renderer: self.renderer,
            props,
            depth: self.depth,
        }
    }

    /// Resolve a dot path. `context.` and `props.` pick the root explicitly. Otherwise the
    /// first segment decides: a prop with that name shadows context for the whole path.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let (root, rest) = path.split_once('.').unwrap_or((path, ""));

        match root {
            "context" => self.context().lookup_path(rest),
            "props" => self.props.lookup_path(rest),
            _ if self.has_prop(root) => self.props.lookup_path(path),
            _ => self.context().lookup_path(path),
        }
    }

    fn has_prop(&self, name: &str) -> bool {
        self.props
            .as_object()
            .map_or(false, |props| props.contains_key(name))
    }

    pub fn receiver(&self) -> Receiver {
        Receiver {
            context: Arc::clone(self.renderer.shared_context()),
            props: self.props.clone(),
        }
    }

    /// Render a sub-tree with empty props, one level deeper.
    pub fn render<'b>(&self, unit: &'b Unit) -> BoxFuture<'b, EvalResult<String>>
    where
        'a: 'b,
    {
        self.renderer
            .render_nodes(unit.nodes(), &NO_PROPS, self.depth + 1)
    }

    /// Render a sub-tree with the given props, one level deeper.
    pub fn render_with_props<'b>(
        &self,
        unit: &'b Unit,
        props: Value,
    ) -> BoxFuture<'b, EvalResult<String>>
    where
        'a: 'b,
    {
        let renderer = self.renderer;
        let depth = self.depth + 1;

        async move { renderer.render_nodes(unit.nodes(), &props, depth).await }.boxed()
    }
}
