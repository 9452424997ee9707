//! # Tree Renderer
//!
//! Renders a component tree (`Unit`) to an HTML string.
//!
//! ## Per-node pipeline
//!
//! 1. Scoped props: the node's `props` bindings resolved against the parent scope. A node
//!    without `props` inherits the parent's props.
//! 2. Substitution: an `element` naming a registry entry renders that entry with the
//!    scoped props. Extensions never see the substituted node.
//! 3. Extensions, in order. `Stop` renders nothing.
//! 4. Element: a name changed by an extension, else `__element`, else `element`.
//! 5. Attributes and children are resolved, then composed (see [`crate::html`]).
//!
//! ## Ordering
//!
//! Siblings, binding entries and iteration items are evaluated concurrently, but output
//! always follows declaration order. Two renders of the same input produce identical
//! strings.
//!
//! ## Error boundaries
//!
//! Missing bindings, failing expressions and failing utilities degrade to absence and are
//! logged. Configuration errors (unknown component or utility, bad iteration source,
//! depth limit) abort the whole render.

use crate::binding::resolve;
use crate::error::{EvalError, EvalResult};
use crate::expression::evaluate_soft;
use crate::extensions::{apply_extensions, Extension, Rewrite};
use crate::html::compose;
use crate::node::{Children, Node, Registry, Unit};
use crate::scope::Scope;
use crate::utility::{apply_call, Utilities};
use crate::value::Value;
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, debug_span, error, instrument, Instrument};

/// Keeps the nested future chain of a cyclic registry inside a 2 MB thread stack.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Nesting limit for children, substitutions and nested `render(...)` calls.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Immutable render configuration. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Renderer {
    registry: Arc<Registry>,
    extensions: Arc<Vec<Arc<dyn Extension>>>,
    context: Arc<Value>,
    utilities: Arc<Utilities>,
    options: RenderOptions,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("components", &self.registry.len())
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field("utilities", &self.utilities)
            .field("options", &self.options)
            .finish()
    }
}

impl Renderer {
    pub fn builder() -> RendererBuilder {
        RendererBuilder::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub(crate) fn shared_context(&self) -> &Arc<Value> {
        &self.context
    }

    pub fn utilities(&self) -> &Utilities {
        &self.utilities
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `unit` with `props` as the root scope.
    #[instrument(skip(self, unit, props), fields(nodes = unit.nodes().len()))]
    pub async fn render(&self, unit: &Unit, props: Value) -> EvalResult<String> {
        debug!("Starting render");
        let html = self.render_nodes(unit.nodes(), &props, 0).await?;
        debug!(bytes = html.len(), "Render complete");
        Ok(html)
    }

    /// Render every node concurrently and join the results in order.
    pub(crate) fn render_nodes<'a>(
        &'a self,
        nodes: &'a [Node],
        props: &'a Value,
        depth: usize,
    ) -> BoxFuture<'a, EvalResult<String>> {
        async move {
            match nodes {
                [] => Ok(String::new()),
                [node] => self.render_node(node, props, depth).await,
                _ => {
                    let parts = future::try_join_all(
                        nodes
                            .iter()
                            .map(|node| self.render_node(node, props, depth)),
                    )
                    .await?;
                    Ok(parts.concat())
                }
            }
        }
        .boxed()
    }

    fn render_node<'a>(
        &'a self,
        node: &'a Node,
        parent_props: &'a Value,
        depth: usize,
    ) -> BoxFuture<'a, EvalResult<String>> {
        let span = debug_span!("render_node", element = ?node.element, depth);

        async move {
            if depth > self.options.max_depth {
                error!(max_depth = self.options.max_depth, "Render depth limit exceeded");
                return Err(EvalError::RecursionLimit {
                    depth: self.options.max_depth,
                    element: node.element.clone(),
                });
            }

            let parent_scope = Scope::new(self, parent_props, depth);
            let props = match &node.props {
                Some(bindings) => Value::Object(resolve(Some(bindings), &parent_scope).await?),
                None => parent_props.clone(),
            };

            if let Some(name) = node.element.as_deref() {
                if let Some(unit) = self.registry.get(name) {
                    debug!(component = name, "Substituting component");
                    return self.render_nodes(unit.nodes(), &props, depth + 1).await;
                }
                if is_component_name(name) {
                    error!(component = name, "Component not found");
                    return Err(EvalError::ComponentNotFound {
                        name: name.to_string(),
                    });
                }
            }

            let scope = Scope::new(self, &props, depth);

            let rewritten: Cow<'_, Node> = if self.extensions.is_empty() {
                Cow::Borrowed(node)
            } else {
                match apply_extensions(node.clone(), &self.extensions, &scope).await? {
                    Rewrite::Continue(next) => Cow::Owned(next),
                    Rewrite::Stop => return Ok(String::new()),
                }
            };

            let element = resolve_element(node, &rewritten, &scope);
            let attributes = resolve(rewritten.attributes.as_ref(), &scope).await?;
            let content = self.render_children(&rewritten, &scope, depth).await?;

            Ok(compose(
                element.as_deref(),
                &attributes,
                &content,
                rewritten.closing_character.as_deref(),
            ))
        }
        .instrument(span)
        .boxed()
    }

    async fn render_children(
        &self,
        node: &Node,
        scope: &Scope<'_>,
        depth: usize,
    ) -> EvalResult<String> {
        // empty text counts as absent so the bound forms below still apply
        let children = node
            .children
            .as_ref()
            .filter(|children| !matches!(children, Children::Text(text) if text.is_empty()));

        if let Some(children) = children {
            return match children {
                Children::Text(text) => Ok(text.clone()),
                Children::Nodes(nodes) => self.render_nodes(nodes, scope.props(), depth + 1).await,
                Children::Call(call) => Ok(display(apply_call(call, scope).await?)),
            };
        }

        if let Some(path) = &node.children_path {
            return Ok(display(scope.lookup(path)));
        }

        if let Some(source) = &node.children_expression {
            return Ok(display(evaluate_soft(source, scope).await?));
        }

        Ok(String::new())
    }
}

/// An element set by an extension wins over `__element`, which wins over `element`.
fn resolve_element(original: &Node, rewritten: &Node, scope: &Scope<'_>) -> Option<String> {
    if rewritten.element != original.element {
        return rewritten.element.clone();
    }

    if let Some(path) = &rewritten.element_path {
        let found = scope
            .lookup(path)
            .filter(Value::is_truthy)
            .map(|v| v.to_string());
        if found.is_some() {
            return found;
        }
    }

    rewritten.element.clone()
}

fn display(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => value.to_string(),
    }
}

/// Capitalized names like `Button` refer to components; all-caps names and markup
/// declarations (`!DOCTYPE`, `?xml`) do not.
fn is_component_name(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    first.is_uppercase() && name != name.to_uppercase()
}

pub struct RendererBuilder {
    registry: Registry,
    extensions: Vec<Arc<dyn Extension>>,
    context: Value,
    utilities: Utilities,
    options: RenderOptions,
}

impl Default for RendererBuilder {
    fn default() -> Self {
        Self {
            registry: Registry::new(),
            extensions: Vec::new(),
            context: Value::object(),
            utilities: Utilities::new(),
            options: RenderOptions::default(),
        }
    }
}

impl RendererBuilder {
    pub fn components(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn extensions(mut self, extensions: Vec<Arc<dyn Extension>>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Append one extension after those already configured.
    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn context(mut self, context: impl Into<Value>) -> Self {
        self.context = context.into();
        self
    }

    pub fn utilities(mut self, utilities: Utilities) -> Self {
        self.utilities = utilities;
        self
    }

    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Renderer {
        Renderer {
            registry: Arc::new(self.registry),
            extensions: Arc::new(self.extensions),
            context: Arc::new(self.context),
            utilities: Arc::new(self.utilities),
            options: self.options,
        }
    }
}

/// One-shot render without keeping a [`Renderer`] around.
pub async fn render(
    unit: &Unit,
    registry: Registry,
    extensions: Vec<Arc<dyn Extension>>,
    context: Value,
    props: Value,
    utilities: Utilities,
) -> EvalResult<String> {
    Renderer::builder()
        .components(registry)
        .extensions(extensions)
        .context(context)
        .utilities(utilities)
        .build()
        .render(unit, props)
        .await
}
