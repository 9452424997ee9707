pub mod ast;
pub mod binding;
mod builtins;
pub mod error;
pub mod expression;
pub mod extensions;
pub mod html;
pub mod node;
pub mod parser;
pub mod renderer;
pub mod scope;
pub mod tokenizer;
pub mod utility;
pub mod value;



#[cfg(test)]
mod tests_expressions;

#[cfg(test)]
mod tests_extensions;

#[cfg(test)]
mod tests_utilities;

pub use binding::{Binding, Bindings};
pub use error::{EvalError, EvalResult, ExprError, ExprResult, ParseError, ParseResult, UtilityError};
pub use expression::{evaluate, evaluate_soft};
pub use extensions::{
    apply_extensions, default_extensions, ClassShortcut, Extension, Foreach, Rewrite, VisibleIf,
};
pub use node::{Children, Node, Registry, Unit};
pub use renderer::{render, RenderOptions, Renderer, RendererBuilder, DEFAULT_MAX_DEPTH};
pub use scope::Scope;
pub use utility::{apply_call, apply_utility, Receiver, Utilities, Utility, UtilityCall};
pub use value::{Object, Value};
