use crate::error::{EvalError, EvalResult, UtilityError};
use crate::scope::Scope;
use crate::value::Value;
use futures::future::{self, BoxFuture, FutureExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Structured utility invocation: `{ "utility": "name", "parameters": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityCall {
    pub utility: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
}

impl UtilityCall {
    pub fn new(utility: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            utility: utility.into(),
            parameters,
        }
    }

    /// Recognize a structured call inside a plain value.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let utility = map.get("utility")?.as_str()?.to_string();
        let parameters = match map.get("parameters") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(single) => vec![single.clone()],
        };

        Some(Self {
            utility,
            parameters,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = crate::value::Object::new();
        map.insert("utility".to_string(), Value::from(self.utility.as_str()));
        if !self.parameters.is_empty() {
            map.insert("parameters".to_string(), Value::Array(self.parameters.clone()));
        }
        Value::Object(map)
    }
}

/// What a utility sees besides its positional arguments.
#[derive(Debug, Clone)]
pub struct Receiver {
    pub context: Arc<Value>,
    pub props: Value,
}

impl Receiver {
    /// `"context"` or `"props"`.
    pub fn root(&self, name: &str) -> Option<&Value> {
        match name {
            "context" => Some(self.context.as_ref()),
            "props" => Some(&self.props),
            _ => None,
        }
    }
}

type SyncFn = dyn Fn(&Receiver, Vec<Value>) -> Result<Value, UtilityError> + Send + Sync;
type AsyncFn =
    dyn Fn(Receiver, Vec<Value>) -> BoxFuture<'static, Result<Value, UtilityError>> + Send + Sync;

/// A host function callable from templates.
#[derive(Clone)]
pub enum Utility {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl Utility {
    pub fn invoke(
        &self,
        receiver: Receiver,
        arguments: Vec<Value>,
    ) -> BoxFuture<'static, Result<Value, UtilityError>> {
        match self {
            Utility::Sync(f) => future::ready(f(&receiver, arguments)).boxed(),
            Utility::Async(f) => f(receiver, arguments),
        }
    }
}

/// Name to function table shared by every node of a render.
#[derive(Clone, Default)]
pub struct Utilities {
    table: IndexMap<String, Utility>,
}

impl Utilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table preloaded with the built-in helpers (`get`, `concat`, `join`, ...).
    pub fn with_defaults() -> Self {
        let mut utilities = Self::new();
        crate::builtins::register_defaults(&mut utilities);
        utilities
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Receiver, Vec<Value>) -> Result<Value, UtilityError> + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Utility::Sync(Arc::new(f)));
    }

    pub fn register_async<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Receiver, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, UtilityError>> + Send + 'static,
    {
        let wrapped = move |receiver: Receiver, arguments: Vec<Value>| {
            f(receiver, arguments).boxed()
        };
        self.table
            .insert(name.into(), Utility::Async(Arc::new(wrapped)));
    }

    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Receiver, Vec<Value>) -> Result<Value, UtilityError> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn with_async<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Receiver, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, UtilityError>> + Send + 'static,
    {
        self.register_async(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Utility> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Merge another table in; later registrations win.
    pub fn extend(&mut self, other: Utilities) {
        self.table.extend(other.table);
    }
}

impl fmt::Debug for Utilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utilities")
            .field("names", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Dispatch a structured call. Missing utilities are fatal, failing ones are not.
pub fn apply_call<'a>(
    call: &'a UtilityCall,
    scope: &'a Scope<'a>,
) -> BoxFuture<'a, EvalResult<Option<Value>>> {
    async move {
        let Some(utility) = scope.utilities().get(&call.utility) else {
            error!(utility = %call.utility, "Utility not found");
            return Err(EvalError::UtilityNotFound {
                name: call.utility.clone(),
            });
        };

        let arguments = future::try_join_all(
            call.parameters
                .iter()
                .map(|parameter| resolve_parameter(parameter, scope)),
        )
        .await?;

        debug!(utility = %call.utility, arguments = arguments.len(), "Applying utility");

        let arguments = arguments
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();

        match utility.invoke(scope.receiver(), arguments).await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(utility = %call.utility, error = %e, "Utility failed");
                Ok(None)
            }
        }
    }
    .boxed()
}

/// Dispatch `value` if it is a structured call, otherwise hand it back unchanged.
pub async fn apply_utility(value: &Value, scope: &Scope<'_>) -> EvalResult<Option<Value>> {
    match UtilityCall::from_value(value) {
        Some(call) => apply_call(&call, scope).await,
        None => Ok(Some(value.clone())),
    }
}

fn resolve_parameter<'a>(
    parameter: &'a Value,
    scope: &'a Scope<'a>,
) -> BoxFuture<'a, EvalResult<Option<Value>>> {
    async move { apply_utility(parameter, scope).await }.boxed()
}
