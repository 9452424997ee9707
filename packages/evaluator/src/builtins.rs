//! Host helpers available through [`Utilities::with_defaults`].

use crate::error::UtilityError;
use crate::utility::{Receiver, Utilities};
use crate::value::Value;

pub(crate) fn register_defaults(utilities: &mut Utilities) {
    utilities.register("get", get);
    utilities.register("concat", concat);
    utilities.register("join", join);
    utilities.register("equals", |_, args| {
        Ok(Value::Bool(argument(&args, 0) == argument(&args, 1)))
    });
    utilities.register("not", |_, args| {
        Ok(Value::Bool(!argument(&args, 0).is_truthy()))
    });
    utilities.register("stringify", stringify);
    utilities.register("uppercase", |_, args| {
        Ok(Value::String(argument(&args, 0).to_string().to_uppercase()))
    });
    utilities.register("lowercase", |_, args| {
        Ok(Value::String(argument(&args, 0).to_string().to_lowercase()))
    });
}

fn argument(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// `get(root, path)` where root is `"context"` or `"props"`.
fn get(receiver: &Receiver, args: Vec<Value>) -> Result<Value, UtilityError> {
    let root_name = argument(&args, 0);
    let root_name = root_name
        .as_str()
        .ok_or_else(|| UtilityError::new("get: root must be a string"))?;
    let root = receiver.root(root_name).ok_or_else(|| {
        UtilityError::new(format!(
            "get: unknown root '{}', expected 'context' or 'props'",
            root_name
        ))
    })?;

    let path = argument(&args, 1);
    let path = path.as_str().unwrap_or_default();

    Ok(root.lookup_path(path).unwrap_or_default())
}

/// Arrays concatenate when the first argument is an array, everything else joins as text.
fn concat(_: &Receiver, args: Vec<Value>) -> Result<Value, UtilityError> {
    if matches!(args.first(), Some(Value::Array(_))) {
        let mut items = Vec::new();
        for arg in args {
            match arg {
                Value::Array(inner) => items.extend(inner),
                other => items.push(other),
            }
        }
        return Ok(Value::Array(items));
    }

    Ok(Value::String(
        args.iter()
            .filter(|arg| !arg.is_null())
            .map(Value::to_string)
            .collect(),
    ))
}

fn join(_: &Receiver, args: Vec<Value>) -> Result<Value, UtilityError> {
    let separator = match args.get(1) {
        Some(Value::String(s)) => s.clone(),
        _ => ",".to_string(),
    };

    match args.first() {
        Some(Value::Array(items)) => Ok(Value::String(
            items
                .iter()
                .map(|item| if item.is_null() { String::new() } else { item.to_string() })
                .collect::<Vec<_>>()
                .join(&separator),
        )),
        Some(other) => Err(UtilityError::new(format!(
            "join: expected an array, got {}",
            other.type_name()
        ))),
        None => Err(UtilityError::new("join: missing array argument")),
    }
}

fn stringify(_: &Receiver, args: Vec<Value>) -> Result<Value, UtilityError> {
    let json: serde_json::Value = argument(&args, 0).into();
    serde_json::to_string(&json)
        .map(Value::String)
        .map_err(|e| UtilityError::new(e.to_string()))
}
