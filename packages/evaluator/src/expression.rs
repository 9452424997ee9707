//! Evaluator for `==` binding expressions.
//!
//! Expressions see `context`, `props`, the utility table and a re-entrant `render`.
//! Results are `Option<Value>` where `None` stands for `undefined`.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{EvalResult, ExprError, ExprResult};
use crate::node::Unit;
use crate::parser::parse;
use crate::scope::Scope;
use crate::value::{format_number, Value};
use futures::future::{self, BoxFuture, FutureExt};
use std::cmp::Ordering;
use tracing::{instrument, warn};

/// Parse and evaluate `source` against `scope`.
pub async fn evaluate(source: &str, scope: &Scope<'_>) -> ExprResult<Option<Value>> {
    let expr = parse(source)?;
    eval_expr(&expr, scope).await
}

/// Like [`evaluate`], but soft failures are logged and read as `undefined`.
/// Only fatal errors from nested renders come back as `Err`.
#[instrument(skip(scope), level = "debug")]
pub async fn evaluate_soft(source: &str, scope: &Scope<'_>) -> EvalResult<Option<Value>> {
    match evaluate(source, scope).await {
        Ok(value) => Ok(value),
        Err(ExprError::Fatal(e)) => Err(e),
        Err(e) => {
            warn!(expression = source, error = %e, "Expression failed");
            Ok(None)
        }
    }
}

pub fn eval_expr<'a>(
    expr: &'a Expr,
    scope: &'a Scope<'a>,
) -> BoxFuture<'a, ExprResult<Option<Value>>> {
    async move {
        match expr {
            Expr::Literal(value) => Ok(Some(value.clone())),

            Expr::Undefined => Ok(None),

            Expr::Identifier(name) => Ok(eval_identifier(name, scope)),

            Expr::Member { object, property } => {
                if let Some(path) = static_path(expr) {
                    return Ok(scope.lookup(&path));
                }
                let object = eval_expr(object, scope).await?;
                Ok(object.and_then(|o| o.get(property)))
            }

            Expr::Index { object, index } => {
                let (object, index) =
                    future::try_join(eval_expr(object, scope), eval_expr(index, scope)).await?;

                let key = match index {
                    Some(Value::Number(n)) => format_number(n),
                    Some(Value::String(s)) => s,
                    _ => return Ok(None),
                };
                Ok(object.and_then(|o| o.get(&key)))
            }

            Expr::Call { callee, arguments } => eval_call(callee, arguments, scope).await,

            Expr::Unary { operator, operand } => {
                let value = eval_expr(operand, scope).await?;
                eval_unary(*operator, value).map(Some)
            }

            Expr::Binary {
                left,
                operator: BinaryOp::And,
                right,
            } => {
                let left = eval_expr(left, scope).await?;
                if !is_truthy(&left) {
                    return Ok(left);
                }
                eval_expr(right, scope).await
            }

            Expr::Binary {
                left,
                operator: BinaryOp::Or,
                right,
            } => {
                let left = eval_expr(left, scope).await?;
                if is_truthy(&left) {
                    return Ok(left);
                }
                eval_expr(right, scope).await
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let (left, right) =
                    future::try_join(eval_expr(left, scope), eval_expr(right, scope)).await?;
                eval_binary(*operator, left, right).map(Some)
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = eval_expr(test, scope).await?;
                if is_truthy(&test) {
                    eval_expr(consequent, scope).await
                } else {
                    eval_expr(alternate, scope).await
                }
            }

            Expr::Array(items) => {
                let values = eval_arguments(items, scope).await?;
                Ok(Some(Value::Array(values)))
            }
        }
    }
    .boxed()
}

fn eval_identifier(name: &str, scope: &Scope<'_>) -> Option<Value> {
    match name {
        "context" => Some(scope.context().clone()),
        "props" => Some(scope.props().clone()),
        // only meaningful as call targets
        "utilities" | "render" => None,
        _ => scope.lookup(name),
    }
}

/// `a.b.c` rooted at a data identifier, as a dot path. Avoids cloning whole roots.
fn static_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(name) if name != "utilities" && name != "render" => Some(name.clone()),
        Expr::Member { object, property } => {
            let mut path = static_path(object)?;
            path.push('.');
            path.push_str(property);
            Some(path)
        }
        _ => None,
    }
}

async fn eval_arguments(arguments: &[Expr], scope: &Scope<'_>) -> ExprResult<Vec<Value>> {
    let values =
        future::try_join_all(arguments.iter().map(|argument| eval_expr(argument, scope))).await?;
    Ok(values.into_iter().map(Option::unwrap_or_default).collect())
}

async fn eval_call(
    callee: &Expr,
    arguments: &[Expr],
    scope: &Scope<'_>,
) -> ExprResult<Option<Value>> {
    match callee {
        Expr::Identifier(name) if name == "render" => {
            let target = match arguments.first() {
                Some(argument) => eval_expr(argument, scope).await?,
                None => None,
            };
            let target = target.ok_or_else(|| ExprError::InvalidRenderTarget {
                message: "got undefined".to_string(),
            })?;

            let unit = Unit::try_from(target)?;
            let html = scope.render(&unit).await?;
            Ok(Some(Value::String(html)))
        }

        Expr::Member { object, property } if is_identifier(object, "utilities") => {
            call_utility(property, arguments, scope).await
        }

        Expr::Identifier(name) if scope.utilities().contains(name) => {
            call_utility(name, arguments, scope).await
        }

        Expr::Identifier(name) => Err(ExprError::NotCallable { name: name.clone() }),

        Expr::Member { property, .. } => Err(ExprError::NotCallable {
            name: property.clone(),
        }),

        _ => Err(ExprError::NotCallable {
            name: "expression".to_string(),
        }),
    }
}

async fn call_utility(
    name: &str,
    arguments: &[Expr],
    scope: &Scope<'_>,
) -> ExprResult<Option<Value>> {
    let utility = scope
        .utilities()
        .get(name)
        .ok_or_else(|| ExprError::NotCallable {
            name: name.to_string(),
        })?;

    let arguments = eval_arguments(arguments, scope).await?;

    utility
        .invoke(scope.receiver(), arguments)
        .await
        .map(Some)
        .map_err(|e| ExprError::Utility {
            name: name.to_string(),
            message: e.message,
        })
}

fn is_identifier(expr: &Expr, expected: &str) -> bool {
    matches!(expr, Expr::Identifier(name) if name == expected)
}

fn is_truthy(value: &Option<Value>) -> bool {
    value.as_ref().map_or(false, Value::is_truthy)
}

fn eval_unary(operator: UnaryOp, value: Option<Value>) -> ExprResult<Value> {
    match operator {
        UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
        UnaryOp::Negate => to_number(&value, "-").map(|n| Value::Number(-n)),
    }
}

fn eval_binary(
    operator: BinaryOp,
    left: Option<Value>,
    right: Option<Value>,
) -> ExprResult<Value> {
    let symbol = operator.symbol();

    match operator {
        BinaryOp::Add => {
            if is_textual(&left) || is_textual(&right) {
                Ok(Value::String(format!(
                    "{}{}",
                    display(&left),
                    display(&right)
                )))
            } else {
                Ok(Value::Number(
                    to_number(&left, symbol)? + to_number(&right, symbol)?,
                ))
            }
        }

        BinaryOp::Subtract => arithmetic(&left, &right, symbol, |a, b| a - b),
        BinaryOp::Multiply => arithmetic(&left, &right, symbol, |a, b| a * b),

        BinaryOp::Divide | BinaryOp::Remainder => {
            let divisor = to_number(&right, symbol)?;
            if divisor == 0.0 {
                return Err(ExprError::type_error(format!(
                    "Division by zero in '{}'",
                    symbol
                )));
            }
            let dividend = to_number(&left, symbol)?;
            Ok(Value::Number(if operator == BinaryOp::Divide {
                dividend / divisor
            } else {
                dividend % divisor
            }))
        }

        BinaryOp::StrictEquals => Ok(Value::Bool(strict_equals(&left, &right))),
        BinaryOp::StrictNotEquals => Ok(Value::Bool(!strict_equals(&left, &right))),
        BinaryOp::Equals => Ok(Value::Bool(loose_equals(&left, &right))),
        BinaryOp::NotEquals => Ok(Value::Bool(!loose_equals(&left, &right))),

        BinaryOp::LessThan => Ok(compare(&left, &right, Ordering::is_lt)),
        BinaryOp::LessThanOrEqual => Ok(compare(&left, &right, Ordering::is_le)),
        BinaryOp::GreaterThan => Ok(compare(&left, &right, Ordering::is_gt)),
        BinaryOp::GreaterThanOrEqual => Ok(compare(&left, &right, Ordering::is_ge)),

        // short-circuited in eval_expr
        BinaryOp::And | BinaryOp::Or => Err(ExprError::type_error(format!(
            "'{}' evaluated without short-circuit",
            symbol
        ))),
    }
}

fn arithmetic(
    left: &Option<Value>,
    right: &Option<Value>,
    symbol: &str,
    op: impl Fn(f64, f64) -> f64,
) -> ExprResult<Value> {
    Ok(Value::Number(op(
        to_number(left, symbol)?,
        to_number(right, symbol)?,
    )))
}

fn is_textual(value: &Option<Value>) -> bool {
    matches!(
        value,
        Some(Value::String(_) | Value::Array(_) | Value::Object(_))
    )
}

fn display(value: &Option<Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "undefined".to_string(),
    }
}

/// Numeric coercion for primitives. Arrays and objects are a type error.
fn to_number(value: &Option<Value>, symbol: &str) -> ExprResult<f64> {
    match value {
        None => Ok(f64::NAN),
        Some(Value::Null) => Ok(0.0),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => Ok(*n),
        Some(Value::String(s)) => Ok(parse_number(s)),
        Some(other) => Err(ExprError::type_error(format!(
            "Cannot apply '{}' to {}",
            symbol,
            other.type_name()
        ))),
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        0.0
    } else {
        trimmed.parse().unwrap_or(f64::NAN)
    }
}

fn strict_equals(left: &Option<Value>, right: &Option<Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        // structural, so NaN never equals itself
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn loose_equals(left: &Option<Value>, right: &Option<Value>) -> bool {
    let nullish = |v: &Option<Value>| matches!(v, None | Some(Value::Null));

    match (left, right) {
        (l, r) if nullish(l) || nullish(r) => nullish(l) && nullish(r),
        (Some(Value::Number(a)), Some(Value::String(s)))
        | (Some(Value::String(s)), Some(Value::Number(a))) => *a == parse_number(s),
        (Some(Value::Bool(b)), other) | (other, Some(Value::Bool(b))) => {
            let flag = if *b { 1.0 } else { 0.0 };
            to_number(other, "==").map_or(false, |n| n == flag)
        }
        _ => strict_equals(left, right),
    }
}

fn compare(
    left: &Option<Value>,
    right: &Option<Value>,
    test: impl Fn(Ordering) -> bool,
) -> Value {
    let ordering = match (left, right) {
        (Some(Value::String(a)), Some(Value::String(b))) => Some(a.cmp(b)),
        _ => match (to_number(left, "<"), to_number(right, "<")) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    Value::Bool(ordering.map_or(false, test))
}
