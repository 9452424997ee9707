/// Expression evaluation against a live scope
use crate::scope::Scope;
use crate::*;
use serde_json::json;

fn renderer() -> Renderer {
    Renderer::builder()
        .context(json!({
            "href": "foo",
            "pathname": "foo",
            "count": 5,
            "items": ["a", "b", "c"],
            "site": { "title": "Breeze" },
            "demo": { "element": "span", "children": "foobar" }
        }))
        .utilities(
            Utilities::new()
                .with("hello", |_, _| Ok(Value::from("hello")))
                .with("double", |_, args| match args.first() {
                    Some(Value::Number(n)) => Ok(Value::Number(n * 2.0)),
                    _ => Err(UtilityError::new("double expects a number")),
                })
                .with("propTitle", |receiver, _| {
                    Ok(receiver.props.get("title").unwrap_or_default())
                })
                .with_async("later", |_, args| async move {
                    Ok(args.into_iter().next().unwrap_or_default())
                }),
        )
        .build()
}

async fn eval(source: &str) -> Option<Value> {
    let renderer = renderer();
    let props = Value::from(json!({ "title": "foo", "flag": true, "zero": 0 }));
    let scope = Scope::new(&renderer, &props, 0);
    evaluate(source, &scope).await.unwrap()
}

async fn eval_err(source: &str) -> ExprError {
    let renderer = renderer();
    let props = Value::Null;
    let scope = Scope::new(&renderer, &props, 0);
    evaluate(source, &scope).await.unwrap_err()
}

#[tokio::test]
async fn test_literals() {
    assert_eq!(eval("'foobar'").await, Some(Value::from("foobar")));
    assert_eq!(eval("42").await, Some(Value::Number(42.0)));
    assert_eq!(eval("true").await, Some(Value::Bool(true)));
    assert_eq!(eval("null").await, Some(Value::Null));
    assert_eq!(eval("undefined").await, None);
    assert_eq!(
        eval("[1, 'a']").await,
        Some(Value::from(json!([1, "a"])))
    );
}

#[tokio::test]
async fn test_identifiers_prefer_props() {
    assert_eq!(eval("title").await, Some(Value::from("foo")));
    assert_eq!(eval("count").await, Some(Value::Number(5.0)));
    assert_eq!(eval("props.title").await, Some(Value::from("foo")));
    assert_eq!(eval("context.site.title").await, Some(Value::from("Breeze")));
    assert_eq!(eval("unknown").await, None);
}

#[tokio::test]
async fn test_member_access_on_missing_is_undefined() {
    assert_eq!(eval("context.missing.deeper").await, None);
    assert_eq!(eval("context.count.deeper").await, None);
}

#[tokio::test]
async fn test_index_and_length() {
    assert_eq!(eval("context.items[1]").await, Some(Value::from("b")));
    assert_eq!(eval("context.items.length").await, Some(Value::Number(3.0)));
    assert_eq!(eval("context.site['title']").await, Some(Value::from("Breeze")));
}

#[tokio::test]
async fn test_string_concatenation() {
    assert_eq!(eval("title + 'bar'").await, Some(Value::from("foobar")));
    assert_eq!(
        eval("context.href + context.pathname").await,
        Some(Value::from("foofoo"))
    );
    assert_eq!(eval("'n=' + count").await, Some(Value::from("n=5")));
}

#[tokio::test]
async fn test_arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3").await, Some(Value::Number(7.0)));
    assert_eq!(eval("(1 + 2) * 3").await, Some(Value::Number(9.0)));
    assert_eq!(eval("count % 2").await, Some(Value::Number(1.0)));
    assert_eq!(eval("-count + 1").await, Some(Value::Number(-4.0)));
}

#[tokio::test]
async fn test_comparisons() {
    assert_eq!(
        eval("context.href === context.pathname").await,
        Some(Value::Bool(true))
    );
    assert_eq!(eval("context.href === 'bar'").await, Some(Value::Bool(false)));
    assert_eq!(eval("count >= 5").await, Some(Value::Bool(true)));
    assert_eq!(eval("count != 5").await, Some(Value::Bool(false)));
}

#[tokio::test]
async fn test_logical_operators_return_operands() {
    assert_eq!(eval("flag && title").await, Some(Value::from("foo")));
    assert_eq!(eval("zero && title").await, Some(Value::Number(0.0)));
    assert_eq!(eval("zero || 'fallback'").await, Some(Value::from("fallback")));
    assert_eq!(eval("unknown || title").await, Some(Value::from("foo")));
    assert_eq!(eval("!flag").await, Some(Value::Bool(false)));
}

#[tokio::test]
async fn test_short_circuit_skips_failing_operand() {
    // the right side would fail to call; it is never evaluated
    assert_eq!(eval("false && nothing()").await, Some(Value::Bool(false)));
    assert_eq!(eval("true || nothing()").await, Some(Value::Bool(true)));
}

#[tokio::test]
async fn test_conditional() {
    assert_eq!(eval("flag ? 'yes' : 'no'").await, Some(Value::from("yes")));
    assert_eq!(eval("zero ? 'yes' : 'no'").await, Some(Value::from("no")));
}

#[tokio::test]
async fn test_utility_calls() {
    assert_eq!(eval("utilities.hello()").await, Some(Value::from("hello")));
    assert_eq!(eval("hello()").await, Some(Value::from("hello")));
    assert_eq!(eval("utilities.double(count)").await, Some(Value::Number(10.0)));
    assert_eq!(eval("utilities.propTitle()").await, Some(Value::from("foo")));
    assert_eq!(eval("utilities.later('async')").await, Some(Value::from("async")));
}

#[tokio::test]
async fn test_render_call_returns_markup() {
    assert_eq!(
        eval("render(context.demo)").await,
        Some(Value::from("<span>foobar</span>"))
    );
}

#[tokio::test]
async fn test_soft_errors() {
    assert!(matches!(eval_err("1 +").await, ExprError::Parse(_)));
    assert!(matches!(eval_err("a # b").await, ExprError::Parse(ParseError::LexerError { .. })));
    assert!(matches!(eval_err("nothing()").await, ExprError::NotCallable { .. }));
    assert!(matches!(eval_err("utilities.nothing()").await, ExprError::NotCallable { .. }));
    assert!(matches!(eval_err("utilities.double('x')").await, ExprError::Utility { .. }));
    assert!(matches!(eval_err("1 / 0").await, ExprError::TypeError { .. }));
    assert!(matches!(eval_err("render('text')").await, ExprError::InvalidRenderTarget { .. }));
    assert!(matches!(eval_err("render(undefined)").await, ExprError::InvalidRenderTarget { .. }));
}

#[tokio::test]
async fn test_evaluate_soft_swallows_soft_errors() {
    let renderer = renderer();
    let props = Value::Null;
    let scope = Scope::new(&renderer, &props, 0);

    assert_eq!(evaluate_soft("1 +", &scope).await, Ok(None));
    assert_eq!(evaluate_soft("nothing()", &scope).await, Ok(None));
}

#[tokio::test]
async fn test_evaluate_soft_keeps_fatal_errors() {
    let renderer = renderer();
    let props = Value::from(json!({ "broken": { "element": "Missing" } }));
    let scope = Scope::new(&renderer, &props, 0);

    assert_eq!(
        evaluate_soft("render(broken)", &scope).await,
        Err(EvalError::ComponentNotFound {
            name: "Missing".to_string()
        })
    );
}

#[tokio::test]
async fn test_deeply_nested_expression_drops_field() {
    let source = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    assert!(matches!(
        eval_err(&source).await,
        ExprError::Parse(ParseError::TooDeep { .. })
    ));

    let unit: Unit = serde_json::from_value(json!({
        "element": "p",
        "attributes": { "==title": format!("{}x", "!".repeat(20_000)) },
        "==children": source
    }))
    .unwrap();
    let html = renderer().render(&unit, Value::Null).await.unwrap();
    assert_eq!(html, "<p></p>");
}
