/// Utility dispatch from templates: expressions, structured calls and built-ins
use crate::*;
use serde_json::json;

fn utilities() -> Utilities {
    Utilities::with_defaults()
        .with("hello", |_, _| Ok(Value::from("hello")))
        .with("greet", |receiver, args| {
            let name = args.first().cloned().unwrap_or_default();
            let site = receiver
                .root("context")
                .and_then(|c| c.lookup_path("site"))
                .unwrap_or_default();
            Ok(Value::String(format!("Hi {} from {}", name, site)))
        })
        .with("explode", |_, _| Err(UtilityError::new("boom")))
}

async fn render_json(component: serde_json::Value) -> EvalResult<String> {
    let unit: Unit = serde_json::from_value(component).unwrap();
    Renderer::builder()
        .context(json!({ "site": "Breeze", "items": ["a", "b"] }))
        .utilities(utilities())
        .build()
        .render(&unit, Value::Null)
        .await
}

#[tokio::test]
async fn test_utilities_in_children_expression() {
    assert_eq!(
        render_json(json!({ "element": "div", "==children": "utilities.hello()" }))
            .await
            .unwrap(),
        "<div>hello</div>"
    );
}

#[tokio::test]
async fn test_utilities_in_attribute_expression() {
    assert_eq!(
        render_json(json!({
            "element": "div",
            "attributes": { "==title": "utilities.hello()" },
            "children": "test"
        }))
        .await
        .unwrap(),
        r#"<div title="hello">test</div>"#
    );
}

#[tokio::test]
async fn test_structured_children_call() {
    assert_eq!(
        render_json(json!({
            "element": "p",
            "children": { "utility": "greet", "parameters": ["Ada"] }
        }))
        .await
        .unwrap(),
        "<p>Hi Ada from Breeze</p>"
    );
}

#[tokio::test]
async fn test_structured_attribute_call_with_nested_parameters() {
    assert_eq!(
        render_json(json!({
            "element": "a",
            "attributes": {
                "title": {
                    "utility": "join",
                    "parameters": [{ "utility": "get", "parameters": ["context", "items"] }, "-"]
                }
            }
        }))
        .await
        .unwrap(),
        r#"<a title="a-b"></a>"#
    );
}

#[tokio::test]
async fn test_structured_props_call() {
    assert_eq!(
        render_json(json!({
            "element": "h1",
            "props": { "title": { "utility": "uppercase", "parameters": ["docs"] } },
            "__children": "title"
        }))
        .await
        .unwrap(),
        "<h1>DOCS</h1>"
    );
}

#[tokio::test]
async fn test_failing_utility_is_soft() {
    assert_eq!(
        render_json(json!({
            "element": "p",
            "attributes": { "title": { "utility": "explode" } },
            "children": { "utility": "explode" }
        }))
        .await
        .unwrap(),
        "<p></p>"
    );
    assert_eq!(
        render_json(json!({ "element": "p", "==children": "utilities.explode()" }))
            .await
            .unwrap(),
        "<p></p>"
    );
}

#[tokio::test]
async fn test_missing_structured_utility_is_fatal() {
    let err = render_json(json!({ "element": "p", "children": { "utility": "nope" } }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EvalError::UtilityNotFound {
            name: "nope".to_string()
        }
    );
}

#[tokio::test]
async fn test_missing_expression_utility_is_soft() {
    assert_eq!(
        render_json(json!({ "element": "p", "==children": "utilities.nope()" }))
            .await
            .unwrap(),
        "<p></p>"
    );
}

#[tokio::test]
async fn test_builtins_from_expressions() {
    assert_eq!(
        render_json(json!({
            "element": "p",
            "==children": "join(context.items, ', ') + ' ' + lowercase('DONE')"
        }))
        .await
        .unwrap(),
        "<p>a, b done</p>"
    );
    assert_eq!(
        render_json(json!({
            "element": "p",
            "==children": "equals(context.site, 'Breeze') && not(false)"
        }))
        .await
        .unwrap(),
        "<p>true</p>"
    );
}
