/// Canonical extensions: visibility guard, class shortcut and iteration
use crate::*;
use serde_json::json;
use std::sync::Arc;

async fn render_with(
    component: serde_json::Value,
    extensions: Vec<Arc<dyn Extension>>,
    context: serde_json::Value,
) -> EvalResult<String> {
    let unit: Unit = serde_json::from_value(component).unwrap();
    Renderer::builder()
        .extensions(extensions)
        .context(context)
        .utilities(Utilities::with_defaults())
        .build()
        .render(&unit, Value::Null)
        .await
}

fn visible_if() -> Vec<Arc<dyn Extension>> {
    vec![Arc::new(VisibleIf)]
}

fn class_shortcut() -> Vec<Arc<dyn Extension>> {
    vec![Arc::new(ClassShortcut::new())]
}

fn foreach() -> Vec<Arc<dyn Extension>> {
    vec![Arc::new(Foreach)]
}

// visibleIf

#[tokio::test]
async fn test_visible_if_empty_string_hides() {
    let html = render_with(json!({ "element": "span", "visibleIf": "" }), visible_if(), json!({}))
        .await
        .unwrap();
    assert_eq!(html, "");
}

#[tokio::test]
async fn test_visible_if_context() {
    let component = json!({ "element": "span", "visibleIf": "context.visible" });

    assert_eq!(
        render_with(component.clone(), visible_if(), json!({ "visible": true }))
            .await
            .unwrap(),
        "<span></span>"
    );
    assert_eq!(
        render_with(component, visible_if(), json!({ "visible": false }))
            .await
            .unwrap(),
        ""
    );
}

#[tokio::test]
async fn test_visible_if_props() {
    assert_eq!(
        render_with(
            json!({ "element": "span", "props": { "foo": true }, "visibleIf": "foo" }),
            visible_if(),
            json!({})
        )
        .await
        .unwrap(),
        "<span></span>"
    );
    assert_eq!(
        render_with(
            json!({ "element": "span", "props": { "foo": false }, "visibleIf": "foo" }),
            visible_if(),
            json!({})
        )
        .await
        .unwrap(),
        ""
    );
    assert_eq!(
        render_with(
            json!({
                "element": "span",
                "props": { "foo": true },
                "visibleIf": "context.visible && foo"
            }),
            visible_if(),
            json!({ "visible": true })
        )
        .await
        .unwrap(),
        "<span></span>"
    );
}

#[tokio::test]
async fn test_visible_if_boolean_call_and_empty_array() {
    assert_eq!(
        render_with(json!({ "element": "b", "visibleIf": false }), visible_if(), json!({}))
            .await
            .unwrap(),
        ""
    );
    assert_eq!(
        render_with(
            json!({
                "element": "b",
                "visibleIf": { "utility": "get", "parameters": ["context", "items"] }
            }),
            visible_if(),
            json!({ "items": [] })
        )
        .await
        .unwrap(),
        ""
    );
    assert_eq!(
        render_with(
            json!({
                "element": "b",
                "visibleIf": { "utility": "get", "parameters": ["context", "items"] }
            }),
            visible_if(),
            json!({ "items": [1] })
        )
        .await
        .unwrap(),
        "<b></b>"
    );
}

#[tokio::test]
async fn test_hidden_node_skips_later_extensions() {
    // foreach would fail on a non-array source, but visibleIf stops first
    let html = render_with(
        json!({
            "element": "ul",
            "visibleIf": "false",
            "foreach": ["context.notArray", { "element": "li" }]
        }),
        default_extensions(),
        json!({ "notArray": 3 }),
    )
    .await
    .unwrap();
    assert_eq!(html, "");
}

// class shortcut

#[tokio::test]
async fn test_class_shortcut_plain() {
    assert_eq!(
        render_with(
            json!({ "element": "span", "class": "demo", "children": "testing" }),
            class_shortcut(),
            json!({})
        )
        .await
        .unwrap(),
        r#"<span class="demo">testing</span>"#
    );
}

#[tokio::test]
async fn test_class_shortcut_conditional_map() {
    assert_eq!(
        render_with(
            json!({
                "element": "span",
                "class": { "font-bold": "context.href === context.pathname" },
                "children": "testing"
            }),
            class_shortcut(),
            json!({ "href": "foo", "pathname": "foo" })
        )
        .await
        .unwrap(),
        r#"<span class="font-bold">testing</span>"#
    );
}

#[tokio::test]
async fn test_class_list() {
    assert_eq!(
        render_with(
            json!({
                "element": "span",
                "classList": {
                    "font-bold": "context.href === context.pathname",
                    "mx-2": "context.href === context.pathname",
                    "my-2": "context.href === 'bar'"
                },
                "children": "testing"
            }),
            class_shortcut(),
            json!({ "href": "foo", "pathname": "foo" })
        )
        .await
        .unwrap(),
        r#"<span class="font-bold mx-2">testing</span>"#
    );
}

#[tokio::test]
async fn test_class_sources_join_in_order() {
    assert_eq!(
        render_with(
            json!({
                "element": "span",
                "class": "bg-red-200",
                "__class": "context.href",
                "==class": "context.href + context.pathname",
                "classList": {
                    "font-bold": "context.href === context.pathname",
                    "mx-2": "context.href === context.pathname",
                    "my-2": "context.href === 'bar'"
                },
                "children": "testing"
            }),
            class_shortcut(),
            json!({ "href": "foo", "pathname": "foo" })
        )
        .await
        .unwrap(),
        r#"<span class="bg-red-200 foo foofoo font-bold mx-2">testing</span>"#
    );
}

#[tokio::test]
async fn test_class_getter_and_evaluation() {
    assert_eq!(
        render_with(
            json!({ "element": "span", "__class": "context.demo", "children": "testing" }),
            class_shortcut(),
            json!({ "demo": "foobar" })
        )
        .await
        .unwrap(),
        r#"<span class="foobar">testing</span>"#
    );
    assert_eq!(
        render_with(
            json!({ "element": "span", "==class": "context.demo + 'bar'", "children": "testing" }),
            class_shortcut(),
            json!({ "demo": "foo" })
        )
        .await
        .unwrap(),
        r#"<span class="foobar">testing</span>"#
    );
}

#[tokio::test]
async fn test_class_transform_utility() {
    let unit: Unit =
        serde_json::from_value(json!({ "element": "p", "class": "mx-2 bold" })).unwrap();
    let html = Renderer::builder()
        .extension(ClassShortcut::new().with_transform("uppercase"))
        .utilities(Utilities::with_defaults())
        .build()
        .render(&unit, Value::Null)
        .await
        .unwrap();
    assert_eq!(html, r#"<p class="MX-2 BOLD"></p>"#);

    let err = Renderer::builder()
        .extension(ClassShortcut::new().with_transform("missing"))
        .build()
        .render(&unit, Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::UtilityNotFound { .. }));
}

// foreach

#[tokio::test]
async fn test_foreach_without_source() {
    assert_eq!(
        render_with(
            json!({ "element": "ul", "foreach": ["items", { "element": "li", "__children": "value" }] }),
            foreach(),
            json!({})
        )
        .await
        .unwrap(),
        "<ul></ul>"
    );
}

#[tokio::test]
async fn test_foreach_array() {
    assert_eq!(
        render_with(
            json!({
                "element": "ul",
                "foreach": ["context.items", { "element": "li", "__children": "value" }]
            }),
            foreach(),
            json!({ "items": ["foo", "bar"] })
        )
        .await
        .unwrap(),
        "<ul><li>foo</li><li>bar</li></ul>"
    );
}

#[tokio::test]
async fn test_foreach_multiple_templates() {
    assert_eq!(
        render_with(
            json!({
                "element": "ul",
                "foreach": ["context.items", [
                    { "element": "li", "__children": "value" },
                    { "element": "li", "__children": "value" }
                ]]
            }),
            foreach(),
            json!({ "items": ["foo", "bar"] })
        )
        .await
        .unwrap(),
        "<ul><li>foo</li><li>foo</li><li>bar</li><li>bar</li></ul>"
    );
}

#[tokio::test]
async fn test_foreach_nested_key_and_objects() {
    assert_eq!(
        render_with(
            json!({
                "element": "ul",
                "foreach": ["context.test.items", { "element": "li", "__children": "value" }]
            }),
            foreach(),
            json!({ "test": { "items": ["foo", "bar"] } })
        )
        .await
        .unwrap(),
        "<ul><li>foo</li><li>bar</li></ul>"
    );
    assert_eq!(
        render_with(
            json!({
                "element": "ul",
                "foreach": ["context.items", { "element": "li", "__children": "title" }]
            }),
            foreach(),
            json!({ "items": [{ "title": "foo" }, { "title": "bar" }] })
        )
        .await
        .unwrap(),
        "<ul><li>foo</li><li>bar</li></ul>"
    );
}

#[tokio::test]
async fn test_foreach_attributes_without_element() {
    assert_eq!(
        render_with(
            json!({
                "element": "html",
                "children": [{
                    "element": "body",
                    "children": [{
                        "foreach": ["context.scripts", {
                            "element": "script",
                            "attributes": { "__type": "type", "__src": "src" }
                        }]
                    }]
                }]
            }),
            foreach(),
            json!({
                "scripts": [
                    { "type": "text/javascript", "src": "sidewind.js" },
                    { "type": "module", "src": "gustwind.js" }
                ]
            })
        )
        .await
        .unwrap(),
        r#"<html><body><script type="text/javascript" src="sidewind.js"></script><script type="module" src="gustwind.js"></script></body></html>"#
    );
}

#[tokio::test]
async fn test_foreach_structured_source() {
    assert_eq!(
        render_with(
            json!({
                "element": "ol",
                "foreach": [
                    { "utility": "concat", "parameters": [["a"], ["b"]] },
                    { "element": "li", "__children": "value" }
                ]
            }),
            foreach(),
            json!({})
        )
        .await
        .unwrap(),
        "<ol><li>a</li><li>b</li></ol>"
    );
}

#[tokio::test]
async fn test_foreach_non_array_is_fatal() {
    let err = render_with(
        json!({ "element": "ul", "foreach": ["context.count", { "element": "li" }] }),
        foreach(),
        json!({ "count": 3 }),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        EvalError::IterationSource {
            expression: "context.count".to_string(),
            found: "number".to_string()
        }
    );
}

#[tokio::test]
async fn test_foreach_bad_shape_is_fatal() {
    let err = render_with(
        json!({ "element": "ul", "foreach": "context.items" }),
        foreach(),
        json!({ "items": [] }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EvalError::InvalidUnit { .. }));
}

#[tokio::test]
async fn test_apply_extensions_directly() {
    let renderer = Renderer::builder().build();
    let props = Value::Null;
    let scope = crate::scope::Scope::new(&renderer, &props, 0);

    let node = Node::element("span").with_field("visibleIf", false);
    let result = apply_extensions(node, &default_extensions(), &scope).await.unwrap();
    assert_eq!(result, Rewrite::Stop);

    let node = Node::element("span").with_field("class", "a");
    match apply_extensions(node, &default_extensions(), &scope).await.unwrap() {
        Rewrite::Continue(node) => {
            assert!(node.field("class").is_none());
            assert_eq!(
                node.attributes.unwrap().get("class"),
                Some(&Binding::Literal(Value::from("a")))
            );
        }
        Rewrite::Stop => panic!("Expected node to continue"),
    }
}

#[tokio::test]
async fn test_class_skips_null_and_false_results() {
    let context = json!({ "on": false, "missing": null });

    assert_eq!(
        render_with(
            json!({ "element": "a", "class": "btn", "==class": "context.on && 'active'" }),
            class_shortcut(),
            context.clone()
        )
        .await
        .unwrap(),
        r#"<a class="btn"></a>"#
    );
    assert_eq!(
        render_with(
            json!({ "element": "a", "==class": "context.on ? 'active' : null" }),
            class_shortcut(),
            context.clone()
        )
        .await
        .unwrap(),
        "<a></a>"
    );
    assert_eq!(
        render_with(
            json!({ "element": "a", "class": false, "__class": "context.missing" }),
            class_shortcut(),
            context
        )
        .await
        .unwrap(),
        "<a></a>"
    );
}
