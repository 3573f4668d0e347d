//! Headless surface resolution.
//!
//! Turns the session's surface into a tree of [`RenderNode`]s with every
//! data-driven decision already made: invisible components are dropped,
//! `contentExpr` is resolved to a concrete `content` value, and list
//! templates are expanded once per item. Props pass through untouched, so a
//! concrete renderer only has to map component types to widgets.

use crate::session::Session;
use a2ui_core::{
    Component, DataModel, DataValue, ItemSource, VisibleIf, has_placeholders, interpolate,
    resolve_content, resolve_visibility,
};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<DataValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

/// Resolve the active surface. `None` when the session has no surface.
pub fn render(session: &Session) -> Option<RenderNode> {
    let surface = session.surface()?;
    let mut props = Map::new();
    if let Some(title) = &surface.title {
        props.insert("title".to_string(), Value::String(title.clone()));
    }
    Some(RenderNode {
        id: Some(surface.id.clone()),
        component_type: "Surface".to_string(),
        props,
        content: None,
        children: render_components(&surface.components, session.model()),
    })
}

fn render_components(components: &[Component], model: &DataModel) -> Vec<RenderNode> {
    components
        .iter()
        .filter_map(|c| render_component(c, model))
        .collect()
}

/// Resolve one component against the model. `None` when it is not visible.
pub fn render_component(component: &Component, model: &DataModel) -> Option<RenderNode> {
    if let Some(condition) = &component.visible_if {
        if !resolve_visibility(condition, model) {
            return None;
        }
    }

    let content = component
        .content_expr
        .as_ref()
        .map(|expr| resolve_content(expr, model));

    let mut children = render_components(&component.children, model);
    if let Some(template) = &component.template {
        let items = resolve_items(component, model);
        for (index, item) in items.iter().enumerate() {
            let instance = instantiate(template, item, index);
            if let Some(node) = render_component(&instance, model) {
                children.push(node);
            }
        }
    }

    Some(RenderNode {
        id: component.id.clone(),
        component_type: component.component_type.clone(),
        props: component.props.clone(),
        content,
        children,
    })
}

fn resolve_items(component: &Component, model: &DataModel) -> Vec<DataValue> {
    match &component.items {
        Some(ItemSource::Inline(items)) => items.clone(),
        Some(ItemSource::Path(path)) => match model.get(path) {
            Some(DataValue::Array(items)) => items.as_ref().clone(),
            Some(value) if !value.is_null() => {
                tracing::debug!(path = %path, "list items are not an array; rendering none");
                Vec::new()
            }
            _ => Vec::new(),
        },
        None => {
            tracing::debug!(
                component = %component.component_type,
                "template without items; rendering none"
            );
            Vec::new()
        }
    }
}

/// Copy of `template` with `{item...}` and `{index}` placeholders filled in.
///
/// A nested `template` is left alone; its placeholders refer to its own items.
fn instantiate(template: &Component, item: &DataValue, index: usize) -> Component {
    let fill = |text: &str| interpolate(text, item, index);
    let mut out = template.clone();

    if let Some(id) = &mut out.id {
        *id = fill(id.as_str());
    }
    match &mut out.visible_if {
        Some(VisibleIf::Path(path)) => *path = fill(path.as_str()),
        Some(VisibleIf::Condition(condition)) => condition.path = fill(condition.path.as_str()),
        None => {}
    }
    if let Some(expr) = &mut out.content_expr {
        expr.path = fill(expr.path.as_str());
    }
    if let Some(ItemSource::Path(path)) = &mut out.items {
        *path = fill(path.as_str());
    }
    for value in out.props.values_mut() {
        fill_value(value, item, index);
    }
    for child in &mut out.children {
        *child = instantiate(child, item, index);
    }
    out
}

fn fill_value(value: &mut Value, item: &DataValue, index: usize) {
    match value {
        Value::String(text) if has_placeholders(text) => *text = interpolate(text, item, index),
        Value::Array(items) => items.iter_mut().for_each(|v| fill_value(v, item, index)),
        Value::Object(map) => map.values_mut().for_each(|v| fill_value(v, item, index)),
        _ => {}
    }
}

/// Indented one-line-per-node outline, for terminals and snapshots.
pub fn render_outline(node: &RenderNode) -> String {
    let mut out = String::new();
    write_outline(node, 0, &mut out);
    out
}

fn write_outline(node: &RenderNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.component_type);
    if let Some(id) = &node.id {
        out.push('#');
        out.push_str(id);
    }
    for (key, value) in &node.props {
        if !(value.is_array() || value.is_object()) {
            out.push_str(&format!(" {}={}", key, value));
        }
    }
    if let Some(content) = &node.content {
        out.push_str(" = ");
        out.push_str(&content.display_string());
    }
    out.push('\n');
    for child in &node.children {
        write_outline(child, depth + 1, out);
    }
}
