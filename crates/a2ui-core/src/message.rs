use crate::expr::{ContentExpr, VisibleIf};
use crate::value::DataValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn root_path() -> String {
    "/".to_string()
}

/// One protocol instruction. Runtimes apply these strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    SurfaceUpdate {
        surface: Surface,
    },
    DataModelUpdate {
        #[serde(default = "root_path")]
        path: String,
        #[serde(default)]
        data: DataValue,
    },
    DeleteSurface {
        surface_id: String,
    },
    BeginRendering {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        surface_id: Option<String>,
    },
}

impl Message {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::SurfaceUpdate { .. } => "surfaceUpdate",
            Message::DataModelUpdate { .. } => "dataModelUpdate",
            Message::DeleteSurface { .. } => "deleteSurface",
            Message::BeginRendering { .. } => "beginRendering",
        }
    }
}

/// Named tree of component descriptions, replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// Where a repeating component takes its elements from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemSource {
    Path(String),
    Inline(Vec<DataValue>),
}

/// A component description. Fields the core does not interpret stay in
/// `props` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<VisibleIf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_expr: Option<ContentExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Box<Component>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Component>,
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl Component {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            id: None,
            component_type: component_type.into(),
            visible_if: None,
            content_expr: None,
            items: None,
            template: None,
            children: Vec::new(),
            props: Map::new(),
        }
    }
}

/// Decode one JSON value into a [`Message`].
pub fn parse_message_value(value: Value) -> Result<Message, serde_json::Error> {
    serde_json::from_value(value)
}
