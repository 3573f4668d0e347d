use a2ui_core::{DataModel, DataValue, Message, PointerError, Surface};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("data model write at '{path}' failed: {source}")]
    DataModel {
        path: String,
        #[source]
        source: PointerError,
    },
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DataModel { source, .. } => source.code(),
        }
    }
}

/// What a message did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    SurfaceReplaced,
    DataUpdated,
    SurfaceDeleted,
    RenderingStarted,
    /// The message targeted a surface other than the active one.
    Ignored,
}

/// State for one conversation: the active surface and its data model.
#[derive(Debug, Clone, Default)]
pub struct Session {
    surface: Option<Surface>,
    model: DataModel,
    rendering: bool,
    applied: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: DataModel) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Messages that changed state so far. Ignored messages are not counted.
    pub fn applied_count(&self) -> usize {
        self.applied
    }

    pub fn apply(&mut self, message: &Message) -> Result<Applied, RuntimeError> {
        let outcome = match message {
            Message::SurfaceUpdate { surface } => {
                tracing::debug!(
                    surface = %surface.id,
                    components = surface.components.len(),
                    "surface replaced"
                );
                self.surface = Some(surface.clone());
                Applied::SurfaceReplaced
            }
            Message::DataModelUpdate { path, data } => {
                self.model = self.write(path, data.clone())?;
                tracing::debug!(path = %path, "data model updated");
                Applied::DataUpdated
            }
            Message::DeleteSurface { surface_id } => {
                if !self.is_active(surface_id) {
                    tracing::debug!(surface = %surface_id, "delete for inactive surface ignored");
                    return Ok(Applied::Ignored);
                }
                self.surface = None;
                self.rendering = false;
                Applied::SurfaceDeleted
            }
            Message::BeginRendering { surface_id } => {
                if let Some(id) = surface_id {
                    if !self.is_active(id) {
                        tracing::debug!(surface = %id, "beginRendering for inactive surface ignored");
                        return Ok(Applied::Ignored);
                    }
                }
                self.rendering = true;
                Applied::RenderingStarted
            }
        };
        self.applied += 1;
        Ok(outcome)
    }

    /// Apply messages in order, skipping (and logging) any that fail.
    /// Returns how many changed state.
    pub fn apply_all<'a, I>(&mut self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut changed = 0;
        for message in messages {
            match self.apply(message) {
                Ok(Applied::Ignored) => {}
                Ok(_) => changed += 1,
                Err(err) => {
                    tracing::warn!(code = err.code(), kind = message.kind(), "{err}");
                }
            }
        }
        changed
    }

    /// Write a user-originated value, e.g. from a bound input.
    pub fn set_value(&mut self, pointer: &str, value: DataValue) -> Result<(), RuntimeError> {
        self.model = self.write(pointer, value)?;
        Ok(())
    }

    fn write(&self, path: &str, value: DataValue) -> Result<DataModel, RuntimeError> {
        self.model
            .set(path, value)
            .map_err(|source| RuntimeError::DataModel {
                path: path.to_string(),
                source,
            })
    }

    fn is_active(&self, surface_id: &str) -> bool {
        self.surface.as_ref().is_some_and(|s| s.id == surface_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2ui_core::parse_messages;
    use serde_json::json;

    fn surface(id: &str) -> Message {
        Message::SurfaceUpdate {
            surface: Surface {
                id: id.to_string(),
                title: None,
                components: Vec::new(),
            },
        }
    }

    #[test]
    fn applies_messages_in_order() {
        let messages = parse_messages(
            r#"[
                {"type":"dataModelUpdate","path":"/","data":{"user":{"name":"Ada"}}},
                {"type":"dataModelUpdate","path":"/user/age","data":36},
                {"type":"surfaceUpdate","surface":{"id":"main","components":[]}},
                {"type":"beginRendering","surfaceId":"main"}
            ]"#,
        )
        .unwrap();
        let mut session = Session::new();
        assert_eq!(session.apply_all(&messages), 4);
        assert!(session.is_rendering());
        assert_eq!(session.surface().map(|s| s.id.as_str()), Some("main"));
        assert_eq!(
            session.model().get("/user").cloned(),
            Some(DataValue::from(json!({"name": "Ada", "age": 36})))
        );
    }

    #[test]
    fn delete_only_removes_matching_surface() {
        let mut session = Session::new();
        session.apply(&surface("main")).unwrap();
        let other = Message::DeleteSurface {
            surface_id: "other".to_string(),
        };
        assert_eq!(session.apply(&other).unwrap(), Applied::Ignored);
        assert!(session.surface().is_some());

        let main = Message::DeleteSurface {
            surface_id: "main".to_string(),
        };
        assert_eq!(session.apply(&main).unwrap(), Applied::SurfaceDeleted);
        assert!(session.surface().is_none());
        assert_eq!(session.applied_count(), 2);
    }

    #[test]
    fn begin_rendering_for_other_surface_is_ignored() {
        let mut session = Session::new();
        session.apply(&surface("main")).unwrap();
        let msg = Message::BeginRendering {
            surface_id: Some("side".to_string()),
        };
        assert_eq!(session.apply(&msg).unwrap(), Applied::Ignored);
        assert!(!session.is_rendering());

        let msg = Message::BeginRendering { surface_id: None };
        assert_eq!(session.apply(&msg).unwrap(), Applied::RenderingStarted);
        assert!(session.is_rendering());
    }

    #[test]
    fn surface_update_replaces_wholesale() {
        let mut session = Session::new();
        session.apply(&surface("a")).unwrap();
        session.apply(&surface("b")).unwrap();
        assert_eq!(session.surface().map(|s| s.id.as_str()), Some("b"));
    }

    #[test]
    fn root_write_of_scalar_fails_and_keeps_model() {
        let mut session = Session::new();
        session.set_value("/count", DataValue::Int(1)).unwrap();
        let before = session.model().clone();
        let msg = Message::DataModelUpdate {
            path: "/".to_string(),
            data: DataValue::Int(5),
        };
        let err = session.apply(&msg).unwrap_err();
        assert_eq!(err.code(), "A2UI_E_ROOT_NOT_OBJECT");
        assert!(session.model().ptr_eq(&before));
        assert_eq!(session.apply_all([&msg]), 0);
    }

    #[test]
    fn set_value_shares_untouched_branches() {
        let mut session = Session::new();
        session
            .set_value("/", DataValue::from(json!({"a": {"x": 1}, "b": {"y": 2}})))
            .unwrap();
        let before = session.model().clone();
        session.set_value("/a/x", DataValue::Int(9)).unwrap();
        let old_b = before.get("/b").unwrap();
        let new_b = session.model().get("/b").unwrap();
        assert!(old_b.ptr_eq(new_b));
        assert_eq!(session.model().get("/a/x"), Some(&DataValue::Int(9)));
    }
}
