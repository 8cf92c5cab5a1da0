//! Typed outbound events.
//!
//! Native interaction callbacks never build script text themselves. They
//! describe what happened as a [`UiEvent`] and the engine renders it.

use serde_json::{Value, json};

use crate::types::ObjectId;

/// Which conventionally named handler an event invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Press,
    Release,
    Click,
    ChangeText,
    Submit,
}

impl EventKind {
    /// Script-side handler name.
    pub const fn handler_name(self) -> &'static str {
        match self {
            Self::Press => "onPress",
            Self::Release => "onRelease",
            Self::Click => "onClick",
            Self::ChangeText => "onChangeText",
            Self::Submit => "onSubmitEditing",
        }
    }
}

/// The `value` carried in an event's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValue {
    Text(String),
    Flag(bool),
}

impl EventValue {
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Flag(flag) => Value::Bool(*flag),
        }
    }
}

impl From<&str> for EventValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for EventValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for EventValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

/// One interaction on one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub kind: EventKind,
    pub src: ObjectId,
    pub value: EventValue,
}

impl UiEvent {
    pub fn new(kind: EventKind, src: ObjectId, value: impl Into<EventValue>) -> Self {
        Self {
            kind,
            src,
            value: value.into(),
        }
    }

    /// The fixed event shape handed to the handler:
    /// `{ "target": { "src": <id>, "value": <value> } }`.
    pub fn payload(&self) -> Value {
        json!({
            "target": {
                "src": self.src.as_str(),
                "value": self.value.to_json(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    #[test]
    fn test_handler_names() {
        assert_eq!(EventKind::Press.handler_name(), "onPress");
        assert_eq!(EventKind::ChangeText.handler_name(), "onChangeText");
        assert_eq!(EventKind::Submit.handler_name(), "onSubmitEditing");
    }

    #[test]
    fn test_text_payload() {
        let event = UiEvent::new(EventKind::ChangeText, id("name"), "Ada");
        assert_eq!(
            event.payload(),
            json!({ "target": { "src": "name", "value": "Ada" } })
        );
    }

    #[test]
    fn test_flag_payload() {
        let event = UiEvent::new(EventKind::Click, id("ok"), true);
        assert_eq!(event.payload()["target"]["value"], Value::Bool(true));
    }
}
