//! Script calls and their rendering.
//!
//! The engine asks the scripting environment for exactly three things,
//! listed in [`ScriptCall`]. Every string interpolated into script text goes
//! through [`js_string`], so ids and values cannot terminate the literal they
//! sit in.

use std::cell::RefCell;

use serde_json::Value;

use super::event::UiEvent;
use crate::error::ScriptError;

/// Global under which the host exposes its native bridge object.
pub const NATIVE_BRIDGE_GLOBAL: &str = "__sparkBridge";

// =============================================================================
// Script Call
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCall {
    /// Install the engine under `accessor` at environment (re)initialization.
    InstallBridge { accessor: String, namespace: String },
    /// Install a per-object accessor for `id`.
    ExposeObject { accessor: String, id: String },
    /// Invoke the handler for `event` on the object's handler table entry.
    DispatchEvent { namespace: String, event: UiEvent },
}

impl ScriptCall {
    /// Render to script text.
    pub fn render(&self) -> String {
        match self {
            Self::InstallBridge {
                accessor,
                namespace,
            } => format!(
                "globalThis[{acc}] = globalThis.{native}; globalThis[{ns}] = globalThis[{ns}] || {{}};",
                acc = js_string(accessor),
                native = NATIVE_BRIDGE_GLOBAL,
                ns = js_string(namespace),
            ),
            Self::ExposeObject { accessor, id } => format!(
                "globalThis[{acc}] = globalThis.{native}.object({id});",
                acc = js_string(accessor),
                native = NATIVE_BRIDGE_GLOBAL,
                id = js_string(id),
            ),
            Self::DispatchEvent { namespace, event } => format!(
                "globalThis[{ns}]?.[{id}]?.{handler}?.({payload});",
                ns = js_string(namespace),
                id = js_string(event.src.as_str()),
                handler = event.kind.handler_name(),
                payload = js_value(&event.payload()),
            ),
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode `text` as a double-quoted script string literal.
///
/// JSON string encoding, plus U+2028/U+2029 which older script engines treat
/// as line terminators inside literals.
pub fn js_string(text: &str) -> String {
    escape_line_separators(Value::String(text.to_string()).to_string())
}

/// Encode a JSON value as a script expression.
pub fn js_value(value: &Value) -> String {
    escape_line_separators(value.to_string())
}

fn escape_line_separators(encoded: String) -> String {
    if encoded.contains(['\u{2028}', '\u{2029}']) {
        encoded
            .replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029")
    } else {
        encoded
    }
}

/// Accessor name for `id` under `namespace`.
///
/// Characters other than ASCII alphanumerics, `_` and `$` become `_`.
pub fn accessor_name(namespace: &str, id: &str) -> String {
    let mut name = String::with_capacity(namespace.len() + 1 + id.len());
    name.push_str(namespace);
    name.push('_');
    name.extend(id.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            c
        } else {
            '_'
        }
    }));
    name
}

// =============================================================================
// Evaluator
// =============================================================================

/// The scripting environment, as seen from the engine.
pub trait ScriptEvaluator {
    /// Execute opaque script text and return its value.
    fn evaluate(&self, script: &str) -> Result<Value, ScriptError>;

    /// Execute a typed call. Hosts that understand the structured form can
    /// override this and skip the text round trip.
    fn evaluate_call(&self, call: &ScriptCall) -> Result<Value, ScriptError> {
        self.evaluate(&call.render())
    }
}

/// Evaluator used before a scripting environment is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedEvaluator;

impl ScriptEvaluator for DetachedEvaluator {
    fn evaluate(&self, _script: &str) -> Result<Value, ScriptError> {
        Err(ScriptError::Unavailable)
    }
}

/// Evaluator that records every call and answers `null`.
///
/// Used by headless hosts and tests to observe outbound traffic.
#[derive(Debug, Default)]
pub struct RecordingEvaluator {
    calls: RefCell<Vec<ScriptCall>>,
    scripts: RefCell<Vec<String>>,
}

impl RecordingEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed calls seen so far.
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls.borrow().clone()
    }

    /// Rendered script text seen so far, typed calls included.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }

    /// Events dispatched so far.
    pub fn events(&self) -> Vec<UiEvent> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ScriptCall::DispatchEvent { event, .. } => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
        self.scripts.borrow_mut().clear();
    }
}

impl ScriptEvaluator for RecordingEvaluator {
    fn evaluate(&self, script: &str) -> Result<Value, ScriptError> {
        self.scripts.borrow_mut().push(script.to_string());
        Ok(Value::Null)
    }

    fn evaluate_call(&self, call: &ScriptCall) -> Result<Value, ScriptError> {
        self.calls.borrow_mut().push(call.clone());
        self.evaluate(&call.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::event::EventKind;
    use crate::types::ObjectId;

    #[test]
    fn test_accessor_name_sanitizes() {
        assert_eq!(accessor_name("$widgets", "main:view-1"), "$widgets_main_view_1");
        assert_eq!(accessor_name("$widgets", "ok_$2"), "$widgets_ok_$2");
        assert_eq!(accessor_name("$w", "é"), "$w__");
    }

    #[test]
    fn test_js_string_escapes_quotes_and_separators() {
        assert_eq!(js_string(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(js_string("x\u{2028}y"), "\"x\\u2028y\"");
        assert_eq!(js_string("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn test_dispatch_render_is_escaped() {
        let event = UiEvent::new(
            EventKind::ChangeText,
            ObjectId::new("in\"put").unwrap(),
            "\"); alert(1); (\"",
        );
        let script = ScriptCall::DispatchEvent {
            namespace: "$widgets".to_string(),
            event,
        }
        .render();
        assert!(script.starts_with(r#"globalThis["$widgets"]?.["in\"put"]?.onChangeText?.("#));
        assert!(script.contains(r#""value":"\"); alert(1); (\"""#));
    }

    #[test]
    fn test_install_bridge_render() {
        let script = ScriptCall::InstallBridge {
            accessor: "$bridge".to_string(),
            namespace: "$widgets".to_string(),
        }
        .render();
        assert_eq!(
            script,
            r#"globalThis["$bridge"] = globalThis.__sparkBridge; globalThis["$widgets"] = globalThis["$widgets"] || {};"#
        );
    }

    #[test]
    fn test_detached_evaluator_is_unavailable() {
        assert_eq!(DetachedEvaluator.evaluate("1"), Err(ScriptError::Unavailable));
    }

    #[test]
    fn test_recording_evaluator_records() {
        let evaluator = RecordingEvaluator::new();
        let call = ScriptCall::ExposeObject {
            accessor: "$widgets_a".to_string(),
            id: "a".to_string(),
        };
        evaluator.evaluate_call(&call).unwrap();
        assert_eq!(evaluator.calls(), vec![call]);
        assert_eq!(
            evaluator.scripts(),
            vec![r#"globalThis["$widgets_a"] = globalThis.__sparkBridge.object("a");"#.to_string()]
        );
    }
}
