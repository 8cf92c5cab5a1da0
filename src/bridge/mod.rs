//! Outbound boundary - engine → scripting environment.
//!
//! - [`event`] - Typed interaction events (`onPress`, `onChangeText`, ...)
//! - [`script`] - The closed set of script calls, their escaping, and the
//!   [`ScriptEvaluator`] contract
//!
//! # Data Flow
//!
//! ```text
//! native callback → UiEvent → ScriptCall::DispatchEvent → render → evaluator
//! ```

pub mod event;
pub mod script;

pub use event::{EventKind, EventValue, UiEvent};
pub use script::{
    accessor_name, js_string, js_value, DetachedEvaluator, RecordingEvaluator, ScriptCall,
    ScriptEvaluator, NATIVE_BRIDGE_GLOBAL,
};
