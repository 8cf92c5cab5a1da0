//! Object capability contract.
//!
//! Every live UI object implements [`UiObject`]. The engine never sees a
//! concrete widget type; it only calls through this trait.

use std::fmt;

use serde_json::Value;

use super::handle::EngineHandle;
use crate::bridge::{EventKind, EventValue, UiEvent};
use crate::error::{BridgeResult, ObjectError};
use crate::types::{Attributes, ObjectId};

/// Opaque handle to the native widget behind an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a live object must support.
///
/// Hook order for a fresh object: `bind` → `mount` → `update` → (attach to
/// parent). `unmount` is the final teardown and runs at most once.
pub trait UiObject {
    /// One-time setup with the full creating payload.
    fn mount(&mut self, attributes: &Attributes) -> Result<(), ObjectError>;

    /// Apply a payload. Called for every Update and every repeated Mount.
    fn update(&mut self, attributes: &Attributes) -> Result<(), ObjectError>;

    /// Tear down and release native resources.
    fn unmount(&mut self) -> Result<(), ObjectError>;

    /// Attach `child` in the native tree. Ownership of the native child
    /// passes to this object's native tree, not to the engine.
    fn add_child(&mut self, child: &dyn UiObject) -> Result<(), ObjectError>;

    /// Show or hide without destroying.
    fn set_visible(&mut self, visible: bool);

    fn native_handle(&self) -> NativeHandle;

    /// Receive the engine binding for outbound calls. Called before `mount`.
    fn bind(&mut self, binding: ObjectBinding);

    /// Whether the engine should install a script-side accessor.
    fn exposes_accessor(&self) -> bool {
        true
    }

    /// Invoke a named method from script (e.g. `focus`, `showMessage`).
    fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value, ObjectError> {
        Err(ObjectError::UnsupportedMethod(method.to_string()))
    }
}

/// An object's link back to the engine.
#[derive(Debug, Clone)]
pub struct ObjectBinding {
    id: ObjectId,
    engine: EngineHandle,
}

impl ObjectBinding {
    pub fn new(id: ObjectId, engine: EngineHandle) -> Self {
        Self { id, engine }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The engine, for re-entrant mount/update/unmount calls.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Emit an interaction event originating from this object.
    pub fn emit(&self, kind: EventKind, value: impl Into<EventValue>) -> BridgeResult<Value> {
        self.engine
            .dispatch_event(UiEvent::new(kind, self.id.clone(), value))
    }
}
