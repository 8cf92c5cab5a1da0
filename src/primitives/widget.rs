//! Headless Widget - the [`UiObject`] face of a native tree slot.

use log::debug;
use serde_json::Value;

use super::native_tree::{NativeTree, WidgetKind};
use crate::engine::{NativeHandle, ObjectBinding, UiObject};
use crate::error::ObjectError;
use crate::types::Attributes;

pub struct HeadlessWidget {
    tree: NativeTree,
    handle: NativeHandle,
    kind: WidgetKind,
}

impl HeadlessWidget {
    /// Allocate a fresh native widget of `kind` in `tree`.
    pub fn new(tree: &NativeTree, kind: WidgetKind) -> Self {
        Self {
            handle: tree.create(kind),
            tree: tree.clone(),
            kind,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    fn text_arg(method: &str, args: &[Value]) -> Result<String, ObjectError> {
        match args.first() {
            Some(Value::String(text)) => Ok(text.clone()),
            _ => Err(ObjectError::InvalidAttribute {
                name: method.to_string(),
                reason: "expected a string argument".to_string(),
            }),
        }
    }
}

impl UiObject for HeadlessWidget {
    fn mount(&mut self, _attributes: &Attributes) -> Result<(), ObjectError> {
        Ok(())
    }

    fn update(&mut self, attributes: &Attributes) -> Result<(), ObjectError> {
        self.tree.apply(self.handle, attributes)
    }

    fn unmount(&mut self) -> Result<(), ObjectError> {
        self.tree.destroy(self.handle)
    }

    fn add_child(&mut self, child: &dyn UiObject) -> Result<(), ObjectError> {
        self.tree.add_child(self.handle, child.native_handle())
    }

    fn set_visible(&mut self, visible: bool) {
        // Only fails for a handle this tree never issued.
        let _ = self.tree.set_visible(self.handle, visible);
    }

    fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    fn bind(&mut self, binding: ObjectBinding) {
        let id = binding.id().clone();
        if let Err(err) = self.tree.bind(self.handle, binding) {
            // The widget stays usable; it just never emits events.
            debug!("event=bind_skipped id={} error=\"{}\"", id, err);
        }
    }

    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, ObjectError> {
        use WidgetKind::*;

        match (self.kind, method) {
            (TextInput, "focus") => self.tree.focus(self.handle)?,
            (TextInput, "select") => self.tree.select_all(self.handle)?,
            (Text | TextInput | Button | Menu | MenuItem, "setText") => {
                let text = Self::text_arg(method, args)?;
                self.tree.set_text(self.handle, &text)?;
            }
            (StatusBar, "showMessage") => {
                let message = Self::text_arg(method, args)?;
                self.tree.set_message(self.handle, Some(message))?;
            }
            (StatusBar, "clearMessage") => self.tree.set_message(self.handle, None)?,
            _ => return Err(ObjectError::UnsupportedMethod(method.to_string())),
        }
        Ok(Value::Null)
    }
}
