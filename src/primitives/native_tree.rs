//! Native Tree - the headless widget arena.
//!
//! Stands in for a real toolkit: every widget is a slot in one shared arena
//! addressed by [`NativeHandle`]. The arena owns parent/children edges,
//! visibility and text, so tests and demos can inspect exactly what a
//! toolkit would have shown.
//!
//! # Example
//!
//! ```ignore
//! let tree = NativeTree::new();
//! let window = tree.create(WidgetKind::Window);
//! let input = tree.create(WidgetKind::TextInput);
//! tree.add_child(window, input)?;
//!
//! // Simulate the user typing; the bound object's onChangeText fires.
//! tree.interact(input, Interaction::Type("hello".into()))?;
//! ```

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use serde_json::Value;

use crate::bridge::{EventKind, EventValue};
use crate::engine::{NativeHandle, ObjectBinding};
use crate::error::{BridgeError, BridgeResult, ObjectError};
use crate::types::{Attributes, ID_KEY, PARENT_KEY, TYPE_KEY};

// =============================================================================
// Widget Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Window,
    View,
    ScrollView,
    SplitterView,
    StackedView,
    Text,
    TextInput,
    Button,
    Image,
    StatusBar,
    MenuBar,
    Menu,
    MenuItem,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 13] = [
        WidgetKind::Window,
        WidgetKind::View,
        WidgetKind::ScrollView,
        WidgetKind::SplitterView,
        WidgetKind::StackedView,
        WidgetKind::Text,
        WidgetKind::TextInput,
        WidgetKind::Button,
        WidgetKind::Image,
        WidgetKind::StatusBar,
        WidgetKind::MenuBar,
        WidgetKind::Menu,
        WidgetKind::MenuItem,
    ];

    /// The `type` discriminant that builds this kind.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Window => "Window",
            Self::View => "View",
            Self::ScrollView => "ScrollView",
            Self::SplitterView => "SplitterView",
            Self::StackedView => "StackedView",
            Self::Text => "Text",
            Self::TextInput => "TextInput",
            Self::Button => "Button",
            Self::Image => "Image",
            Self::StatusBar => "StatusBar",
            Self::MenuBar => "MenuBar",
            Self::Menu => "Menu",
            Self::MenuItem => "MenuItem",
        }
    }

    /// Whether `child` may be attached under this kind.
    pub fn accepts(self, child: WidgetKind) -> bool {
        match self {
            Self::Text | Self::TextInput | Self::Button | Self::Image | Self::MenuItem => false,
            Self::MenuBar | Self::Menu => matches!(child, Self::Menu | Self::MenuItem),
            _ => !matches!(child, Self::Window),
        }
    }
}

// =============================================================================
// Interaction
// =============================================================================

/// Simulated native input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Press,
    Release,
    Click,
    /// Replace the text of an input, as if typed.
    Type(String),
    /// Return key in an input.
    Submit,
}

// =============================================================================
// Arena
// =============================================================================

#[derive(Debug)]
struct NativeNode {
    kind: WidgetKind,
    parent: Option<NativeHandle>,
    children: Vec<NativeHandle>,
    visible: bool,
    destroyed: bool,
    text: String,
    checked: bool,
    message: Option<String>,
    selected: bool,
    props: Attributes,
    binding: Option<ObjectBinding>,
}

impl NativeNode {
    fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            visible: true,
            destroyed: false,
            text: String::new(),
            checked: false,
            message: None,
            selected: false,
            props: Attributes::new(),
            binding: None,
        }
    }
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<NativeNode>,
    focused: Option<NativeHandle>,
}

impl Arena {
    fn node(&self, handle: NativeHandle) -> Result<&NativeNode, ObjectError> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|index| self.nodes.get(index))
            .ok_or_else(|| unknown(handle))
    }

    fn node_mut(&mut self, handle: NativeHandle) -> Result<&mut NativeNode, ObjectError> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|index| self.nodes.get_mut(index))
            .ok_or_else(|| unknown(handle))
    }

    fn detach(&mut self, child: NativeHandle) -> Result<(), ObjectError> {
        if let Some(old) = self.node_mut(child)?.parent.take() {
            self.node_mut(old)?.children.retain(|&h| h != child);
        }
        Ok(())
    }

    /// `ancestor` is `handle` or one of its ancestors.
    fn is_ancestor(&self, ancestor: NativeHandle, handle: NativeHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.node(h).ok().and_then(|node| node.parent);
        }
        false
    }
}

fn unknown(handle: NativeHandle) -> ObjectError {
    ObjectError::Native(format!("no native widget {}", handle))
}

fn destroyed(handle: NativeHandle) -> ObjectError {
    ObjectError::Native(format!("native widget {} was destroyed", handle))
}

/// Shared handle to the arena. Cloning shares the same widgets.
#[derive(Debug, Clone, Default)]
pub struct NativeTree {
    arena: Rc<RefCell<Arena>>,
}

impl NativeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, kind: WidgetKind) -> NativeHandle {
        let mut arena = self.arena.borrow_mut();
        let handle = NativeHandle(arena.nodes.len() as u64);
        arena.nodes.push(NativeNode::new(kind));
        handle
    }

    pub fn bind(&self, handle: NativeHandle, binding: ObjectBinding) -> Result<(), ObjectError> {
        self.arena.borrow_mut().node_mut(handle)?.binding = Some(binding);
        Ok(())
    }

    /// Reparent `child` under `parent`.
    pub fn add_child(&self, parent: NativeHandle, child: NativeHandle) -> Result<(), ObjectError> {
        let mut arena = self.arena.borrow_mut();
        let parent_node = arena.node(parent)?;
        let child_node = arena.node(child)?;
        if parent_node.destroyed {
            return Err(destroyed(parent));
        }
        if child_node.destroyed {
            return Err(destroyed(child));
        }
        if !parent_node.kind.accepts(child_node.kind) {
            return Err(ObjectError::Native(format!(
                "{} cannot hold a {}",
                parent_node.kind.type_name(),
                child_node.kind.type_name()
            )));
        }
        if arena.is_ancestor(child, parent) {
            return Err(ObjectError::Native(format!(
                "attaching {} under {} would form a cycle",
                child, parent
            )));
        }

        arena.detach(child)?;
        arena.node_mut(child)?.parent = Some(parent);
        arena.node_mut(parent)?.children.push(child);
        Ok(())
    }

    pub fn set_visible(&self, handle: NativeHandle, visible: bool) -> Result<(), ObjectError> {
        self.arena.borrow_mut().node_mut(handle)?.visible = visible;
        Ok(())
    }

    /// Merge a payload into the widget. `text` and `checked` are typed; the
    /// rest is kept as-is.
    pub fn apply(&self, handle: NativeHandle, attributes: &Attributes) -> Result<(), ObjectError> {
        let mut arena = self.arena.borrow_mut();
        let node = arena.node_mut(handle)?;
        if node.destroyed {
            return Err(destroyed(handle));
        }
        for (key, value) in attributes {
            match key.as_str() {
                ID_KEY | TYPE_KEY | PARENT_KEY => {}
                "text" => match value {
                    Value::String(text) => node.text = text.clone(),
                    Value::Null => node.text.clear(),
                    other => {
                        return Err(ObjectError::InvalidAttribute {
                            name: key.clone(),
                            reason: format!("expected a string, got {}", other),
                        });
                    }
                },
                "checked" => node.checked = value.as_bool().unwrap_or(false),
                _ => {
                    node.props.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Release the widget. Its children are detached, not destroyed.
    pub fn destroy(&self, handle: NativeHandle) -> Result<(), ObjectError> {
        let mut arena = self.arena.borrow_mut();
        arena.detach(handle)?;
        let children = std::mem::take(&mut arena.node_mut(handle)?.children);
        for child in children {
            arena.node_mut(child)?.parent = None;
        }
        if arena.focused == Some(handle) {
            arena.focused = None;
        }
        let node = arena.node_mut(handle)?;
        node.destroyed = true;
        node.visible = false;
        node.binding = None;
        Ok(())
    }

    pub fn set_text(&self, handle: NativeHandle, text: &str) -> Result<(), ObjectError> {
        self.arena.borrow_mut().node_mut(handle)?.text = text.to_string();
        Ok(())
    }

    pub fn focus(&self, handle: NativeHandle) -> Result<(), ObjectError> {
        let mut arena = self.arena.borrow_mut();
        arena.node(handle)?;
        arena.focused = Some(handle);
        Ok(())
    }

    pub fn select_all(&self, handle: NativeHandle) -> Result<(), ObjectError> {
        self.arena.borrow_mut().node_mut(handle)?.selected = true;
        Ok(())
    }

    pub fn set_message(&self, handle: NativeHandle, message: Option<String>) -> Result<(), ObjectError> {
        self.arena.borrow_mut().node_mut(handle)?.message = message;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Widgets ever created, destroyed ones included.
    pub fn len(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.borrow().nodes.is_empty()
    }

    /// Widgets not yet destroyed.
    pub fn live_count(&self) -> usize {
        self.arena.borrow().nodes.iter().filter(|n| !n.destroyed).count()
    }

    pub fn kind(&self, handle: NativeHandle) -> Option<WidgetKind> {
        self.read(handle, |node| node.kind)
    }

    pub fn parent(&self, handle: NativeHandle) -> Option<NativeHandle> {
        self.read(handle, |node| node.parent).flatten()
    }

    pub fn children(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        self.read(handle, |node| node.children.clone()).unwrap_or_default()
    }

    pub fn text(&self, handle: NativeHandle) -> Option<String> {
        self.read(handle, |node| node.text.clone())
    }

    pub fn prop(&self, handle: NativeHandle, key: &str) -> Option<Value> {
        self.read(handle, |node| node.props.get(key).cloned()).flatten()
    }

    pub fn is_checked(&self, handle: NativeHandle) -> bool {
        self.read(handle, |node| node.checked).unwrap_or(false)
    }

    pub fn is_selected(&self, handle: NativeHandle) -> bool {
        self.read(handle, |node| node.selected).unwrap_or(false)
    }

    pub fn message(&self, handle: NativeHandle) -> Option<String> {
        self.read(handle, |node| node.message.clone()).flatten()
    }

    pub fn is_destroyed(&self, handle: NativeHandle) -> bool {
        self.read(handle, |node| node.destroyed).unwrap_or(true)
    }

    pub fn focused(&self) -> Option<NativeHandle> {
        self.arena.borrow().focused
    }

    /// Own visibility flag only.
    pub fn is_shown(&self, handle: NativeHandle) -> bool {
        self.read(handle, |node| node.visible).unwrap_or(false)
    }

    /// Shown, and every ancestor shown too.
    pub fn is_visible(&self, handle: NativeHandle) -> bool {
        let arena = self.arena.borrow();
        let mut current = Some(handle);
        while let Some(h) = current {
            match arena.node(h) {
                Ok(node) if node.visible && !node.destroyed => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    fn read<T>(&self, handle: NativeHandle, f: impl FnOnce(&NativeNode) -> T) -> Option<T> {
        self.arena.borrow().node(handle).ok().map(f)
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Simulate native input on `handle` and emit the resulting event.
    ///
    /// Returns `Ok(None)` when the widget ignores the input: wrong kind,
    /// hidden input field, destroyed, or not bound to an object yet.
    pub fn interact(&self, handle: NativeHandle, interaction: Interaction) -> BridgeResult<Option<Value>> {
        let Some((binding, kind, value)) = self.prepare(handle, interaction)? else {
            return Ok(None);
        };
        // The arena is no longer borrowed here; handlers may call back in.
        binding.emit(kind, value).map(Some)
    }

    fn prepare(
        &self,
        handle: NativeHandle,
        interaction: Interaction,
    ) -> BridgeResult<Option<(ObjectBinding, EventKind, EventValue)>> {
        let visible = self.is_visible(handle);
        let mut arena = self.arena.borrow_mut();
        let node = arena
            .node_mut(handle)
            .map_err(|_| BridgeError::UnknownObject(handle.to_string()))?;
        if node.destroyed {
            return Ok(None);
        }
        let Some(binding) = node.binding.clone() else {
            return Ok(None);
        };

        let event = match (node.kind, interaction) {
            (WidgetKind::View | WidgetKind::Button, Interaction::Press) => {
                (EventKind::Press, EventValue::empty())
            }
            (WidgetKind::View | WidgetKind::Button, Interaction::Release) => {
                (EventKind::Release, EventValue::empty())
            }
            (WidgetKind::Button | WidgetKind::MenuItem, Interaction::Click) => {
                if node.props.get("checkable").and_then(Value::as_bool) == Some(true) {
                    node.checked = !node.checked;
                }
                (EventKind::Click, EventValue::Flag(node.checked))
            }
            (WidgetKind::TextInput, Interaction::Type(text)) => {
                if !visible {
                    return Ok(None);
                }
                node.text = text.clone();
                (EventKind::ChangeText, EventValue::Text(text))
            }
            (WidgetKind::TextInput, Interaction::Submit) => {
                if !visible {
                    return Ok(None);
                }
                (EventKind::Submit, EventValue::Text(node.text.clone()))
            }
            _ => return Ok(None),
        };
        Ok(Some((binding, event.0, event.1)))
    }

    // =========================================================================
    // Dump
    // =========================================================================

    /// Indented outline of every live root and its descendants.
    pub fn outline(&self) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        for (index, node) in arena.nodes.iter().enumerate() {
            if node.parent.is_none() && !node.destroyed {
                write_outline(&arena, NativeHandle(index as u64), 0, &mut out);
            }
        }
        out
    }
}

fn write_outline(arena: &Arena, handle: NativeHandle, depth: usize, out: &mut String) {
    let Ok(node) = arena.node(handle) else {
        return;
    };
    let id = node
        .binding
        .as_ref()
        .map(|b| b.id().to_string())
        .unwrap_or_default();
    let _ = write!(out, "{:indent$}{} {}", "", node.kind.type_name(), handle, indent = depth * 2);
    if !id.is_empty() {
        let _ = write!(out, " id={}", id);
    }
    if !node.text.is_empty() {
        let _ = write!(out, " text={:?}", node.text);
    }
    if !node.visible {
        out.push_str(" hidden");
    }
    out.push('\n');
    for &child in &node.children {
        write_outline(arena, child, depth + 1, out);
    }
}
