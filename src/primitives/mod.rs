//! Headless Primitives - a reference widget set with no rendering.
//!
//! - [`native_tree`] - The shared widget arena and simulated input
//! - [`widget`] - [`HeadlessWidget`], the `UiObject` over one arena slot
//! - [`factory`] - [`headless_factory`], discriminant → widget
//!
//! # Example
//!
//! ```ignore
//! let tree = NativeTree::new();
//! engine.add_factory(headless_factory(&tree));
//!
//! engine.mount(r#"{"id":"name","type":"TextInput","placeholder":"Name"}"#);
//! engine.tick();
//!
//! let handle = engine.object("name").unwrap().native_handle();
//! tree.interact(handle, Interaction::Type("Ada".into()))?;
//! ```

pub mod factory;
pub mod native_tree;
pub mod widget;

pub use factory::{ALIASES, headless_factory};
pub use native_tree::{Interaction, NativeTree, WidgetKind};
pub use widget::HeadlessWidget;
