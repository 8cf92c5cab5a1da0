//! Factory dispatch.
//!
//! An ordered chain of builders. Each inspects the payload's `type`
//! discriminant and either builds an object or declines; the first builder
//! that succeeds wins.
//!
//! ```ignore
//! let mut chain = FactoryChain::new();
//! chain.push(
//!     TypeFactory::new()
//!         .with("Gauge", |attrs| Box::new(Gauge::new(attrs)) as Box<dyn UiObject>),
//! );
//! chain.push(headless_factory(tree));
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use super::object::UiObject;
use crate::types::{Attributes, TYPE_KEY};

/// Something that may build an object from a payload.
pub trait UiFactory {
    /// Build an object, or `None` when this factory does not know the type.
    fn create(&self, attributes: &Attributes) -> Option<Box<dyn UiObject>>;
}

impl<F> UiFactory for F
where
    F: Fn(&Attributes) -> Option<Box<dyn UiObject>>,
{
    fn create(&self, attributes: &Attributes) -> Option<Box<dyn UiObject>> {
        self(attributes)
    }
}

// =============================================================================
// Type Factory
// =============================================================================

/// Builds a fresh object for one discriminant.
pub type Constructor = Rc<dyn Fn(&Attributes) -> Box<dyn UiObject>>;

/// Discriminant string → constructor table.
#[derive(Default, Clone)]
pub struct TypeFactory {
    constructors: HashMap<String, Constructor>,
}

impl TypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` for `type_name`, replacing any earlier one.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        constructor: impl Fn(&Attributes) -> Box<dyn UiObject> + 'static,
    ) -> &mut Self {
        self.constructors
            .insert(type_name.into(), Rc::new(constructor));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(
        mut self,
        type_name: impl Into<String>,
        constructor: impl Fn(&Attributes) -> Box<dyn UiObject> + 'static,
    ) -> Self {
        self.register(type_name, constructor);
        self
    }

    /// Make `alias` build whatever `type_name` builds.
    ///
    /// Returns `false` when `type_name` is unknown.
    pub fn alias(&mut self, alias: impl Into<String>, type_name: &str) -> bool {
        match self.constructors.get(type_name).cloned() {
            Some(constructor) => {
                self.constructors.insert(alias.into(), constructor);
                true
            }
            None => false,
        }
    }

    pub fn knows(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Known discriminants, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl UiFactory for TypeFactory {
    fn create(&self, attributes: &Attributes) -> Option<Box<dyn UiObject>> {
        let type_name = attributes.get(TYPE_KEY).and_then(Value::as_str)?;
        let constructor = self.constructors.get(type_name)?;
        Some(constructor(attributes))
    }
}

// =============================================================================
// Factory Chain
// =============================================================================

/// Ordered set of factories. Consulted only for ids with no registry entry.
#[derive(Default)]
pub struct FactoryChain {
    factories: Vec<Box<dyn UiFactory>>,
}

impl FactoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factory; earlier factories take precedence.
    pub fn push(&mut self, factory: impl UiFactory + 'static) {
        self.factories.push(Box::new(factory));
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// First successful build, if any.
    pub fn create(&self, attributes: &Attributes) -> Option<Box<dyn UiObject>> {
        self.factories
            .iter()
            .find_map(|factory| factory.create(attributes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::object::NativeHandle;
    use crate::engine::registry::tests::StubObject;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_type_factory_matches_discriminant() {
        let factory = TypeFactory::new().with("Button", |_| StubObject::boxed(7));

        let built = factory.create(&attrs(json!({ "id": "b", "type": "Button" })));
        assert_eq!(built.map(|o| o.native_handle()), Some(NativeHandle(7)));

        assert!(factory.create(&attrs(json!({ "id": "b", "type": "Slider" }))).is_none());
        assert!(factory.create(&attrs(json!({ "id": "b" }))).is_none());
        assert!(factory.create(&attrs(json!({ "id": "b", "type": 3 }))).is_none());
    }

    #[test]
    fn test_alias() {
        let mut factory = TypeFactory::new().with("TextInput", |_| StubObject::boxed(1));
        assert!(factory.alias("Input", "TextInput"));
        assert!(!factory.alias("Thing", "Unknown"));
        assert!(factory.knows("Input"));
        assert_eq!(factory.type_names(), vec!["Input", "TextInput"]);
    }

    #[test]
    fn test_chain_first_success_wins() {
        let mut chain = FactoryChain::new();
        chain.push(|attributes: &Attributes| -> Option<Box<dyn UiObject>> {
            (attributes.get("special") == Some(&json!(true))).then(|| StubObject::boxed(1))
        });
        chain.push(TypeFactory::new().with("View", |_| StubObject::boxed(2)));
        chain.push(TypeFactory::new().with("View", |_| StubObject::boxed(3)));
        assert_eq!(chain.len(), 3);

        let special = chain.create(&attrs(json!({ "type": "View", "special": true })));
        assert_eq!(special.map(|o| o.native_handle()), Some(NativeHandle(1)));

        let plain = chain.create(&attrs(json!({ "type": "View" })));
        assert_eq!(plain.map(|o| o.native_handle()), Some(NativeHandle(2)));

        assert!(chain.create(&attrs(json!({ "type": "Nope" }))).is_none());
    }

    #[test]
    fn test_empty_chain() {
        let chain = FactoryChain::new();
        assert!(chain.is_empty());
        assert!(chain.create(&attrs(json!({ "type": "View" }))).is_none());
    }
}
