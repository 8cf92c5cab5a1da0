//! Reconciliation Engine - registry, factories, queues and deferred teardown.
//!
//! The engine owns every live object. Scripts talk to it only through
//! JSON command payloads; it talks back only through the evaluator.
//!
//! # Architecture
//!
//! ```text
//! mount/update/unmount payloads → CommandQueues → tick → Registry ⇄ UiObject
//!                                                    ↘ GarbageList → finalize
//! ```
//!
//! - **CommandQueues**: three FIFOs, drained only by the tick
//! - **Registry**: id → node, unique keys, parent edges as ids
//! - **FactoryChain**: builds objects for ids the registry doesn't know
//! - **GarbageList**: hidden objects awaiting teardown
//!
//! # Example
//!
//! ```ignore
//! use spark_bridge::{Engine, EngineConfig};
//! use spark_bridge::primitives::{headless_factory, NativeTree};
//!
//! let tree = NativeTree::new();
//! let mut engine = Engine::new(EngineConfig::default())?;
//! engine.add_factory(headless_factory(&tree));
//!
//! engine.mount(r#"{"id":"root","type":"Window"}"#);
//! engine.mount(r#"{"id":"ok","type":"Button","parent":"root","text":"OK"}"#);
//! let report = engine.tick();
//! assert_eq!(report.created, 2);
//! ```

mod factory;
mod garbage;
mod handle;
mod object;
mod queue;
mod registry;

pub use factory::*;
pub use garbage::*;
pub use handle::*;
pub use object::*;
pub use queue::*;
pub use registry::*;

#[cfg(test)]
pub(crate) use registry::tests::StubObject;

use std::rc::Rc;

use log::{debug, info, warn};
use serde_json::Value;

use crate::bridge::{DetachedEvaluator, ScriptCall, ScriptEvaluator, accessor_name};
use crate::config::EngineConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{Attributes, CommandKind, ID_KEY, Lifecycle, NodeFlags, ObjectId, TYPE_KEY};

// =============================================================================
// Engine
// =============================================================================

pub struct Engine {
    pub(crate) handle: EngineHandle,
    pub(crate) registry: Registry,
    pub(crate) factories: FactoryChain,
    pub(crate) garbage: GarbageList,
    pub(crate) config: EngineConfig,
}

impl Engine {
    /// An engine with no scripting environment attached yet.
    pub fn new(config: EngineConfig) -> BridgeResult<Self> {
        Self::with_evaluator(config, Rc::new(DetachedEvaluator))
    }

    /// An engine whose outbound calls go to `evaluator`.
    pub fn with_evaluator(
        config: EngineConfig,
        evaluator: Rc<dyn ScriptEvaluator>,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let handle = EngineHandle::new(
            Markers::from_config(&config),
            config.widgets_namespace.clone(),
            evaluator,
        );
        info!(
            "event=engine_created namespace={} tick_interval_ms={} max_retries={:?}",
            config.widgets_namespace, config.tick_interval_ms, config.max_retries
        );
        Ok(Self {
            handle,
            registry: Registry::new(),
            factories: FactoryChain::new(),
            garbage: GarbageList::new(),
            config,
        })
    }

    /// Append a factory. Earlier factories take precedence.
    pub fn add_factory(&mut self, factory: impl UiFactory + 'static) {
        self.factories.push(factory);
    }

    /// A cloneable handle for objects and the scripting environment.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    pub fn mount(&self, payload: &str) {
        self.handle.mount(payload);
    }

    pub fn update(&self, payload: &str) {
        self.handle.update(payload);
    }

    pub fn unmount(&self, payload: &str) {
        self.handle.unmount(payload);
    }

    /// Like [`mount`](Self::mount) etc. but reports malformed payloads.
    pub fn try_enqueue(&self, kind: CommandKind, payload: &str) -> BridgeResult<()> {
        self.handle.try_enqueue(kind, payload)
    }

    /// Create an object synchronously.
    ///
    /// Enqueues a mount, runs one tick, and reports whether `id` is
    /// registered afterwards. Anything else already queued is processed by
    /// the same tick.
    pub fn create(&mut self, id: &str, type_name: &str, persistent: bool) -> bool {
        let mut payload = Attributes::new();
        payload.insert(ID_KEY.to_string(), Value::from(id));
        payload.insert(TYPE_KEY.to_string(), Value::from(type_name));
        if persistent {
            payload.insert(self.config.persistent_marker.clone(), Value::Bool(true));
        }
        let payload = Value::Object(payload);
        if let Err(err) = self.handle.try_enqueue_value(CommandKind::Mount, payload) {
            warn!("event=malformed_command kind=mount error=\"{}\"", err);
            return false;
        }
        self.tick();
        self.registry.contains(id)
    }

    // =========================================================================
    // Script Surface
    // =========================================================================

    /// Invoke a named method on a live object.
    pub fn call_object(&mut self, id: &str, method: &str, args: &[Value]) -> BridgeResult<Value> {
        let node = self
            .registry
            .get_mut(id)
            .ok_or_else(|| BridgeError::UnknownObject(id.to_string()))?;
        node.object
            .call(method, args)
            .map_err(|source| BridgeError::Hook {
                id: id.to_string(),
                hook: "call",
                source,
            })
    }

    /// The scripting environment was torn down and recreated.
    ///
    /// Installs the bridge accessor, queues an unmount for every
    /// non-persistent object and re-exposes the persistent survivors.
    /// Returns the number of unmounts queued; they run on the next tick.
    pub fn reset_environment(&mut self) -> usize {
        info!("event=environment_reset objects={}", self.registry.len());
        let install = ScriptCall::InstallBridge {
            accessor: self.config.bridge_accessor.clone(),
            namespace: self.config.widgets_namespace.clone(),
        };
        // Failure is logged by the handle; the reset proceeds regardless.
        let _ = self.handle.evaluate(&install);

        let doomed = self.registry.ids_where(|node| !node.is_persistent());
        for id in &doomed {
            self.handle.push(Command::synthesized_unmount(id.clone()));
        }

        for id in self.registry.ids_where(Node::is_persistent) {
            if let Some(node) = self.registry.get_mut(id.as_str()) {
                node.flags.remove(NodeFlags::EXPOSED);
            }
            self.expose(&id);
        }
        debug!("event=reset_scheduled unmounts={}", doomed.len());
        doomed.len()
    }

    /// Install the script-side accessor for `id` once.
    pub(crate) fn expose(&mut self, id: &ObjectId) {
        if !self.config.expose_objects {
            return;
        }
        let Some(node) = self.registry.get_mut(id.as_str()) else {
            return;
        };
        if node.flags.contains(NodeFlags::EXPOSED) || !node.object.exposes_accessor() {
            return;
        }
        let call = ScriptCall::ExposeObject {
            accessor: accessor_name(&self.config.widgets_namespace, id.as_str()),
            id: id.to_string(),
        };
        if self.handle.evaluate(&call).is_ok() {
            node.flags.insert(NodeFlags::EXPOSED);
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn object(&self, id: &str) -> Option<&dyn UiObject> {
        self.registry.get(id).map(Node::object)
    }

    pub fn lifecycle(&self, id: &str) -> Option<Lifecycle> {
        self.registry.get(id).map(Node::lifecycle)
    }

    pub fn parent_of(&self, id: &str) -> Option<&ObjectId> {
        self.registry.get(id).and_then(Node::parent)
    }

    pub fn is_persistent(&self, id: &str) -> bool {
        self.registry.get(id).is_some_and(Node::is_persistent)
    }

    pub fn is_exposed(&self, id: &str) -> bool {
        self.registry
            .get(id)
            .is_some_and(|node| node.flags().contains(NodeFlags::EXPOSED))
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.registry.ids()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn pending(&self) -> PendingCounts {
        self.handle.pending()
    }

    pub fn garbage_len(&self) -> usize {
        self.garbage.len()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("objects", &self.registry.len())
            .field("factories", &self.factories.len())
            .field("garbage", &self.garbage.len())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RecordingEvaluator;
    use crate::error::ObjectError;

    fn engine_with(evaluator: Rc<RecordingEvaluator>) -> Engine {
        let mut engine = Engine::with_evaluator(EngineConfig::default(), evaluator).unwrap();
        engine.add_factory(TypeFactory::new().with("View", |_| StubObject::boxed(1)));
        engine
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig::default().with_widgets_namespace("");
        assert!(matches!(Engine::new(config), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_create_is_synchronous() {
        let mut engine = engine_with(Rc::new(RecordingEvaluator::new()));
        assert!(engine.create("root", "View", true));
        assert!(engine.is_persistent("root"));
        assert!(!engine.create("gauge", "Gauge", false));
        assert!(!engine.create("", "View", false));
        assert_eq!(engine.pending().total(), 0);
    }

    #[test]
    fn test_expose_once() {
        let evaluator = Rc::new(RecordingEvaluator::new());
        let mut engine = engine_with(evaluator.clone());
        engine.create("a", "View", false);
        engine.mount(r#"{"id":"a","type":"View"}"#);
        engine.tick();

        let exposes = evaluator
            .calls()
            .into_iter()
            .filter(|call| matches!(call, ScriptCall::ExposeObject { .. }))
            .count();
        assert_eq!(exposes, 1);
        assert!(engine.is_exposed("a"));
    }

    #[test]
    fn test_detached_engine_still_reconciles() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.add_factory(TypeFactory::new().with("View", |_| StubObject::boxed(1)));
        assert!(engine.create("a", "View", false));
        assert!(!engine.is_exposed("a"));
    }

    #[test]
    fn test_call_object() {
        let mut engine = engine_with(Rc::new(RecordingEvaluator::new()));
        engine.create("a", "View", false);

        let err = engine.call_object("a", "focus", &[]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Hook { hook: "call", source: ObjectError::UnsupportedMethod(_), .. }
        ));
        assert!(matches!(
            engine.call_object("zzz", "focus", &[]),
            Err(BridgeError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_reset_environment() {
        let evaluator = Rc::new(RecordingEvaluator::new());
        let mut engine = engine_with(evaluator.clone());
        engine.create("keep", "View", true);
        engine.create("drop", "View", false);
        evaluator.clear();

        assert_eq!(engine.reset_environment(), 1);
        let calls = evaluator.calls();
        assert!(matches!(calls[0], ScriptCall::InstallBridge { .. }));
        assert!(matches!(&calls[1], ScriptCall::ExposeObject { id, .. } if id == "keep"));
        assert_eq!(engine.pending().unmounts, 1);

        engine.tick();
        assert_eq!(engine.ids(), vec![ObjectId::new("keep").unwrap()]);
    }
}
