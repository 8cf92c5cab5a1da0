//! Engine handle - the cloneable, non-owning side of the engine.
//!
//! Objects get one through their [`ObjectBinding`](super::ObjectBinding) and
//! the host hands one to the scripting environment. A handle can only
//! enqueue commands and talk to the evaluator; it never touches the registry,
//! so calls made from inside a hook during a tick are safe and take effect on
//! a later tick.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};
use serde_json::Value;

use super::queue::{Command, CommandQueues, Markers, PendingCounts};
use crate::bridge::{ScriptCall, ScriptEvaluator, UiEvent};
use crate::error::{BridgeResult, ScriptError};
use crate::types::CommandKind;

pub(crate) struct EngineShared {
    pub(crate) queues: RefCell<CommandQueues>,
    pub(crate) markers: Markers,
    pub(crate) namespace: String,
    pub(crate) evaluator: Rc<dyn ScriptEvaluator>,
    pub(crate) ticking: Cell<bool>,
}

#[derive(Clone)]
pub struct EngineHandle {
    pub(crate) shared: Rc<EngineShared>,
}

impl EngineHandle {
    pub(crate) fn new(
        markers: Markers,
        namespace: String,
        evaluator: Rc<dyn ScriptEvaluator>,
    ) -> Self {
        Self {
            shared: Rc::new(EngineShared {
                queues: RefCell::new(CommandQueues::new()),
                markers,
                namespace,
                evaluator,
                ticking: Cell::new(false),
            }),
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Queue a mount. Malformed payloads are logged and dropped.
    pub fn mount(&self, payload: &str) {
        self.enqueue(CommandKind::Mount, payload);
    }

    /// Queue an update. Malformed payloads are logged and dropped.
    pub fn update(&self, payload: &str) {
        self.enqueue(CommandKind::Update, payload);
    }

    /// Queue an unmount. Malformed payloads are logged and dropped.
    pub fn unmount(&self, payload: &str) {
        self.enqueue(CommandKind::Unmount, payload);
    }

    /// Queue a command of `kind`, reporting a malformed payload to the caller.
    pub fn try_enqueue(&self, kind: CommandKind, payload: &str) -> BridgeResult<()> {
        let command = Command::parse(kind, payload, &self.shared.markers)?;
        self.push(command);
        Ok(())
    }

    /// Queue an already parsed payload.
    pub fn try_enqueue_value(&self, kind: CommandKind, payload: Value) -> BridgeResult<()> {
        let command = Command::from_value(kind, payload, &self.shared.markers)?;
        self.push(command);
        Ok(())
    }

    fn enqueue(&self, kind: CommandKind, payload: &str) {
        if let Err(err) = self.try_enqueue(kind, payload) {
            warn!("event=malformed_command kind={} error=\"{}\"", kind, err);
        }
    }

    pub(crate) fn push(&self, command: Command) {
        self.shared.queues.borrow_mut().push(command);
    }

    /// Current queue lengths.
    pub fn pending(&self) -> PendingCounts {
        self.shared.queues.borrow().counts()
    }

    /// Whether a tick is running right now.
    pub fn is_ticking(&self) -> bool {
        self.shared.ticking.get()
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Deliver an interaction event to its script-side handler.
    pub fn dispatch_event(&self, event: UiEvent) -> BridgeResult<Value> {
        self.evaluate(&ScriptCall::DispatchEvent {
            namespace: self.shared.namespace.clone(),
            event,
        })
    }

    /// Run a typed script call through the evaluator.
    pub fn evaluate(&self, call: &ScriptCall) -> BridgeResult<Value> {
        self.shared.evaluator.evaluate_call(call).map_err(|err| {
            match err {
                ScriptError::Unavailable => debug!("event=script_skipped reason=detached"),
                _ => warn!("event=script_failed error=\"{}\"", err),
            }
            err.into()
        })
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("pending", &self.pending())
            .field("ticking", &self.is_ticking())
            .finish()
    }
}
