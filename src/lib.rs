//! # spark-bridge
//!
//! Reconciliation engine between a script-described UI tree and live native
//! widgets.
//!
//! A scripting environment describes the UI it wants as a stream of JSON
//! commands (mount, update, unmount). The engine queues them, and on every
//! tick turns them into a registry of live objects built by pluggable
//! factories. Interaction events flow back out as script calls.
//!
//! ## Architecture
//!
//! ```text
//! script ──mount/update/unmount──▶ CommandQueues ──tick──▶ Registry ⇄ UiObject
//!   ▲                                                          │
//!   └──────────── ScriptEvaluator ◀── UiEvent ◀────────────────┘
//! ```
//!
//! Objects are owned by the registry and addressed by id. Nothing is ever
//! created or destroyed outside a tick; destruction is deferred until every
//! queue is empty.
//!
//! ## Modules
//!
//! - [`types`] - Ids, attribute payloads, command kinds, lifecycle
//! - [`engine`] - Queues, registry, factories, garbage, the [`Engine`]
//! - [`pipeline`] - The tick and its scheduler
//! - [`bridge`] - Outbound events and script calls
//! - [`primitives`] - Headless reference widgets
//! - [`config`] - [`EngineConfig`]
//! - [`logging`] - Optional logger bootstrap

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod primitives;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::EngineConfig;
pub use error::{BridgeError, BridgeResult, ObjectError, ScriptError};

pub use engine::{
    Command, Engine, EngineHandle, FactoryChain, NativeHandle, ObjectBinding, PendingCounts,
    TypeFactory, UiFactory, UiObject,
};

pub use pipeline::{Scheduler, TickReport};

pub use bridge::{
    DetachedEvaluator, EventKind, EventValue, RecordingEvaluator, ScriptCall, ScriptEvaluator,
    UiEvent,
};

pub use primitives::{HeadlessWidget, Interaction, NativeTree, WidgetKind, headless_factory};

pub use logging::init_logging;
