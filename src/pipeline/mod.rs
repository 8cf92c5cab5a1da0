//! Reconciliation Pipeline
//!
//! ```text
//! queued commands → tick (mounts → updates → unmounts → finalize) → TickReport
//! ```
//!
//! - **tick** - one pass over a snapshot of the queues
//! - **scheduler** - runs the tick on a fixed interval

pub mod scheduler;
pub mod tick;

pub use scheduler::Scheduler;
pub use tick::TickReport;
