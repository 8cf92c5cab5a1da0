//! Tick - one reconciliation pass over the command queues.
//!
//! Order within a tick is fixed:
//!
//! 1. **Mounts** - create or upsert, attach to parents, expose accessors
//! 2. **Updates** - apply to existing targets
//! 3. **Unmounts** - hide, then destroy or retain
//! 4. **Finalize** - tear down garbage, only when nothing is left pending
//!
//! The tick drains a snapshot of the queues. Commands enqueued by hooks while
//! it runs land in the live queues and wait for the next tick. A command that
//! references an id which doesn't exist yet is deferred, not dropped, until
//! the retry budget runs out.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::engine::{Command, Engine, Node, ObjectBinding};
use crate::error::{BridgeError, ObjectError};
use crate::types::{CommandKind, Lifecycle, ObjectId, PARENT_KEY};

// =============================================================================
// Report
// =============================================================================

/// What one tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Fresh objects registered.
    pub created: usize,
    /// Payloads applied to existing objects, repeated mounts included.
    pub updated: usize,
    /// Mounts that hit an already registered id.
    pub double_mounts: usize,
    /// Hidden objects shown again by a mount.
    pub revived: usize,
    /// Parent edges established.
    pub attached: usize,
    /// Objects hidden by a retained unmount.
    pub hidden: usize,
    /// Objects moved to the garbage list.
    pub unmounted: usize,
    /// Commands put back for a later tick.
    pub deferred: usize,
    /// Commands dropped after exhausting their retry budget.
    pub abandoned: usize,
    /// Mounts no factory could build.
    pub creation_failures: usize,
    /// Unmounts naming nothing registered or pending.
    pub unknown_unmounts: usize,
    /// Deferred mounts and updates dropped by an unmount of their target.
    pub cancelled: usize,
    /// Object hooks that reported an error.
    pub hook_failures: usize,
    /// Objects torn down.
    pub finalized: usize,
}

impl TickReport {
    /// Nothing happened.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

enum Outcome {
    Applied,
    Waiting(Command),
}

// =============================================================================
// Tick
// =============================================================================

impl Engine {
    /// Run one reconciliation pass.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let shared = self.handle.shared.clone();
        if shared.queues.borrow().is_empty() && self.garbage.is_empty() {
            return report;
        }
        shared.ticking.set(true);

        let mut batch = shared.queues.borrow_mut().take();
        trace!("event=tick_begin pending={}", batch.counts().total());

        let mounts = batch.take_kind(CommandKind::Mount);
        let waiting = self.drain_mounts(mounts, &mut report);
        shared.queues.borrow_mut().restore_front(CommandKind::Mount, waiting);

        let updates = batch.take_kind(CommandKind::Update);
        let waiting = self.drain_updates(updates, &mut report);
        shared.queues.borrow_mut().restore_front(CommandKind::Update, waiting);

        for command in batch.take_kind(CommandKind::Unmount) {
            self.apply_unmount(command, &mut report);
        }

        if shared.queues.borrow().is_empty() && !self.garbage.is_empty() {
            let finalized = self.garbage.finalize();
            report.finalized = finalized.destroyed.len();
            report.hook_failures += finalized.failures.len();
        }

        shared.ticking.set(false);
        if !report.is_idle() {
            debug!(
                "event=tick created={} updated={} unmounted={} deferred={} abandoned={} finalized={}",
                report.created,
                report.updated,
                report.unmounted,
                report.deferred,
                report.abandoned,
                report.finalized
            );
        }
        report
    }

    // =========================================================================
    // Mounts
    // =========================================================================

    /// Apply mounts until a pass makes no progress, so a child queued before
    /// its parent still attaches within this tick.
    fn drain_mounts(&mut self, mut pending: VecDeque<Command>, report: &mut TickReport) -> Vec<Command> {
        loop {
            let before = pending.len();
            let mut waiting = Vec::new();
            for command in pending.drain(..) {
                if let Outcome::Waiting(command) = self.apply_mount(command, report) {
                    waiting.push(command);
                }
            }
            if waiting.is_empty() || waiting.len() == before {
                return self.age(waiting, report);
            }
            pending = waiting.into();
        }
    }

    fn apply_mount(&mut self, command: Command, report: &mut TickReport) -> Outcome {
        let parent = match &command.parent {
            Some(parent) => match self.registry.resolve_id(parent.as_str()) {
                Some(parent) => Some(parent.clone()),
                None => {
                    debug!("event=deferred_mount id={} parent={}", command.id, parent);
                    return Outcome::Waiting(command);
                }
            },
            None => None,
        };

        if self.registry.contains(command.id.as_str()) {
            debug!("event=double_mount id={}", command.id);
            report.double_mounts += 1;
            self.revive(&command.id, report);
            self.apply_to_existing(&command, parent.as_ref(), report);
            return Outcome::Applied;
        }

        let Some(mut object) = self.factories.create(&command.attributes) else {
            let err = BridgeError::CreationFailure {
                id: command.id.to_string(),
                type_name: command.type_name().unwrap_or("<none>").to_string(),
            };
            warn!("event=creation_failure error=\"{}\"", err);
            report.creation_failures += 1;
            return Outcome::Applied;
        };

        object.bind(ObjectBinding::new(command.id.clone(), self.handle.clone()));
        if let Err(source) = object.mount(&command.attributes) {
            hook_failed(&command.id, "mount", source, report);
        }
        if let Err(source) = object.update(&command.attributes) {
            hook_failed(&command.id, "update", source, report);
        }

        let mut node = Node::new(object, command.persistent);
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.registry.get_mut(parent_id.as_str()) {
                match parent_node.object.add_child(node.object.as_ref()) {
                    Ok(()) => {
                        node.parent = Some(parent_id);
                        report.attached += 1;
                    }
                    Err(source) => hook_failed(&command.id, "add_child", source, report),
                }
            }
        }

        let id = command.id;
        if let Err(node) = self.registry.insert(id.clone(), node) {
            // Hooks never touch the registry; the live entry wins regardless.
            warn!("event=duplicate_insert id={}", id);
            self.garbage.push(id, node.object);
            return Outcome::Applied;
        }
        debug!("event=created id={} persistent={}", id, command.persistent);
        report.created += 1;
        self.expose(&id);
        Outcome::Applied
    }

    /// Show a hidden object again.
    fn revive(&mut self, id: &ObjectId, report: &mut TickReport) {
        let Some(node) = self.registry.get_mut(id.as_str()) else {
            return;
        };
        if node.lifecycle == Lifecycle::Hidden {
            node.object.set_visible(true);
            node.lifecycle = Lifecycle::Live;
            debug!("event=revived id={}", id);
            report.revived += 1;
        }
    }

    /// Update path shared by updates and repeated mounts. A parent that
    /// resolves now is attached if the object has none yet.
    fn apply_to_existing(&mut self, command: &Command, parent: Option<&ObjectId>, report: &mut TickReport) {
        let Some(node) = self.registry.get_mut(command.id.as_str()) else {
            return;
        };
        if let Err(source) = node.object.update(&command.attributes) {
            hook_failed(&command.id, "update", source, report);
        }
        report.updated += 1;

        let Some(parent) = parent else {
            return;
        };
        if node.parent.is_some() {
            return;
        }
        match self.registry.attach(command.id.as_str(), parent.as_str()) {
            Ok(true) => report.attached += 1,
            Ok(false) => {}
            Err(source) => hook_failed(&command.id, "add_child", source, report),
        }
    }

    // =========================================================================
    // Updates
    // =========================================================================

    fn drain_updates(&mut self, pending: VecDeque<Command>, report: &mut TickReport) -> Vec<Command> {
        let mut waiting = Vec::new();
        for command in pending {
            if !self.registry.contains(command.id.as_str()) {
                debug!("event=deferred_update id={}", command.id);
                waiting.push(command);
                continue;
            }
            let parent = self.registry.resolve(&command.attributes, PARENT_KEY).cloned();
            self.apply_to_existing(&command, parent.as_ref(), report);
        }
        self.age(waiting, report)
    }

    // =========================================================================
    // Unmounts
    // =========================================================================

    fn apply_unmount(&mut self, command: Command, report: &mut TickReport) {
        let Some(node) = self.registry.get_mut(command.id.as_str()) else {
            // A mount still waiting on its parent would otherwise outlive this unmount.
            let cancelled = self
                .handle
                .shared
                .queues
                .borrow_mut()
                .cancel_deferred(command.id.as_str());
            if cancelled > 0 {
                debug!("event=unmount_cancelled id={} cancelled={}", command.id, cancelled);
                report.cancelled += cancelled;
            } else {
                debug!("event=unmount_unknown id={}", command.id);
                report.unknown_unmounts += 1;
            }
            return;
        };

        if command.retained {
            if node.lifecycle != Lifecycle::Hidden {
                node.object.set_visible(false);
                node.lifecycle = Lifecycle::Hidden;
                debug!("event=hidden id={}", command.id);
                report.hidden += 1;
            }
            return;
        }
        if node.is_persistent() {
            debug!("event=persistent_unmount_ignored id={}", command.id);
            return;
        }

        let Some((id, mut node)) = self.registry.remove(command.id.as_str()) else {
            return;
        };
        node.object.set_visible(false);
        let orphaned = self.registry.detach_children_of(id.as_str());
        debug!("event=unmounted id={} orphaned={}", id, orphaned);
        self.garbage.push(id, node.object);
        report.unmounted += 1;
    }

    // =========================================================================
    // Retry Budget
    // =========================================================================

    /// Count one more deferral against each command; drop those over budget.
    fn age(&self, waiting: Vec<Command>, report: &mut TickReport) -> Vec<Command> {
        let max_retries = self.config.max_retries;
        let mut kept = Vec::with_capacity(waiting.len());
        for mut command in waiting {
            command.deferrals += 1;
            if max_retries.is_some_and(|max| command.deferrals > max) {
                let reference = match (&command.kind, &command.parent) {
                    (CommandKind::Mount, Some(parent)) => parent.to_string(),
                    _ => command.id.to_string(),
                };
                let err = BridgeError::UnresolvedReference {
                    id: command.id.to_string(),
                    reference,
                    attempts: command.deferrals,
                };
                warn!("event=unresolved_reference kind={} error=\"{}\"", command.kind, err);
                report.abandoned += 1;
            } else {
                report.deferred += 1;
                kept.push(command);
            }
        }
        kept
    }
}

fn hook_failed(id: &ObjectId, hook: &'static str, source: ObjectError, report: &mut TickReport) {
    let err = BridgeError::Hook {
        id: id.to_string(),
        hook,
        source,
    };
    warn!("event=hook_failed hook={} error=\"{}\"", hook, err);
    report.hook_failures += 1;
}
