//! Command ingestion - payload parsing and the three FIFO queues.
//!
//! Enqueueing never consults the registry. A payload is either a complete
//! [`Command`] or it is dropped; nothing partial is ever queued.

use std::collections::VecDeque;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{Attributes, CommandKind, ObjectId, ID_KEY, PARENT_KEY, TYPE_KEY};

// =============================================================================
// Markers
// =============================================================================

/// Payload keys whose presence (not value) carries meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub persistent: String,
    pub retained: String,
}

impl Markers {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            persistent: config.persistent_marker.clone(),
            retained: config.retained_marker.clone(),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

// =============================================================================
// Command
// =============================================================================

/// One requested mutation. Consumed exactly once by a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub id: ObjectId,
    /// Declared parent, if any.
    pub parent: Option<ObjectId>,
    /// The persistence marker is present.
    pub persistent: bool,
    /// The retained marker is present.
    pub retained: bool,
    /// The full payload, `id` and markers included.
    pub attributes: Attributes,
    /// Ticks this command has been deferred across.
    pub(crate) deferrals: u32,
}

impl Command {
    /// Parse a textual payload.
    pub fn parse(kind: CommandKind, payload: &str, markers: &Markers) -> BridgeResult<Self> {
        let value: Value = serde_json::from_str(payload).map_err(|err| malformed(kind, err))?;
        Self::from_value(kind, value, markers)
    }

    /// Build from an already parsed payload.
    pub fn from_value(kind: CommandKind, value: Value, markers: &Markers) -> BridgeResult<Self> {
        let Value::Object(attributes) = value else {
            return Err(malformed(kind, "payload is not an object"));
        };

        let id = match attributes.get(ID_KEY) {
            Some(Value::String(id)) => {
                ObjectId::new(id.as_str()).ok_or_else(|| malformed(kind, "`id` is empty"))?
            }
            Some(_) => return Err(malformed(kind, "`id` is not a string")),
            None => return Err(malformed(kind, "`id` is missing")),
        };

        let parent = match attributes.get(PARENT_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(parent)) => ObjectId::new(parent.as_str()),
            Some(_) => return Err(malformed(kind, "`parent` is not a string")),
        };

        Ok(Self {
            kind,
            persistent: attributes.contains_key(&markers.persistent),
            retained: attributes.contains_key(&markers.retained),
            id,
            parent,
            attributes,
            deferrals: 0,
        })
    }

    /// Unmount synthesized by the engine itself (environment reset).
    pub fn synthesized_unmount(id: ObjectId) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(ID_KEY.to_string(), Value::String(id.as_str().to_string()));
        Self {
            kind: CommandKind::Unmount,
            id,
            parent: None,
            persistent: false,
            retained: false,
            attributes,
            deferrals: 0,
        }
    }

    /// The type discriminant, when present.
    pub fn type_name(&self) -> Option<&str> {
        self.attributes.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// Ticks this command has been deferred across.
    pub fn deferrals(&self) -> u32 {
        self.deferrals
    }
}

fn malformed(kind: CommandKind, reason: impl ToString) -> BridgeError {
    BridgeError::MalformedCommand {
        kind,
        reason: reason.to_string(),
    }
}

// =============================================================================
// Queues
// =============================================================================

/// Queue lengths at one observation point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub mounts: usize,
    pub updates: usize,
    pub unmounts: usize,
}

impl PendingCounts {
    pub fn total(&self) -> usize {
        self.mounts + self.updates + self.unmounts
    }
}

/// The mount, update and unmount queues. FIFO within a kind.
#[derive(Debug, Default)]
pub struct CommandQueues {
    mounts: VecDeque<Command>,
    updates: VecDeque<Command>,
    unmounts: VecDeque<Command>,
}

impl CommandQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the queue of the command's kind.
    pub fn push(&mut self, command: Command) {
        self.queue_mut(command.kind).push_back(command);
    }

    /// Put `deferred` back ahead of anything enqueued since the drain,
    /// keeping their relative order.
    pub fn restore_front(&mut self, kind: CommandKind, deferred: Vec<Command>) {
        let queue = self.queue_mut(kind);
        for command in deferred.into_iter().rev() {
            queue.push_front(command);
        }
    }

    /// Take everything queued so far, leaving the queues empty.
    pub fn take(&mut self) -> CommandQueues {
        std::mem::take(self)
    }

    pub fn take_kind(&mut self, kind: CommandKind) -> VecDeque<Command> {
        std::mem::take(self.queue_mut(kind))
    }

    /// Drop deferred mounts and updates targeting `id`. Commands that were
    /// never deferred are kept. Returns how many were dropped.
    pub fn cancel_deferred(&mut self, id: &str) -> usize {
        let mut cancelled = 0;
        for kind in [CommandKind::Mount, CommandKind::Update] {
            let queue = self.queue_mut(kind);
            let before = queue.len();
            queue.retain(|command| command.deferrals == 0 || command.id.as_str() != id);
            cancelled += before - queue.len();
        }
        cancelled
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty() && self.updates.is_empty() && self.unmounts.is_empty()
    }

    pub fn counts(&self) -> PendingCounts {
        PendingCounts {
            mounts: self.mounts.len(),
            updates: self.updates.len(),
            unmounts: self.unmounts.len(),
        }
    }

    /// Commands of `kind`, front to back.
    pub fn iter_kind(&self, kind: CommandKind) -> impl Iterator<Item = &Command> {
        self.queue(kind).iter()
    }

    fn queue(&self, kind: CommandKind) -> &VecDeque<Command> {
        match kind {
            CommandKind::Mount => &self.mounts,
            CommandKind::Update => &self.updates,
            CommandKind::Unmount => &self.unmounts,
        }
    }

    fn queue_mut(&mut self, kind: CommandKind) -> &mut VecDeque<Command> {
        match kind {
            CommandKind::Mount => &mut self.mounts,
            CommandKind::Update => &mut self.updates,
            CommandKind::Unmount => &mut self.unmounts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(kind: CommandKind, payload: &str) -> BridgeResult<Command> {
        Command::parse(kind, payload, &Markers::default())
    }

    #[test]
    fn test_parse_mount() {
        let cmd = parse(
            CommandKind::Mount,
            r#"{"id":"b","type":"Label","parent":"a","text":"hi"}"#,
        )
        .unwrap();
        assert_eq!(cmd.id.as_str(), "b");
        assert_eq!(cmd.parent.as_ref().map(ObjectId::as_str), Some("a"));
        assert_eq!(cmd.type_name(), Some("Label"));
        assert_eq!(cmd.attributes["text"], json!("hi"));
        assert!(!cmd.persistent);
        assert_eq!(cmd.deferrals(), 0);
    }

    #[test]
    fn test_markers_use_presence_not_value() {
        let cmd = parse(CommandKind::Mount, r#"{"id":"x","persistent":false}"#).unwrap();
        assert!(cmd.persistent);

        let cmd = parse(CommandKind::Unmount, r#"{"id":"x","retained":null}"#).unwrap();
        assert!(cmd.retained);
    }

    #[test]
    fn test_custom_markers() {
        let markers = Markers {
            persistent: "keep".to_string(),
            retained: "stash".to_string(),
        };
        let cmd =
            Command::parse(CommandKind::Unmount, r#"{"id":"x","stash":1,"persistent":1}"#, &markers)
                .unwrap();
        assert!(cmd.retained);
        assert!(!cmd.persistent);
    }

    #[test]
    fn test_malformed_payloads() {
        for payload in [
            "{not json",
            "[1,2]",
            r#"{"type":"View"}"#,
            r#"{"id":""}"#,
            r#"{"id":7}"#,
            r#"{"id":"a","parent":3}"#,
        ] {
            let err = parse(CommandKind::Mount, payload).unwrap_err();
            assert!(
                matches!(err, BridgeError::MalformedCommand { kind: CommandKind::Mount, .. }),
                "{payload} -> {err}"
            );
        }
    }

    #[test]
    fn test_null_or_empty_parent_is_none() {
        let cmd = parse(CommandKind::Mount, r#"{"id":"a","parent":null}"#).unwrap();
        assert!(cmd.parent.is_none());
        let cmd = parse(CommandKind::Mount, r#"{"id":"a","parent":""}"#).unwrap();
        assert!(cmd.parent.is_none());
    }

    #[test]
    fn test_queues_are_fifo_per_kind() {
        let mut queues = CommandQueues::new();
        for id in ["a", "b"] {
            queues.push(parse(CommandKind::Update, &format!(r#"{{"id":"{id}"}}"#)).unwrap());
        }
        queues.push(parse(CommandKind::Mount, r#"{"id":"m"}"#).unwrap());

        let counts = queues.counts();
        assert_eq!((counts.mounts, counts.updates, counts.unmounts), (1, 2, 0));
        assert_eq!(counts.total(), 3);

        let ids: Vec<&str> = queues
            .iter_kind(CommandKind::Update)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_restore_front_keeps_order() {
        let mut queues = CommandQueues::new();
        queues.push(parse(CommandKind::Update, r#"{"id":"late"}"#).unwrap());
        let deferred = vec![
            parse(CommandKind::Update, r#"{"id":"first"}"#).unwrap(),
            parse(CommandKind::Update, r#"{"id":"second"}"#).unwrap(),
        ];
        queues.restore_front(CommandKind::Update, deferred);

        let ids: Vec<&str> = queues
            .iter_kind(CommandKind::Update)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "late"]);
    }

    #[test]
    fn test_cancel_deferred_spares_fresh_commands() {
        let mut queues = CommandQueues::new();
        let mut deferred = parse(CommandKind::Mount, r#"{"id":"c","parent":"p"}"#).unwrap();
        deferred.deferrals = 1;
        queues.restore_front(CommandKind::Mount, vec![deferred]);
        queues.push(parse(CommandKind::Mount, r#"{"id":"c"}"#).unwrap());
        let mut update = parse(CommandKind::Update, r#"{"id":"c"}"#).unwrap();
        update.deferrals = 3;
        queues.push(update);

        assert_eq!(queues.cancel_deferred("c"), 2);
        let counts = queues.counts();
        assert_eq!((counts.mounts, counts.updates), (1, 0));
        assert_eq!(queues.iter_kind(CommandKind::Mount).next().unwrap().deferrals(), 0);
        assert_eq!(queues.cancel_deferred("other"), 0);
    }

    #[test]
    fn test_take_empties() {
        let mut queues = CommandQueues::new();
        queues.push(parse(CommandKind::Unmount, r#"{"id":"a"}"#).unwrap());
        let taken = queues.take();
        assert!(queues.is_empty());
        assert!(!taken.is_empty());
    }

    #[test]
    fn test_synthesized_unmount() {
        let cmd = Command::synthesized_unmount(ObjectId::new("gone").unwrap());
        assert_eq!(cmd.kind, CommandKind::Unmount);
        assert!(!cmd.retained);
        assert_eq!(cmd.attributes[ID_KEY], json!("gone"));
    }
}
