//! Garbage list - objects awaiting deferred teardown.
//!
//! Unmounting hides an object and parks it here; it leaves the registry
//! immediately so the id is free for a brand-new object. Teardown runs only
//! from [`GarbageList::finalize`], which the tick calls once every queue is
//! empty.

use log::{debug, warn};

use super::object::UiObject;
use crate::error::BridgeError;
use crate::types::{Lifecycle, ObjectId};

pub struct GarbageEntry {
    id: ObjectId,
    object: Box<dyn UiObject>,
    lifecycle: Lifecycle,
}

impl GarbageEntry {
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

/// What one finalization pass did.
#[derive(Debug, Default)]
pub struct Finalized {
    /// Released ids, oldest first.
    pub destroyed: Vec<ObjectId>,
    /// Teardown hooks that reported an error. The objects are released
    /// regardless.
    pub failures: Vec<BridgeError>,
}

#[derive(Default)]
pub struct GarbageList {
    entries: Vec<GarbageEntry>,
}

impl GarbageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an already hidden object.
    pub fn push(&mut self, id: ObjectId, object: Box<dyn UiObject>) {
        self.entries.push(GarbageEntry {
            id,
            object,
            lifecycle: Lifecycle::PendingDestroy,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GarbageEntry] {
        &self.entries
    }

    /// Tear down and release every entry, oldest first.
    pub fn finalize(&mut self) -> Finalized {
        let mut outcome = Finalized::default();
        for mut entry in self.entries.drain(..) {
            if let Err(source) = entry.object.unmount() {
                warn!(
                    "event=hook_failed hook=unmount id={} error=\"{}\"",
                    entry.id, source
                );
                outcome.failures.push(BridgeError::Hook {
                    id: entry.id.to_string(),
                    hook: "unmount",
                    source,
                });
            }
            debug!("event=finalize id={}", entry.id);
            outcome.destroyed.push(entry.id);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::object::{NativeHandle, ObjectBinding};
    use crate::error::ObjectError;
    use crate::types::Attributes;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TeardownRecorder {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
    }

    impl UiObject for TeardownRecorder {
        fn mount(&mut self, _attributes: &Attributes) -> Result<(), ObjectError> {
            Ok(())
        }
        fn update(&mut self, _attributes: &Attributes) -> Result<(), ObjectError> {
            Ok(())
        }
        fn unmount(&mut self) -> Result<(), ObjectError> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                Err(ObjectError::Native("busy".to_string()))
            } else {
                Ok(())
            }
        }
        fn add_child(&mut self, _child: &dyn UiObject) -> Result<(), ObjectError> {
            Ok(())
        }
        fn set_visible(&mut self, _visible: bool) {}
        fn native_handle(&self) -> NativeHandle {
            NativeHandle(0)
        }
        fn bind(&mut self, _binding: ObjectBinding) {}
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>, fail: bool) -> Box<dyn UiObject> {
        Box::new(TeardownRecorder {
            name,
            log: log.clone(),
            fail,
        })
    }

    #[test]
    fn test_push_is_pending() {
        let log = Rc::default();
        let mut garbage = GarbageList::new();
        garbage.push(ObjectId::new("a").unwrap(), recorder("a", &log, false));

        assert_eq!(garbage.len(), 1);
        assert_eq!(garbage.entries()[0].lifecycle(), Lifecycle::PendingDestroy);
        assert_eq!(garbage.entries()[0].id().as_str(), "a");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_finalize_tears_down_in_order() {
        let log = Rc::default();
        let mut garbage = GarbageList::new();
        garbage.push(ObjectId::new("a").unwrap(), recorder("a", &log, false));
        garbage.push(ObjectId::new("b").unwrap(), recorder("b", &log, false));

        let outcome = garbage.finalize();
        let ids: Vec<&str> = outcome.destroyed.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(outcome.failures.is_empty());
        assert!(garbage.is_empty());
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_failed_teardown_still_releases() {
        let log = Rc::default();
        let mut garbage = GarbageList::new();
        garbage.push(ObjectId::new("a").unwrap(), recorder("a", &log, true));
        garbage.push(ObjectId::new("b").unwrap(), recorder("b", &log, false));

        let outcome = garbage.finalize();
        assert_eq!(outcome.destroyed.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            &outcome.failures[0],
            BridgeError::Hook { hook: "unmount", id, .. } if id == "a"
        ));
        assert!(garbage.is_empty());
    }
}
