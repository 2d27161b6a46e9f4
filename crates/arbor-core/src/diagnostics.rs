//! Leak watching and breadcrumbs.
//!
//! On every detach the tree drops its own owning reference to the child's
//! interactor and hands a weak handle to the configured [`RefWatcher`]. The
//! watcher decides, on its own schedule, whether the object really became
//! unreachable and reports failures out of band.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Weak;

pub trait RefWatcher {
    fn watch(&self, object: Weak<dyn Any>, name: &str);

    fn log_breadcrumb(&self, _event: &str, _child: &str, _parent: &str) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRefWatcher;

impl RefWatcher for NoopRefWatcher {
    fn watch(&self, _object: Weak<dyn Any>, _name: &str) {}
}

/// Collects watched objects until [`LeakTracker::sweep`] is called.
#[derive(Default)]
pub struct LeakTracker {
    pending: RefCell<Vec<(Weak<dyn Any>, String)>>,
    breadcrumbs: RefCell<Vec<String>>,
}

impl LeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Drops every entry that has been released and returns the names of
    /// those still reachable. Leaked entries are logged and forgotten.
    pub fn sweep(&self) -> Vec<String> {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let leaked: Vec<String> = pending
            .into_iter()
            .filter(|(weak, _)| weak.strong_count() > 0)
            .map(|(_, name)| name)
            .collect();
        for name in &leaked {
            log::warn!("{name} is still reachable after being detached");
        }
        leaked
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        self.breadcrumbs.borrow().clone()
    }
}

impl RefWatcher for LeakTracker {
    fn watch(&self, object: Weak<dyn Any>, name: &str) {
        self.pending.borrow_mut().push((object, name.to_string()));
    }

    fn log_breadcrumb(&self, event: &str, child: &str, parent: &str) {
        self.breadcrumbs
            .borrow_mut()
            .push(format!("{event} {child} <- {parent}"));
    }
}

impl std::fmt::Debug for LeakTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeakTracker")
            .field("pending", &self.pending())
            .finish()
    }
}

impl<W: RefWatcher + ?Sized> RefWatcher for std::rc::Rc<W> {
    fn watch(&self, object: Weak<dyn Any>, name: &str) {
        (**self).watch(object, name)
    }

    fn log_breadcrumb(&self, event: &str, child: &str, parent: &str) {
        (**self).log_breadcrumb(event, child, parent)
    }
}
