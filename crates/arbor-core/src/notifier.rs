//! Observer lists for lifecycle and tree events.
//!
//! [`Notifier`] caches the latest value and replays it to every new
//! subscriber before anything else is delivered. [`EventStream`] only
//! forwards values emitted after subscription. Both deliver synchronously,
//! in subscription order, from a snapshot of the subscriber list: callbacks
//! may subscribe, unsubscribe, or emit again without corrupting delivery.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::effects::Dispose;

pub type SubId = u64;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Subscribers<T> {
    next_id: SubId,
    subs: Vec<(SubId, Callback<T>)>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subs: Vec::new(),
        }
    }
}

impl<T> Subscribers<T> {
    fn add(&mut self, f: Callback<T>) -> SubId {
        let id = self.next_id;
        self.next_id += 1;
        self.subs.push((id, f));
        id
    }

    fn remove(&mut self, id: SubId) {
        self.subs.retain(|(sid, _)| *sid != id);
    }

    fn contains(&self, id: SubId) -> bool {
        self.subs.iter().any(|(sid, _)| *sid == id)
    }

    fn snapshot(&self) -> SmallVec<[(SubId, Callback<T>); 4]> {
        self.subs.iter().cloned().collect()
    }
}

struct Inner<T> {
    value: Option<T>,
    subscribers: Subscribers<T>,
}

/// Latest-value cache plus broadcast.
pub struct Notifier<T: 'static>(Rc<RefCell<Inner<T>>>);

impl<T: 'static> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + 'static> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Notifier<T> {
    /// A notifier with nothing cached yet.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Inner {
            value: None,
            subscribers: Subscribers::default(),
        })))
    }

    pub fn with_value(value: T) -> Self {
        let n = Self::new();
        n.0.borrow_mut().value = Some(value);
        n
    }

    pub fn latest(&self) -> Option<T> {
        self.0.borrow().value.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.borrow().subscribers.subs.len()
    }

    /// Caches `value`, then delivers it to current subscribers.
    pub fn emit(&self, value: T) {
        let snapshot = {
            let mut inner = self.0.borrow_mut();
            inner.value = Some(value.clone());
            inner.subscribers.snapshot()
        };
        for (id, f) in snapshot {
            if self.is_subscribed(id) {
                f(&value);
            }
        }
    }

    /// Registers `f`; the cached value (if any) is delivered before this
    /// returns.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Dispose {
        let f: Callback<T> = Rc::new(f);
        let (id, current) = {
            let mut inner = self.0.borrow_mut();
            let id = inner.subscribers.add(f.clone());
            (id, inner.value.clone())
        };
        if let Some(v) = current {
            f(&v);
        }
        self.unsubscriber(id)
    }

    fn is_subscribed(&self, id: SubId) -> bool {
        self.0.borrow().subscribers.contains(id)
    }

    fn unsubscriber(&self, id: SubId) -> Dispose {
        let weak: Weak<RefCell<Inner<T>>> = Rc::downgrade(&self.0);
        Dispose::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subscribers.remove(id);
            }
        })
    }
}

/// Broadcast without replay.
pub struct EventStream<T: 'static>(Rc<RefCell<Subscribers<T>>>);

impl<T: 'static> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> EventStream<T> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Subscribers::default())))
    }

    pub fn emit(&self, value: T) {
        let snapshot = self.0.borrow().snapshot();
        for (id, f) in snapshot {
            if self.0.borrow().contains(id) {
                f(&value);
            }
        }
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Dispose {
        let id = self.0.borrow_mut().add(Rc::new(f));
        let weak = Rc::downgrade(&self.0);
        Dispose::new(move || {
            if let Some(subs) = weak.upgrade() {
                subs.borrow_mut().remove(id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.borrow().subs.len()
    }
}
