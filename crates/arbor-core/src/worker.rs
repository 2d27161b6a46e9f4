//! Units of work whose lifetime follows an interactor or presenter.
//!
//! A bound worker starts when its owner becomes ACTIVE (or LOADED) and is
//! stopped when the owner resigns; the binding then ends by itself, the
//! tree never interrupts the worker in any other way.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::effects::Dispose;
use crate::error::{LifecycleError, Result};
use crate::interactor::{InteractorEvent, InteractorHandle};
use crate::presenter::{PresenterEvent, PresenterHandle};

pub trait Worker: 'static {
    fn on_start(&self) {}

    fn on_stop(&self) {}
}

impl<W: Worker + ?Sized> Worker for Rc<W> {
    fn on_start(&self) {
        (**self).on_start()
    }

    fn on_stop(&self) {
        (**self).on_stop()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkerEvent {
    Start,
    Stop,
}

/// Stops a bound worker early. Dropping it leaves the binding in place.
#[derive(Clone, Debug)]
pub struct WorkerUnbinder {
    binding: Rc<Binding>,
}

impl WorkerUnbinder {
    pub fn unbind(&self) {
        self.binding.on_event(WorkerEvent::Stop);
    }

    pub fn is_bound(&self) -> bool {
        !self.binding.finished.get()
    }
}

struct Binding {
    worker: Box<dyn Worker>,
    started: Cell<bool>,
    finished: Cell<bool>,
    subscription: RefCell<Option<Dispose>>,
}

impl Binding {
    fn on_event(&self, event: WorkerEvent) {
        if self.finished.get() {
            return;
        }
        match event {
            WorkerEvent::Start => {
                if !self.started.replace(true) {
                    self.worker.on_start();
                }
            }
            WorkerEvent::Stop => {
                self.finished.set(true);
                let subscription = self.subscription.borrow_mut().take();
                if let Some(d) = subscription {
                    d.run();
                }
                if self.started.replace(false) {
                    self.worker.on_stop();
                }
            }
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("started", &self.started.get())
            .field("finished", &self.finished.get())
            .finish()
    }
}

pub struct WorkerBinder;

impl WorkerBinder {
    /// Binds `worker` to the interactor's lifecycle. Starts immediately if
    /// the interactor is active, otherwise on its first attach. An
    /// interactor that already resigned cannot take new work.
    pub fn bind(interactor: &InteractorHandle, worker: impl Worker) -> Result<WorkerUnbinder> {
        match interactor.lifecycle_boundary() {
            Ok(_) | Err(LifecycleError::NotStarted) => {}
            Err(e @ LifecycleError::Ended) => return Err(e.into()),
        }
        let binding = Self::binding(worker);
        let b = binding.clone();
        let sub = interactor.lifecycle().subscribe(move |event| {
            b.on_event(match event {
                InteractorEvent::Active => WorkerEvent::Start,
                InteractorEvent::Inactive => WorkerEvent::Stop,
            });
        });
        Ok(Self::finish(binding, sub))
    }

    pub fn bind_all(
        interactor: &InteractorHandle,
        workers: impl IntoIterator<Item = Rc<dyn Worker>>,
    ) -> Result<Vec<WorkerUnbinder>> {
        workers
            .into_iter()
            .map(|w| Self::bind(interactor, w))
            .collect()
    }

    /// Binds `worker` to the presenter's load/unload cycle.
    pub fn bind_to_presenter(presenter: &PresenterHandle, worker: impl Worker) -> WorkerUnbinder {
        let binding = Self::binding(worker);
        let b = binding.clone();
        let sub = presenter.lifecycle().subscribe(move |event| {
            b.on_event(match event {
                PresenterEvent::Loaded => WorkerEvent::Start,
                PresenterEvent::Unloaded => WorkerEvent::Stop,
            });
        });
        Self::finish(binding, sub)
    }

    fn binding(worker: impl Worker) -> Rc<Binding> {
        Rc::new(Binding {
            worker: Box::new(worker),
            started: Cell::new(false),
            finished: Cell::new(false),
            subscription: RefCell::new(None),
        })
    }

    fn finish(binding: Rc<Binding>, sub: Dispose) -> WorkerUnbinder {
        if binding.finished.get() {
            sub.run();
        } else {
            *binding.subscription.borrow_mut() = Some(sub);
        }
        WorkerUnbinder { binding }
    }
}
