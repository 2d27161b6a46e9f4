use std::cell::Cell;
use std::rc::Rc;

use crate::notifier::Notifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenterEvent {
    Loaded,
    Unloaded,
}

/// Display-side half of a node. Loaded while its interactor is active.
pub trait Presenter: 'static {
    fn did_load(&self) {}

    fn will_unload(&self) {}
}

impl<P: Presenter + ?Sized> Presenter for Rc<P> {
    fn did_load(&self) {
        (**self).did_load()
    }

    fn will_unload(&self) {
        (**self).will_unload()
    }
}

#[derive(Clone)]
pub struct PresenterHandle(Rc<PresenterInner>);

struct PresenterInner {
    presenter: Box<dyn Presenter>,
    loaded: Cell<bool>,
    lifecycle: Notifier<PresenterEvent>,
}

impl PresenterHandle {
    pub fn new(presenter: impl Presenter) -> Self {
        Self(Rc::new(PresenterInner {
            presenter: Box::new(presenter),
            loaded: Cell::new(false),
            lifecycle: Notifier::new(),
        }))
    }

    pub fn is_loaded(&self) -> bool {
        self.0.loaded.get()
    }

    pub fn lifecycle(&self) -> &Notifier<PresenterEvent> {
        &self.0.lifecycle
    }

    pub(crate) fn dispatch_load(&self) {
        self.0.loaded.set(true);
        self.0.lifecycle.emit(PresenterEvent::Loaded);
        self.0.presenter.did_load();
    }

    pub(crate) fn dispatch_unload(&self) {
        self.0.loaded.set(false);
        self.0.presenter.will_unload();
        self.0.lifecycle.emit(PresenterEvent::Unloaded);
    }
}

impl std::fmt::Debug for PresenterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenterHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
