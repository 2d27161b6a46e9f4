//! Business-logic half of a node and its ACTIVE/INACTIVE lifecycle.
//!
//! ```text
//! (never attached) --attach--> ACTIVE --detach--> INACTIVE
//! ```
//!
//! A navigator may attach a retained node again, which opens a new ACTIVE
//! period; work scoped to the previous period has already been stopped.

use std::any::Any;
use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};

use crate::bundle::Bundle;
use crate::error::{LifecycleError, Result, TreeError};
use crate::node::{Node, WeakNode, short_type_name};
use crate::notifier::Notifier;
use crate::presenter::{Presenter, PresenterHandle};
use crate::scope::Scope;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractorEvent {
    Active,
    Inactive,
}

/// Hooks implemented by application logic. All take `&self`; keep mutable
/// state in `Cell`/`RefCell`.
pub trait Interactor: 'static {
    /// Runs inside the interactor's fresh [`Scope`], so `scoped_effect`
    /// cleanups registered here run on resignation.
    fn did_become_active(&self, _handle: &InteractorHandle, _saved_state: Option<&Bundle>) {}

    fn will_resign_active(&self, _handle: &InteractorHandle) {}

    /// Return `true` when the press was consumed. Children are not asked
    /// unless this implementation forwards to them.
    fn handle_back_press(&self, _handle: &InteractorHandle) -> bool {
        false
    }

    fn on_save_instance_state(&self, _out: &mut Bundle) {}
}

#[derive(Clone)]
pub struct InteractorHandle(Rc<InteractorInner>);

struct InteractorInner {
    logic: Rc<dyn Interactor>,
    any: Rc<dyn Any>,
    type_name: &'static str,
    presenter: Option<PresenterHandle>,
    lifecycle: Notifier<InteractorEvent>,
    node: OnceCell<WeakNode>,
    scope: RefCell<Option<Scope>>,
}

impl InteractorHandle {
    pub fn new<I: Interactor>(logic: I) -> Self {
        Self::assemble(logic, None)
    }

    pub fn with_presenter<I: Interactor>(logic: I, presenter: impl Presenter) -> Self {
        Self::assemble(logic, Some(PresenterHandle::new(presenter)))
    }

    fn assemble<I: Interactor>(logic: I, presenter: Option<PresenterHandle>) -> Self {
        let logic = Rc::new(logic);
        Self(Rc::new(InteractorInner {
            logic: logic.clone(),
            any: logic,
            type_name: std::any::type_name::<I>(),
            presenter,
            lifecycle: Notifier::new(),
            node: OnceCell::new(),
            scope: RefCell::new(None),
        }))
    }

    /// Full type name of the logic object.
    pub fn type_name(&self) -> &'static str {
        self.0.type_name
    }

    pub fn name(&self) -> &'static str {
        short_type_name(self.0.type_name)
    }

    pub fn downcast<T: Interactor>(&self) -> Option<Rc<T>> {
        self.0.any.clone().downcast::<T>().ok()
    }

    pub fn node(&self) -> Result<Node> {
        let weak = self.0.node.get().ok_or(TreeError::NodeNotSet)?;
        weak.upgrade().ok_or(TreeError::NodeReleased)
    }

    pub(crate) fn bind_node(&self, node: WeakNode) -> Result<()> {
        self.0
            .node
            .set(node)
            .map_err(|_| TreeError::NodeAlreadySet)
    }

    pub fn presenter(&self) -> Option<&PresenterHandle> {
        self.0.presenter.as_ref()
    }

    pub fn lifecycle(&self) -> &Notifier<InteractorEvent> {
        &self.0.lifecycle
    }

    /// `None` until the first attach.
    pub fn peek_lifecycle(&self) -> Option<InteractorEvent> {
        self.0.lifecycle.latest()
    }

    pub fn is_attached(&self) -> bool {
        self.peek_lifecycle() == Some(InteractorEvent::Active)
    }

    /// The event that ends the current lifecycle period, i.e. when work
    /// started now must stop.
    pub fn lifecycle_boundary(&self) -> Result<InteractorEvent, LifecycleError> {
        match self.peek_lifecycle() {
            Some(InteractorEvent::Active) => Ok(InteractorEvent::Inactive),
            Some(InteractorEvent::Inactive) => Err(LifecycleError::Ended),
            None => Err(LifecycleError::NotStarted),
        }
    }

    /// Scope of the current active period.
    pub fn scope(&self) -> Result<Scope, LifecycleError> {
        self.lifecycle_boundary()?;
        self.0.scope.borrow().clone().ok_or(LifecycleError::Ended)
    }

    pub(crate) fn watch_handle(&self) -> Weak<dyn Any> {
        let weak: Weak<InteractorInner> = Rc::downgrade(&self.0);
        weak
    }

    pub(crate) fn dispatch_attach(&self, saved_state: Option<&Bundle>) {
        let scope = Scope::new();
        *self.0.scope.borrow_mut() = Some(scope.clone());
        self.0.lifecycle.emit(InteractorEvent::Active);
        if let Some(presenter) = &self.0.presenter {
            presenter.dispatch_load();
        }
        scope.run(|| self.0.logic.did_become_active(self, saved_state));
    }

    pub(crate) fn dispatch_detach(&self) {
        self.0.logic.will_resign_active(self);
        if let Some(presenter) = &self.0.presenter {
            presenter.dispatch_unload();
        }
        self.0.lifecycle.emit(InteractorEvent::Inactive);
        let scope = self.0.scope.borrow_mut().take();
        if let Some(scope) = scope {
            scope.dispose();
        }
    }

    pub(crate) fn handle_back_press(&self) -> bool {
        self.0.logic.handle_back_press(self)
    }

    pub(crate) fn save_instance_state(&self) -> Bundle {
        let mut out = Bundle::new();
        self.0.logic.on_save_instance_state(&mut out);
        out
    }

    pub fn ptr_eq(&self, other: &InteractorHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for InteractorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractorHandle")
            .field("type", &self.name())
            .field("lifecycle", &self.peek_lifecycle())
            .finish()
    }
}
