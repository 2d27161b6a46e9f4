//! Stack navigation for a single host [`Node`].
//!
//! A [`Navigator`] keeps a back stack of `(state, router)` entries plus at
//! most one transient entry outside the stack. Exactly one of them, the
//! effective top, is attached to the host at any time:
//!
//! ```text
//!   transient (optional)   <- effective top when present
//!   stack[n - 1]           <- otherwise this one
//!   ...
//!   stack[0]
//! ```
//!
//! Switching from entry `A` to entry `B` always runs
//!
//! ```text
//! A.will_detach_from_host -> host.detach_child(A) -> A.on_post_detach_from_host
//!   -> B.will_attach_to_host -> host.attach_child(B)
//! ```
//!
//! Routers are built lazily and at most once per entry. No borrow of the
//! stack is held while a callback runs, so callbacks may push or pop on the
//! same navigator.

use std::cell::{OnceCell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use arbor_core::{Node, Result, TreeContext, TreeError, TreeEvent, WeakNode};

#[cfg(test)]
mod tests;

/// Labels navigation states. Compared by value.
pub trait NavState: Clone + Debug + PartialEq + 'static {}
impl<T> NavState for T where T: Clone + Debug + PartialEq + 'static {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PushFlag {
    /// Push a new entry; pushing the current top's state rebuilds it.
    #[default]
    Default,
    /// Install outside the back stack; dropped by the next push.
    Transient,
    /// Pop back to an existing entry for the state, or push a new one.
    ClearTop,
    /// Drop every other entry for the state, then push.
    SingleTop,
    /// Move an existing entry for the state to the top, keeping the rest.
    ReorderToTop,
    /// Make the state the only entry, reusing the top if it matches.
    NewTask,
    /// Make a freshly built entry the only one, even if the top matches.
    NewTaskReplace,
    /// Swap the top entry for a new one.
    ReplaceTop,
}

pub trait AttachTransition<S>: 'static {
    fn build_router(&self) -> Node;

    /// Called right before `router` is attached to the host.
    fn will_attach_to_host(&self, _router: &Node, _previous: Option<&S>, _new: &S, _is_push: bool) {
    }
}

impl<S, F> AttachTransition<S> for F
where
    F: Fn() -> Node + 'static,
{
    fn build_router(&self) -> Node {
        self()
    }
}

pub trait DetachTransition<S>: 'static {
    fn will_detach_from_host(&self, _router: &Node, _previous: &S, _new: Option<&S>, _is_push: bool) {
    }

    fn on_post_detach_from_host(&self, _router: &Node, _new: Option<&S>, _is_push: bool) {}
}

/// One stack entry. The router is built on first use and then kept.
pub struct RouterAndState<S: NavState> {
    state: S,
    attach: Box<dyn AttachTransition<S>>,
    detach: Option<Box<dyn DetachTransition<S>>>,
    router: OnceCell<Node>,
}

impl<S: NavState> RouterAndState<S> {
    fn new(
        state: S,
        attach: Box<dyn AttachTransition<S>>,
        detach: Option<Box<dyn DetachTransition<S>>>,
    ) -> Self {
        Self {
            state,
            attach,
            detach,
            router: OnceCell::new(),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn router(&self) -> Node {
        self.router
            .get_or_init(|| self.attach.build_router())
            .clone()
    }

    fn will_attach_to_host(&self, router: &Node, previous: Option<&S>, is_push: bool) {
        self.attach
            .will_attach_to_host(router, previous, &self.state, is_push);
    }

    fn will_detach_from_host(&self, router: &Node, new: Option<&S>, is_push: bool) {
        if let Some(detach) = &self.detach {
            detach.will_detach_from_host(router, &self.state, new, is_push);
        }
    }

    fn on_post_detach_from_host(&self, router: &Node, new: Option<&S>, is_push: bool) {
        if let Some(detach) = &self.detach {
            detach.on_post_detach_from_host(router, new, is_push);
        }
    }
}

impl<S: NavState> Debug for RouterAndState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterAndState")
            .field("state", &self.state)
            .field("built", &self.router.get().is_some())
            .finish()
    }
}

type Entry<S> = Rc<RouterAndState<S>>;

struct NavInner<S: NavState> {
    host: WeakNode,
    host_name: &'static str,
    ctx: TreeContext,
    stack: RefCell<Vec<Entry<S>>>,
    transient: RefCell<Option<Entry<S>>>,
}

/// Cheap to clone; clones drive the same stack.
pub struct Navigator<S: NavState>(Rc<NavInner<S>>);

impl<S: NavState> Clone for Navigator<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S: NavState> Navigator<S> {
    pub fn new(host: &Node) -> Self {
        let nav = Self(Rc::new(NavInner {
            host: host.downgrade(),
            host_name: host.name(),
            ctx: host.context().clone(),
            stack: RefCell::new(Vec::new()),
            transient: RefCell::new(None),
        }));
        nav.log(format_args!("Installed new navigator: hosting {}", host.name()));
        nav
    }

    /// Pushes `state` under [`PushFlag`] semantics with no detach callbacks.
    pub fn push_state(
        &self,
        state: S,
        flag: PushFlag,
        attach: impl AttachTransition<S>,
    ) -> Result<()> {
        let entry = RouterAndState::new(state, Box::new(attach), None);
        self.push_entry(Rc::new(entry), flag)
    }

    pub fn push_state_with_detach(
        &self,
        state: S,
        flag: PushFlag,
        attach: impl AttachTransition<S>,
        detach: impl DetachTransition<S>,
    ) -> Result<()> {
        let entry = RouterAndState::new(state, Box::new(attach), Some(Box::new(detach)));
        self.push_entry(Rc::new(entry), flag)
    }

    /// Pops the transient entry if there is one, else the stack top, and
    /// attaches whatever becomes the top. Popping an empty navigator does
    /// nothing.
    pub fn pop_state(&self) -> Result<()> {
        self.0.ctx.check_affinity();
        let host = self.host()?;
        let transient = self.0.transient.borrow_mut().take();
        let from = match transient {
            Some(entry) => {
                self.log(format_args!(
                    "Preparing to pop existing transient state for router: {}",
                    entry.router().name()
                ));
                entry
            }
            None => {
                let popped = self.0.stack.borrow_mut().pop();
                match popped {
                    Some(entry) => {
                        self.log(format_args!(
                            "Preparing to pop existing state for router: {}",
                            entry.router().name()
                        ));
                        entry
                    }
                    None => {
                        self.log(format_args!("No state to pop. No action will be taken."));
                        return Ok(());
                    }
                }
            }
        };

        let to = self.0.stack.borrow().last().cloned();
        self.detach_internal(&host, &from, to.as_ref().map(|e| &e.state), false)?;
        if let Some(to) = to {
            self.attach_internal(&host, Some(&from.state), &to, false)?;
        }
        Ok(())
    }

    /// Detaches the effective top and forgets every entry. Hosts call this
    /// before they detach themselves.
    pub fn detach_all(&self) -> Result<()> {
        self.0.ctx.check_affinity();
        self.log(format_args!(
            "Detaching navigator from host -> {}",
            self.0.host_name
        ));
        let host = self.host()?;
        if let Some(current) = self.peek_entry() {
            self.detach_internal(&host, &current, None, false)?;
        }
        self.0.transient.borrow_mut().take();
        self.0.stack.borrow_mut().clear();
        Ok(())
    }

    /// Retained entries plus the transient one, if any.
    pub fn size(&self) -> usize {
        self.0.stack.borrow().len() + usize::from(self.0.transient.borrow().is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn peek_state(&self) -> Option<S> {
        self.peek_entry().map(|e| e.state.clone())
    }

    pub fn peek_router(&self) -> Option<Node> {
        self.peek_entry().map(|e| e.router())
    }

    /// Retained states, bottom first. The transient entry is not included.
    pub fn states(&self) -> Vec<S> {
        self.0
            .stack
            .borrow()
            .iter()
            .map(|e| e.state.clone())
            .collect()
    }

    fn host(&self) -> Result<Node> {
        self.0.host.upgrade().ok_or(TreeError::HostReleased)
    }

    fn peek_entry(&self) -> Option<Entry<S>> {
        if let Some(t) = self.0.transient.borrow().as_ref() {
            return Some(t.clone());
        }
        self.0.stack.borrow().last().cloned()
    }

    fn push_entry(&self, entry: Entry<S>, flag: PushFlag) -> Result<()> {
        self.0.ctx.check_affinity();
        let host = self.host()?;
        let current = self.peek_entry();
        let new_is_top = current.as_ref().is_some_and(|c| c.state == entry.state);

        if new_is_top
            && matches!(
                flag,
                PushFlag::Transient
                    | PushFlag::ClearTop
                    | PushFlag::SingleTop
                    | PushFlag::ReorderToTop
            )
        {
            self.log(format_args!(
                "{:?} is already on top; {flag:?} push ignored",
                entry.state
            ));
            return Ok(());
        }

        if let Some(current) = &current
            && !new_is_top
        {
            self.detach_internal(&host, current, Some(&entry.state), true)?;
        }
        self.0.transient.borrow_mut().take();
        let previous = current.as_ref().map(|c| &c.state);

        match flag {
            PushFlag::Default => {
                if let Some(current) = current.as_ref().filter(|_| new_is_top) {
                    self.detach_internal(&host, current, Some(&entry.state), true)?;
                }
                self.0.stack.borrow_mut().push(entry.clone());
                self.attach_internal(&host, previous, &entry, true)
            }
            PushFlag::Transient => {
                *self.0.transient.borrow_mut() = Some(entry.clone());
                self.attach_internal(&host, previous, &entry, true)
            }
            PushFlag::ClearTop => {
                let target = {
                    let mut stack = self.0.stack.borrow_mut();
                    match stack.iter().rposition(|e| e.state == entry.state) {
                        Some(idx) => {
                            stack.truncate(idx + 1);
                            stack[idx].clone()
                        }
                        None => {
                            stack.push(entry.clone());
                            entry
                        }
                    }
                };
                self.attach_internal(&host, previous, &target, true)
            }
            PushFlag::SingleTop => {
                {
                    let mut stack = self.0.stack.borrow_mut();
                    stack.retain(|e| e.state != entry.state);
                    stack.push(entry.clone());
                }
                self.attach_internal(&host, previous, &entry, true)
            }
            PushFlag::ReorderToTop => {
                let target = {
                    let mut stack = self.0.stack.borrow_mut();
                    let target = match stack.iter().rposition(|e| e.state == entry.state) {
                        Some(idx) => stack.remove(idx),
                        None => entry,
                    };
                    stack.push(target.clone());
                    target
                };
                self.attach_internal(&host, previous, &target, true)
            }
            PushFlag::NewTask => match current.clone().filter(|_| new_is_top) {
                Some(top) => {
                    let mut stack = self.0.stack.borrow_mut();
                    stack.clear();
                    stack.push(top);
                    Ok(())
                }
                None => {
                    {
                        let mut stack = self.0.stack.borrow_mut();
                        stack.clear();
                        stack.push(entry.clone());
                    }
                    self.attach_internal(&host, previous, &entry, true)
                }
            },
            PushFlag::NewTaskReplace => {
                if let Some(current) = current.as_ref().filter(|_| new_is_top) {
                    self.detach_internal(&host, current, Some(&entry.state), true)?;
                }
                {
                    let mut stack = self.0.stack.borrow_mut();
                    stack.clear();
                    stack.push(entry.clone());
                }
                self.attach_internal(&host, previous, &entry, true)
            }
            PushFlag::ReplaceTop => {
                if let Some(current) = current.as_ref().filter(|_| new_is_top) {
                    self.detach_internal(&host, current, Some(&entry.state), true)?;
                }
                {
                    let mut stack = self.0.stack.borrow_mut();
                    stack.pop();
                    stack.push(entry.clone());
                }
                self.attach_internal(&host, previous, &entry, true)
            }
        }
    }

    fn attach_internal(
        &self,
        host: &Node,
        previous: Option<&S>,
        to: &Entry<S>,
        is_push: bool,
    ) -> Result<()> {
        let router = to.router();
        self.log(format_args!("Calling will_attach_to_host for {}", router.name()));
        self.0.ctx.events().emit(TreeEvent::WillAttachToHost {
            host: host.clone(),
            child: router.clone(),
        });
        to.will_attach_to_host(&router, previous, is_push);
        // The callback may have navigated elsewhere.
        if !self.peek_entry().is_some_and(|top| Rc::ptr_eq(&top, to)) {
            self.log(format_args!(
                "{} is no longer on top; attach dropped",
                router.name()
            ));
            return Ok(());
        }
        self.log(format_args!(
            "Attaching {} as a child of {}",
            router.name(),
            self.0.host_name
        ));
        host.attach_child(&router)
    }

    fn detach_internal(
        &self,
        host: &Node,
        from: &Entry<S>,
        new: Option<&S>,
        is_push: bool,
    ) -> Result<()> {
        let router = from.router();
        if !router.parent().is_some_and(|p| p.ptr_eq(host)) {
            self.log(format_args!(
                "{} is not attached to {}; detach dropped",
                router.name(),
                self.0.host_name
            ));
            return Ok(());
        }
        self.log(format_args!("Calling will_detach_from_host for {}", router.name()));
        from.will_detach_from_host(&router, new, is_push);
        self.log(format_args!(
            "Detaching {} from {}",
            router.name(),
            self.0.host_name
        ));
        host.detach_child(&router)?;
        self.log(format_args!(
            "Calling on_post_detach_from_host for {}",
            router.name()
        ));
        from.on_post_detach_from_host(&router, new, is_push);
        Ok(())
    }

    fn log(&self, args: fmt::Arguments<'_>) {
        self.0.ctx.debug(format_args!("Navigator: {args}"));
    }
}

impl<S: NavState> Debug for Navigator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("host", &self.0.host_name)
            .field("stack", &self.states())
            .field("transient", &self.0.transient.borrow().as_ref().map(|e| e.state.clone()))
            .finish()
    }
}
