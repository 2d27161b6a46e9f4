//! The node tree.
//!
//! A [`Node`] owns one interactor and an ordered list of children. Attach
//! and detach propagate depth-first; saved state is scoped per child tag:
//!
//! ```text
//! { KEY_INTERACTOR: <interactor bundle>,
//!   KEY_CHILDREN:   { tag: <child node bundle>, .. } }
//! ```
//!
//! The child list is copy-on-write. Iteration works on an `Rc` snapshot, so
//! a detach triggered while children are being walked (cascading teardown,
//! a navigator reacting inside a callback) never invalidates the walk.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bundle::{Bundle, KEY_CHILDREN, KEY_INTERACTOR};
use crate::context::{NodeId, TreeContext, TreeEvent};
use crate::error::{Result, TreeError};
use crate::interactor::{Interactor, InteractorHandle};
use crate::presenter::Presenter;

/// Extension points on the routing side of a node.
pub trait NodeHooks: 'static {
    /// Once per node lifetime, before the first attach.
    fn did_load(&self, _node: &Node) {}

    /// Before every attach, ahead of the interactor becoming active.
    fn will_attach(&self, _node: &Node) {}

    /// After the interactor resigned, before children are detached.
    fn will_detach(&self, _node: &Node) {}
}

impl NodeHooks for () {}

/// Dependency wiring handed to the builder; runs once before assembly.
pub trait Component<I> {
    fn inject(&self, interactor: &mut I);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttachState {
    Created,
    Attached,
    Detached,
}

#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// Non-owning handle; parents and navigators hold these upward.
#[derive(Clone, Default)]
pub struct WeakNode(Weak<NodeInner>);

struct NodeInner {
    id: NodeId,
    ctx: TreeContext,
    interactor: InteractorHandle,
    hooks: Box<dyn NodeHooks>,
    default_tag: String,
    tag: RefCell<Option<String>>,
    children: RefCell<Rc<Vec<Node>>>,
    parent: RefCell<WeakNode>,
    saved_state: RefCell<Option<Bundle>>,
    loaded: Cell<bool>,
    state: Cell<AttachState>,
}

pub struct NodeBuilder<I: Interactor> {
    ctx: TreeContext,
    interactor: I,
    presenter: Option<Box<dyn FnOnce(I) -> InteractorHandle>>,
    hooks: Option<Box<dyn NodeHooks>>,
    tag: Option<String>,
}

impl<I: Interactor> NodeBuilder<I> {
    pub fn presenter(mut self, presenter: impl Presenter) -> Self {
        self.presenter = Some(Box::new(move |logic| {
            InteractorHandle::with_presenter(logic, presenter)
        }));
        self
    }

    pub fn hooks(mut self, hooks: impl NodeHooks) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Overrides the default tag (the interactor's type name).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn component(mut self, component: &impl Component<I>) -> Self {
        component.inject(&mut self.interactor);
        self
    }

    pub fn build(self) -> Node {
        let handle = match self.presenter {
            Some(make) => make(self.interactor),
            None => InteractorHandle::new(self.interactor),
        };
        let tag = self.tag.unwrap_or_else(|| handle.type_name().to_string());
        let hooks = self.hooks.unwrap_or_else(|| Box::new(()));
        let node = Node::assemble(&self.ctx, handle, hooks, tag);
        // A fresh handle cannot already be bound.
        let _ = node.0.interactor.bind_node(node.downgrade());
        node
    }
}

impl Node {
    pub fn builder<I: Interactor>(ctx: &TreeContext, interactor: I) -> NodeBuilder<I> {
        NodeBuilder {
            ctx: ctx.clone(),
            interactor,
            presenter: None,
            hooks: None,
            tag: None,
        }
    }

    /// Shorthand for a node with no presenter and no hooks.
    pub fn new<I: Interactor>(ctx: &TreeContext, interactor: I) -> Node {
        Self::builder(ctx, interactor).build()
    }

    /// Wraps an interactor constructed elsewhere. Fails if the interactor
    /// already belongs to another node.
    pub fn from_interactor(
        ctx: &TreeContext,
        interactor: InteractorHandle,
        hooks: impl NodeHooks,
    ) -> Result<Node> {
        let tag = interactor.type_name().to_string();
        let node = Node::assemble(ctx, interactor, Box::new(hooks), tag);
        node.0.interactor.bind_node(node.downgrade())?;
        Ok(node)
    }

    fn assemble(
        ctx: &TreeContext,
        interactor: InteractorHandle,
        hooks: Box<dyn NodeHooks>,
        default_tag: String,
    ) -> Node {
        Node(Rc::new(NodeInner {
            id: ctx.next_node_id(),
            ctx: ctx.clone(),
            interactor,
            hooks,
            default_tag,
            tag: RefCell::new(None),
            children: RefCell::new(Rc::new(Vec::new())),
            parent: RefCell::new(WeakNode::default()),
            saved_state: RefCell::new(None),
            loaded: Cell::new(false),
            state: Cell::new(AttachState::Created),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn context(&self) -> &TreeContext {
        &self.0.ctx
    }

    pub fn interactor(&self) -> &InteractorHandle {
        &self.0.interactor
    }

    /// Short interactor type name, for logs.
    pub fn name(&self) -> &'static str {
        self.0.interactor.name()
    }

    pub fn default_tag(&self) -> &str {
        &self.0.default_tag
    }

    /// Tag this node was last attached under.
    pub fn tag(&self) -> Option<String> {
        self.0.tag.borrow().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.0.loaded.get()
    }

    pub fn is_attached(&self) -> bool {
        self.0.state.get() == AttachState::Attached
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade()
    }

    /// Snapshot of the children in attach order.
    pub fn children(&self) -> Rc<Vec<Node>> {
        self.0.children.borrow().clone()
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Attaches `child` under its default tag.
    pub fn attach_child(&self, child: &Node) -> Result<()> {
        let tag = child.default_tag().to_string();
        self.attach_child_with_tag(child, tag)
    }

    /// Adds `child` to this node and attaches it with the state previously
    /// saved under `tag`. This node should itself be attached.
    pub fn attach_child_with_tag(&self, child: &Node, tag: impl Into<String>) -> Result<()> {
        let tag = tag.into();
        if child.is_attached() {
            return Err(TreeError::AlreadyAttached(child.name().to_string()));
        }
        if let Some(parent) = child.parent() {
            return Err(TreeError::AlreadyParented {
                child: child.name().to_string(),
                parent: parent.name().to_string(),
            });
        }

        let snapshot = self.children();
        if snapshot.iter().any(|c| c.tag().as_deref() == Some(tag.as_str())) {
            self.0.ctx.warn(TreeError::DuplicateTag(tag.clone()));
        }

        Rc::make_mut(&mut *self.0.children.borrow_mut()).push(child.clone());
        *child.0.parent.borrow_mut() = self.downgrade();

        self.0.ctx.breadcrumb("ATTACHED", child.name(), self.name());
        self.0.ctx.events().emit(TreeEvent::Attached {
            child: child.clone(),
            parent: self.clone(),
        });

        let child_state = self.saved_child_state(&tag);
        child.dispatch_attach_with_tag(child_state, tag)
    }

    /// Removes `child`, hands its interactor to the leak watcher, forgets
    /// any state saved under its tag and detaches its subtree.
    ///
    /// The caller should not keep `child` around afterwards unless it means
    /// to attach it again (navigators do).
    pub fn detach_child(&self, child: &Node) -> Result<()> {
        self.0.ctx.check_affinity();
        let removed = {
            let mut children = self.0.children.borrow_mut();
            match children.iter().position(|c| c.ptr_eq(child)) {
                Some(idx) => {
                    Rc::make_mut(&mut *children).remove(idx);
                    true
                }
                None => false,
            }
        };
        if !removed {
            self.0
                .ctx
                .warn(TreeError::UnknownChild(child.name().to_string()));
            return Ok(());
        }

        self.0
            .ctx
            .ref_watcher()
            .watch(child.interactor().watch_handle(), child.name());
        self.0.ctx.breadcrumb("DETACHED", child.name(), self.name());

        if let Some(tag) = child.tag()
            && let Some(saved) = self.0.saved_state.borrow_mut().as_mut()
            && let Some(children) = saved.get_bundle_mut(KEY_CHILDREN)
        {
            children.put_bundle(tag, None);
        }
        *child.0.parent.borrow_mut() = WeakNode::default();

        child.dispatch_detach()?;
        self.0.ctx.events().emit(TreeEvent::Detached {
            child: child.clone(),
            parent: self.clone(),
        });
        Ok(())
    }

    /// Host entry point: attaches this node as a root.
    pub fn dispatch_attach(&self, saved_state: Option<Bundle>) -> Result<()> {
        let tag = self.0.default_tag.clone();
        self.dispatch_attach_with_tag(saved_state, tag)
    }

    pub fn dispatch_attach_with_tag(
        &self,
        saved_state: Option<Bundle>,
        tag: impl Into<String>,
    ) -> Result<()> {
        self.0.ctx.check_affinity();
        if self.is_attached() {
            return Err(TreeError::AlreadyAttached(self.name().to_string()));
        }
        if !self.0.loaded.replace(true) {
            self.0.hooks.did_load(self);
        }

        let interactor_state = saved_state
            .as_ref()
            .and_then(|s| s.get_bundle(KEY_INTERACTOR))
            .cloned();
        *self.0.saved_state.borrow_mut() = saved_state;
        *self.0.tag.borrow_mut() = Some(tag.into());

        self.0.hooks.will_attach(self);
        self.0.state.set(AttachState::Attached);
        self.0
            .interactor
            .dispatch_attach(interactor_state.as_ref());
        Ok(())
    }

    /// Host entry point: tears this node and its subtree down. The
    /// interactor resigns first, while its children are still attached.
    pub fn dispatch_detach(&self) -> Result<()> {
        self.0.ctx.check_affinity();
        if !self.is_attached() {
            return Err(TreeError::NotAttached(self.name().to_string()));
        }

        self.0.interactor.dispatch_detach();
        self.0.hooks.will_detach(self);
        for child in self.children().iter() {
            // A sibling's teardown may already have removed it.
            if child.parent().is_some_and(|p| p.ptr_eq(self)) {
                self.detach_child(child)?;
            }
        }
        self.0.state.set(AttachState::Detached);
        Ok(())
    }

    /// Whether this node went through a full attach/detach cycle and is
    /// currently not attached.
    pub fn was_detached(&self) -> bool {
        self.0.state.get() == AttachState::Detached
    }

    /// Captures this node's interactor state plus that of every attached
    /// descendant, keyed by tag.
    pub fn save_state(&self) -> Bundle {
        let mut out = Bundle::new();
        self.save_state_into(&mut out);
        out
    }

    pub fn save_state_into(&self, out: &mut Bundle) {
        self.0.ctx.check_affinity();
        out.put_bundle(KEY_INTERACTOR, Some(self.0.interactor.save_instance_state()));
        let mut child_bundles = Bundle::new();
        for child in self.children().iter() {
            let tag = child.tag().unwrap_or_else(|| child.default_tag().to_string());
            child_bundles.put_bundle(tag, Some(child.save_state()));
        }
        out.put_bundle(KEY_CHILDREN, Some(child_bundles));
    }

    /// State that will be handed to a child attached under `tag`.
    pub fn saved_child_state(&self, tag: &str) -> Option<Bundle> {
        self.0
            .saved_state
            .borrow()
            .as_ref()
            .and_then(|s| s.get_bundle(KEY_CHILDREN))
            .and_then(|c| c.get_bundle(tag))
            .cloned()
    }

    /// Delegates to this node's interactor only.
    pub fn handle_back_press(&self) -> bool {
        self.0.ctx.check_affinity();
        self.0.ctx.breadcrumb("BACKPRESS", self.name(), self.name());
        self.0.interactor.handle_back_press()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.0.id)
            .field("name", &self.name())
            .field("tag", &self.tag())
            .field("attached", &self.is_attached())
            .field("children", &self.children().len())
            .finish()
    }
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "WeakNode({})", node.id()),
            None => f.write_str("WeakNode(released)"),
        }
    }
}

/// `a::b::Foo<c::Bar>` -> `Foo`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
