use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::thread::{self, ThreadId};

use crate::config::{Configuration, ErrorSink};
use crate::diagnostics::RefWatcher;
use crate::error::TreeError;
use crate::node::Node;
use crate::notifier::EventStream;

/// Identity of a node within one context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural changes published on [`TreeContext::events`].
#[derive(Clone)]
pub enum TreeEvent {
    Attached { child: Node, parent: Node },
    Detached { child: Node, parent: Node },
    /// A navigator is about to attach `child` to `host`.
    WillAttachToHost { host: Node, child: Node },
}

impl fmt::Debug for TreeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeEvent::Attached { child, parent } => {
                write!(f, "Attached({} -> {})", child.name(), parent.name())
            }
            TreeEvent::Detached { child, parent } => {
                write!(f, "Detached({} <- {})", child.name(), parent.name())
            }
            TreeEvent::WillAttachToHost { host, child } => {
                write!(f, "WillAttachToHost({} -> {})", child.name(), host.name())
            }
        }
    }
}

/// Shared by every node of one tree. Created by the host, then cloned down.
#[derive(Clone)]
pub struct TreeContext(Rc<ContextInner>);

struct ContextInner {
    config: Configuration,
    affinity: ThreadId,
    events: EventStream<TreeEvent>,
    next_id: Cell<u64>,
}

impl TreeContext {
    pub fn new(config: Configuration) -> Self {
        let affinity = config
            .affinity_thread
            .unwrap_or_else(|| thread::current().id());
        Self(Rc::new(ContextInner {
            config,
            affinity,
            events: EventStream::new(),
            next_id: Cell::new(1),
        }))
    }

    pub fn error_sink(&self) -> &dyn ErrorSink {
        &*self.0.config.error_sink
    }

    pub fn ref_watcher(&self) -> &dyn RefWatcher {
        &*self.0.config.ref_watcher
    }

    pub fn events(&self) -> &EventStream<TreeEvent> {
        &self.0.events
    }

    pub fn affinity_thread(&self) -> ThreadId {
        self.0.affinity
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        let id = self.0.next_id.get();
        self.0.next_id.set(id + 1);
        NodeId(id)
    }

    /// Reports (does not refuse) calls made off the affinity thread.
    pub fn check_affinity(&self) {
        if thread::current().id() != self.0.affinity {
            let err = TreeError::WrongThread;
            self.error_sink()
                .handle_non_fatal_error("Call must happen on the affinity thread", Some(&err));
        }
    }

    pub fn breadcrumb(&self, event: &str, child: &str, parent: &str) {
        if self.0.config.breadcrumbs {
            self.ref_watcher().log_breadcrumb(event, child, parent);
        }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.error_sink().handle_debug_message(args);
    }

    pub fn warn(&self, err: TreeError) {
        self.error_sink()
            .handle_non_fatal_warning(&err.to_string(), Some(&err));
    }
}

impl Default for TreeContext {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl fmt::Debug for TreeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeContext")
            .field("config", &self.0.config)
            .field("affinity", &self.0.affinity)
            .finish()
    }
}
