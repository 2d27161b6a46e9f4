//! # Nodes, Interactors, and Bundles
//!
//! Arbor composes an application out of independently attachable units.
//! There are three main pieces:
//!
//! - [`Node`] — owns one interactor and zero or more child nodes, and
//!   mediates attach/detach, tags, and saved-state scoping for its subtree.
//! - [`Interactor`] — the business logic of one node, with an
//!   ACTIVE/INACTIVE lifecycle, back-press handling and state saving.
//! - [`Bundle`] — the recursive key/value record state is saved into.
//!
//! ## Building a tree
//!
//! ```rust
//! use arbor_core::*;
//!
//! struct Root;
//! impl Interactor for Root {}
//!
//! struct Child;
//! impl Interactor for Child {
//!     fn on_save_instance_state(&self, out: &mut Bundle) {
//!         out.put_int("scroll", 42);
//!     }
//! }
//!
//! let ctx = TreeContext::default();
//! let root = Node::new(&ctx, Root);
//! root.dispatch_attach(None).unwrap();
//!
//! let child = Node::new(&ctx, Child);
//! root.attach_child_with_tag(&child, "child").unwrap();
//!
//! let saved = root.save_state();
//! root.dispatch_detach().unwrap();
//! assert!(!child.is_attached());
//! # let _ = saved;
//! ```
//!
//! The host attaches the root exactly once, forwards back presses into
//! [`Node::handle_back_press`], and detaches the root exactly once.
//!
//! ## Scoped work
//!
//! Work tied to an interactor registers for its INACTIVE transition, either
//! through [`scoped_effect`] inside `did_become_active`, through
//! [`InteractorHandle::scope`], or by binding a [`Worker`]. The tree never
//! interrupts work any other way.
//!
//! ## Threading
//!
//! Everything here is `!Send`. Mutations are expected on the context's
//! affinity thread; calls from elsewhere are reported to the
//! [`ErrorSink`], which panics by default.

pub mod bundle;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod effects;
pub mod error;
pub mod interactor;
pub mod node;
pub mod notifier;
pub mod prelude;
pub mod presenter;
pub mod scope;
pub mod worker;


pub use bundle::*;
pub use config::*;
pub use context::*;
pub use diagnostics::*;
pub use effects::*;
pub use error::*;
pub use interactor::*;
pub use node::*;
pub use notifier::*;
pub use presenter::*;
pub use scope::*;
pub use worker::*;
