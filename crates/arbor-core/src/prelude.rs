pub use crate::bundle::{Bundle, KEY_CHILDREN, KEY_INTERACTOR};
pub use crate::config::{Configuration, DefaultErrorSink, ErrorSink, LenientErrorSink};
pub use crate::context::{TreeContext, TreeEvent};
pub use crate::effects::Dispose;
pub use crate::error::{LifecycleError, Result, TreeError};
pub use crate::interactor::{Interactor, InteractorEvent, InteractorHandle};
pub use crate::node::{Component, Node, NodeHooks, WeakNode};
pub use crate::presenter::{Presenter, PresenterEvent};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::worker::{Worker, WorkerBinder, WorkerUnbinder};
