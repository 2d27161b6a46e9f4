use thiserror::Error;

pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// Raised when something asks an interactor for the lifecycle event that
/// closes its current period and there is no such event.
///
/// Kept apart from [`TreeError`] so scoped work can treat it as "stop now,
/// do not retry".
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("lifecycle has not started; the interactor was never attached")]
    NotStarted,
    #[error("lifecycle has ended; the interactor is inactive")]
    Ended,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("attempting to get interactor's node before being set")]
    NodeNotSet,
    #[error("attempting to set interactor's node after it has been set")]
    NodeAlreadySet,
    #[error("the node owning this interactor has been released")]
    NodeReleased,
    #[error("node `{0}` is already attached")]
    AlreadyAttached(String),
    #[error("node `{0}` is not attached")]
    NotAttached(String),
    #[error("node `{child}` is already a child of `{parent}`")]
    AlreadyParented { child: String, parent: String },
    #[error("call must happen on the affinity thread")]
    WrongThread,
    #[error("there is already a child node with tag: {0}")]
    DuplicateTag(String),
    #[error("a node tried to detach a child that was never attached: {0}")]
    UnknownChild(String),
    #[error("attempting to set a configuration value after one has previously been set: {0}")]
    ConfigurationAlreadySet(&'static str),
    #[error("navigator host node has been released")]
    HostReleased,
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("bundle value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}
