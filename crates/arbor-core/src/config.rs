use std::fmt;
use std::rc::Rc;
use std::thread::ThreadId;

use crate::diagnostics::{NoopRefWatcher, RefWatcher};
use crate::error::{Result, TreeError};

/// Where the tree reports problems it does not return to a caller.
pub trait ErrorSink {
    /// Broken contract that the host may still choose to survive.
    fn handle_non_fatal_error(&self, message: &str, error: Option<&TreeError>);

    fn handle_non_fatal_warning(&self, message: &str, error: Option<&TreeError>);

    fn handle_debug_message(&self, args: fmt::Arguments<'_>);
}

/// Escalates errors to a panic, logs everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrorSink;

impl ErrorSink for DefaultErrorSink {
    fn handle_non_fatal_error(&self, message: &str, error: Option<&TreeError>) {
        match error {
            Some(e) => panic!("{message}: {e}"),
            None => panic!("{message}"),
        }
    }

    fn handle_non_fatal_warning(&self, message: &str, _error: Option<&TreeError>) {
        log::warn!("{message}");
    }

    fn handle_debug_message(&self, args: fmt::Arguments<'_>) {
        log::debug!("{args}");
    }
}

/// Logs errors instead of crashing.
#[derive(Clone, Copy, Debug, Default)]
pub struct LenientErrorSink;

impl ErrorSink for LenientErrorSink {
    fn handle_non_fatal_error(&self, message: &str, error: Option<&TreeError>) {
        match error {
            Some(e) => log::error!("{message}: {e}"),
            None => log::error!("{message}"),
        }
    }

    fn handle_non_fatal_warning(&self, message: &str, _error: Option<&TreeError>) {
        log::warn!("{message}");
    }

    fn handle_debug_message(&self, args: fmt::Arguments<'_>) {
        log::debug!("{args}");
    }
}

impl<S: ErrorSink + ?Sized> ErrorSink for Rc<S> {
    fn handle_non_fatal_error(&self, message: &str, error: Option<&TreeError>) {
        (**self).handle_non_fatal_error(message, error)
    }

    fn handle_non_fatal_warning(&self, message: &str, error: Option<&TreeError>) {
        (**self).handle_non_fatal_warning(message, error)
    }

    fn handle_debug_message(&self, args: fmt::Arguments<'_>) {
        (**self).handle_debug_message(args)
    }
}

/// Everything a tree needs from its host, fixed at context creation.
pub struct Configuration {
    pub error_sink: Rc<dyn ErrorSink>,
    pub ref_watcher: Rc<dyn RefWatcher>,
    /// Thread all tree mutations must happen on. `None` means the thread
    /// that creates the context.
    pub affinity_thread: Option<ThreadId>,
    pub breadcrumbs: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            error_sink: Rc::new(DefaultErrorSink),
            ref_watcher: Rc::new(NoopRefWatcher),
            affinity_thread: None,
            breadcrumbs: false,
        }
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("affinity_thread", &self.affinity_thread)
            .field("breadcrumbs", &self.breadcrumbs)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ConfigurationBuilder {
    error_sink: Option<Rc<dyn ErrorSink>>,
    ref_watcher: Option<Rc<dyn RefWatcher>>,
    affinity_thread: Option<ThreadId>,
    breadcrumbs: bool,
}

impl ConfigurationBuilder {
    /// The sink can be chosen once; a second call is an error.
    pub fn error_sink(mut self, sink: impl ErrorSink + 'static) -> Result<Self> {
        if self.error_sink.is_some() {
            return Err(TreeError::ConfigurationAlreadySet("error_sink"));
        }
        self.error_sink = Some(Rc::new(sink));
        Ok(self)
    }

    pub fn ref_watcher(mut self, watcher: impl RefWatcher + 'static) -> Result<Self> {
        if self.ref_watcher.is_some() {
            return Err(TreeError::ConfigurationAlreadySet("ref_watcher"));
        }
        self.ref_watcher = Some(Rc::new(watcher));
        Ok(self)
    }

    pub fn affinity_thread(mut self, thread: ThreadId) -> Self {
        self.affinity_thread = Some(thread);
        self
    }

    pub fn breadcrumbs(mut self, enabled: bool) -> Self {
        self.breadcrumbs = enabled;
        self
    }

    pub fn build(self) -> Configuration {
        let defaults = Configuration::default();
        Configuration {
            error_sink: self.error_sink.unwrap_or(defaults.error_sink),
            ref_watcher: self.ref_watcher.unwrap_or(defaults.ref_watcher),
            affinity_thread: self.affinity_thread,
            breadcrumbs: self.breadcrumbs,
        }
    }
}
