use std::fmt;
use std::sync::Arc;

use crate::backend::Backend;
use crate::prefix::Prefix;
use crate::severity::{Level, Severity};

/**
A logger that tags every line it writes with a prefix.

The prefix is a stack of segments that are concatenated without separators.
Deriving a logger with `add_prefix`, `pop_prefix` or `at_level` never changes the
logger it was derived from, and loggers are cheap to clone, so they can be
handed to other threads freely.

Info, warning and error lines are only written when the logger's verbosity gate
is open. Fatal lines are always written.
*/
#[derive(Clone)]
pub struct Logger {
    backend: Arc<dyn Backend>,
    enabled: bool,
    prefix: Prefix,
}

impl Logger {
    /**
    Create a logger with no prefix over the default backend.

    See `set_default_backend` and `init` for configuring the default backend.
    */
    pub fn new() -> Self {
        Logger::with_backend(crate::default_backend())
    }

    /// Create a logger with no prefix over the given backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        let enabled = backend.enabled(backend.verbosity());

        Logger {
            backend,
            enabled,
            prefix: Prefix::default(),
        }
    }

    /**
    Create a logger with a single prefix segment over the default backend.

    Use `format_args!` to build the prefix from values:

    ```
    # use log_prefix::Logger;
    let logger = Logger::new_with_prefix(format_args!("[request {}] ", 42));

    assert_eq!("[request 42] ", logger.prefix());
    ```
    */
    pub fn new_with_prefix(prefix: impl fmt::Display) -> Self {
        Logger::new().add_prefix(prefix)
    }

    /**
    Derive a logger with `segment` appended to this logger's prefix.

    This logger isn't changed, so it can be used to derive other branches.
    */
    #[must_use]
    pub fn add_prefix(&self, segment: impl fmt::Display) -> Self {
        Logger {
            prefix: self.prefix.push(&crate::backend::sprintf(format_args!("{}", segment))),
            ..self.clone()
        }
    }

    /**
    Append `segment` to this logger's prefix in place.

    Clones of this logger made before the push keep their prefix.
    */
    pub fn push_prefix(&mut self, segment: impl fmt::Display) -> &mut Self {
        self.prefix = self.prefix.push(&crate::backend::sprintf(format_args!("{}", segment)));
        self
    }

    /**
    Derive a logger without the most recently appended prefix segment.

    Popping a logger without a prefix gives an equivalent logger.
    */
    #[must_use]
    pub fn pop_prefix(&self) -> Self {
        Logger {
            prefix: self.prefix.pop(),
            ..self.clone()
        }
    }

    /**
    Derive a logger that's gated at `level`.

    The gate is computed from the backend's verbosity now, so changing the
    verbosity later doesn't affect loggers that have already been derived.
    */
    #[must_use]
    pub fn at_level(&self, level: impl Into<Level>) -> Self {
        Logger {
            enabled: self.backend.enabled(level.into()),
            ..self.clone()
        }
    }

    /// The concatenation of all prefix segments.
    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    /// The prefix segments in the order they were added.
    pub fn prefix_segments(&self) -> Vec<&str> {
        self.prefix.segments()
    }

    /// Whether info, warning and error lines will be written.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The backend lines are written to.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /**
    Write an info line.

    The prefix and values are concatenated without any separator, so
    `info(&[&1, &2])` writes `12`. Use `infoln` to separate values with spaces.
    */
    pub fn info(&self, args: &[&dyn fmt::Display]) {
        if self.enabled {
            self.print(Severity::Info, args)
        }
    }

    /// Write a info line with the prefix and values separated by spaces.
    pub fn infoln(&self, args: &[&dyn fmt::Display]) {
        if self.enabled {
            self.println(Severity::Info, args)
        }
    }

    /// Write a formatted info line after the prefix and a space.
    pub fn infof(&self, args: fmt::Arguments) {
        if self.enabled {
            self.printf(Severity::Info, args)
        }
    }

    /// Write a warning line, concatenating the prefix and values without separators.
    pub fn warning(&self, args: &[&dyn fmt::Display]) {
        if self.enabled {
            self.print(Severity::Warning, args)
        }
    }

    /// Write a warning line with the prefix and values separated by spaces.
    pub fn warningln(&self, args: &[&dyn fmt::Display]) {
        if self.enabled {
            self.println(Severity::Warning, args)
        }
    }

    /// Write a formatted warning line after the prefix and a space.
    pub fn warningf(&self, args: fmt::Arguments) {
        if self.enabled {
            self.printf(Severity::Warning, args)
        }
    }

    /// Write a error line, concatenating the prefix and values without separators.
    pub fn error(&self, args: &[&dyn fmt::Display]) {
        if self.enabled {
            self.print(Severity::Error, args)
        }
    }

    /// Write a error line with the prefix and values separated by spaces.
    pub fn errorln(&self, args: &[&dyn fmt::Display]) {
        if self.enabled {
            self.println(Severity::Error, args)
        }
    }

    /// Write a formatted error line after the prefix and a space.
    pub fn errorf(&self, args: fmt::Arguments) {
        if self.enabled {
            self.printf(Severity::Error, args)
        }
    }

    /**
    Write a fatal line.

    Fatal lines ignore the verbosity gate. Depending on the backend this may
    terminate the process.
    */
    pub fn fatal(&self, args: &[&dyn fmt::Display]) {
        self.print(Severity::Fatal, args)
    }

    /// Write a fatal line with the prefix and values separated by spaces.
    pub fn fatalln(&self, args: &[&dyn fmt::Display]) {
        self.println(Severity::Fatal, args)
    }

    /// Write a formatted fatal line after the prefix and a space.
    pub fn fatalf(&self, args: fmt::Arguments) {
        self.printf(Severity::Fatal, args)
    }

    fn print(&self, severity: Severity, args: &[&dyn fmt::Display]) {
        self.with_prefix(args, |args| self.backend.print(severity, args))
    }

    fn println(&self, severity: Severity, args: &[&dyn fmt::Display]) {
        self.with_prefix(args, |args| self.backend.println(severity, args))
    }

    fn printf(&self, severity: Severity, args: fmt::Arguments) {
        if self.prefix.is_empty() {
            self.backend.printf(severity, args)
        } else {
            self.backend
                .printf(severity, format_args!("{} {}", self.prefix.as_str(), args))
        }
    }

    // Run `f` with the prefix as the leading value, if there is one
    fn with_prefix<F>(&self, args: &[&dyn fmt::Display], f: F)
    where
        F: FnOnce(&[&dyn fmt::Display]),
    {
        if self.prefix.is_empty() {
            return f(args);
        }

        let prefix = self.prefix.as_str();

        let mut extended: Vec<&dyn fmt::Display> = Vec::with_capacity(args.len() + 1);
        extended.push(&prefix);
        extended.extend_from_slice(args);

        f(&extended)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Logger")
            .field("prefix", &self.prefix)
            .field("enabled", &self.enabled)
            .finish()
    }
}
