/*!
Prefixed logging.

This crate lets you derive loggers that tag every line they write with a prefix,
gate them on a verbosity level, and carry them through request contexts so
deeply nested code logs with the same prefix without passing the logger along.
It writes through `log` by default.

- Call `init` to install a logger and set up the default backend.
- Call `Logger::new_with_prefix` to create a logger, and `add_prefix` to derive children.
- Call `Logger::attach` and `Logger::from_context` to carry a logger in a `Context`.

# Examples

```
# use log_prefix::{Context, Logger};
fn handle(ctxt: &Context) {
    let logger = Logger::from_context(ctxt).add_prefix("[handle]");

    logger.infoln(&[&"handling a request for", &"Timmy"]);
    logger.at_level(2).infof(format_args!("{} rows", 42));
}

let logger = Logger::new_with_prefix(format_args!("[request {}]", 42));
let ctxt = logger.attach(&Context::background());

handle(&ctxt);
```

With the text format that will output:

```text
I2018-02-12T06:31:58Z] [request 42][handle] handling a request for Timmy
```
*/

#[macro_use]
extern crate log as stdlog;
#[macro_use]
extern crate serde_derive;
#[cfg_attr(test, macro_use)]
extern crate serde_json;

mod backend;
mod config;
mod ctxt;
mod error;
pub mod format;
mod logger;
mod prefix;
mod severity;

use std::sync::{Arc, OnceLock};

use stdlog::LevelFilter;

pub use self::backend::{
    sprint, sprintf, sprintln, Backend, GlobalLog, LogBackend, MemoryBackend, Verbosity,
    FATAL_EXIT_CODE, FORMAT_ERROR_MARKER,
};
pub use self::config::{Config, Format};
pub use self::ctxt::{CancelHandle, Context, Done, Key};
pub use self::error::{ContextError, Error};
pub use self::logger::Logger;
pub use self::severity::{Level, Severity};

static DEFAULT_BACKEND: OnceLock<Arc<dyn Backend>> = OnceLock::new();

/**
Set the backend used by `Logger::new` and by `Logger::from_context` when a
context doesn't carry a logger.

The default backend can only be set once, and only before it's first used.
*/
pub fn set_default_backend(backend: Arc<dyn Backend>) -> Result<(), Error> {
    DEFAULT_BACKEND
        .set(backend)
        .map_err(|_| Error::AlreadyInitialized)
}

/**
The default backend.

If none has been set then a `LogBackend` over the `log` facade is used,
configured from the environment.
*/
pub fn default_backend() -> Arc<dyn Backend> {
    DEFAULT_BACKEND
        .get_or_init(|| {
            let config = Config::from_env().unwrap_or_default();

            Arc::new(LogBackend::global(config.verbosity).exit_on_fatal(config.exit_on_fatal))
        })
        .clone()
}

/**
Install an `env_logger` logger and make a `LogBackend` over it the default backend.

This fails if a logger has already been installed in the `log` facade, or if
the default backend has already been set or used.
*/
pub fn init(config: Config) -> Result<Arc<LogBackend>, Error> {
    // Check before installing anything so a failure leaves the `log` facade untouched
    if DEFAULT_BACKEND.get().is_some() {
        return Err(Error::AlreadyInitialized);
    }

    let mut builder = env_logger::Builder::new();

    builder
        .filter_level(LevelFilter::Info)
        .format(format::formatter(config.format));

    if let Some(ref filter) = config.filter {
        builder.parse_filters(filter);
    }

    let logger = builder.build();
    let max_level = logger.filter();

    stdlog::set_boxed_logger(Box::new(logger))?;
    stdlog::set_max_level(max_level);

    let backend = Arc::new(
        LogBackend::global(config.verbosity).exit_on_fatal(config.exit_on_fatal),
    );
    set_default_backend(backend.clone())?;

    debug!(
        "initialized prefixed logging at verbosity {} ({:?})",
        config.verbosity, config.format
    );

    Ok(backend)
}

/**
Write a formatted info line through a logger.

```
# #[macro_use] extern crate log_prefix;
# use log_prefix::Logger;
# fn main() {
let logger = Logger::new_with_prefix("[worker]");
infof!(logger, "processed {} items", 3);
# }
```
*/
#[macro_export]
macro_rules! infof {
    ($logger:expr, $($arg:tt)+) => {
        $logger.infof(format_args!($($arg)+))
    };
}

/// Write a formatted warning line through a logger.
#[macro_export]
macro_rules! warningf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.warningf(format_args!($($arg)+))
    };
}

/// Write a formatted error line through a logger.
#[macro_export]
macro_rules! errorf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.errorf(format_args!($($arg)+))
    };
}

/// Write a formatted fatal line through a logger, regardless of its verbosity gate.
#[macro_export]
macro_rules! fatalf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.fatalf(format_args!($($arg)+))
    };
}
