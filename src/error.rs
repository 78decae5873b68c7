use thiserror::Error;

/// Errors setting up logging.
#[derive(Error, Debug)]
pub enum Error {
    /// Another logger was already installed in the `log` facade.
    #[error("failed to set logger: {0}")]
    SetLogger(#[from] stdlog::SetLoggerError),

    /// A default backend was already registered.
    #[error("a default backend has already been set")]
    AlreadyInitialized,

    #[error("invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },
}

/// Why a `Context` is done.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}
