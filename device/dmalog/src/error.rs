use thiserror::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum Error {
    /// The rendered message does not fit in the free part of the queue. The message is dropped
    /// whole; nothing is written.
    #[error("log queue has {available} bytes free, message needs {needed}")]
    InsufficientSpace { needed: usize, available: usize },
    #[error("logger used before log_init")]
    Uninitialized,
    #[error("log_init called on a logger that is already running")]
    AlreadyInitialized,
    /// The engine may still be reading an armed window, so the queue can't be cleared yet.
    #[error("a transfer is still in flight")]
    TransferInFlight,
    /// The logger was called from code already running inside one of its own calls, e.g. a
    /// `Display` argument that logs. The nested message is dropped.
    #[error("logger re-entered from inside its own critical section")]
    Reentrant,
}
