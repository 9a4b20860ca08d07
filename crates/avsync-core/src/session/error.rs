//! Session error types

use thiserror::Error;

/// Errors starting or finishing a playback session
#[derive(Error, Debug)]
pub enum SessionError {
    /// `start` was called on a session that is already running
    #[error("Playback session already started")]
    AlreadyStarted,

    /// The presentation thread could not be created
    #[error("Failed to spawn presentation thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// The presentation thread panicked (usually inside the presenter)
    #[error("Presentation thread panicked")]
    SchedulerPanicked,
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
