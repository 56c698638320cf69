//! Engine command errors.

use sq_core::SessionId;
use sq_db::StoreError;
use thiserror::Error;

/// Why a command did not take effect.
///
/// Every variant is local to one command; the engine stays usable afterwards.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store call failed. Nothing was changed and no signal fired.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
    /// A session is already being tracked.
    #[error("session {id} is already in progress")]
    SessionInProgress { id: SessionId },
    /// Only stopped sessions can be rated.
    #[error("session {id} is still in progress and cannot be rated")]
    SessionNotStopped { id: SessionId },
    /// The engine has been shut down.
    #[error("engine has shut down")]
    Closed,
}
