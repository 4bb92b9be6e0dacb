use thiserror::Error;

/// Infrastructural failure that aborts a whole batch call
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("State error: {0}")]
    State(#[from] kestrel_state::StateError),

    #[error("Core error: {0}")]
    Core(#[from] kestrel_core::CoreError),
}
