//! Error types for the holographic effect pipeline.
//!
//! None of these are fatal. The public session methods log them and return;
//! the `try_*` variants hand them to callers that care about the outcome.

use tracing::{debug, warn};

use crate::graph::GraphError;
use crate::session::EffectState;

/// Errors raised while applying, updating or removing the effect
#[derive(Debug, thiserror::Error)]
pub enum HologramError {
    #[error("no rendering context available")]
    EnvironmentUnavailable,

    #[error("avatar has no render graph root yet")]
    AvatarNotReady,

    #[error("nothing to restore, no materials are patched")]
    RestoreSkipped,

    #[error("holographic effect is not active")]
    NotActive,

    #[error("{operation} rejected while the session is {state:?}")]
    Reentrant {
        operation: &'static str,
        state: EffectState,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("invalid effect parameters: {0}")]
    InvalidParameters(String),
}

impl HologramError {
    /// Expected no-op outcomes, logged at debug rather than warn
    pub fn is_benign(&self) -> bool {
        matches!(self, HologramError::RestoreSkipped | HologramError::NotActive)
    }

    pub(crate) fn report(&self, operation: &str) {
        if self.is_benign() {
            debug!("{}: {}", operation, self);
        } else {
            warn!("{}: {}", operation, self);
        }
    }
}
