/// Engine and collaborator errors.

use thiserror::Error;

use crate::tab_data::TabId;

/// Failure reported by a host collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("host rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("permission not granted: {0}")]
    PermissionDenied(String),

    #[error("stale reference: {0}")]
    StaleReference(String),

    #[error("urls digest does not match the last dragged tabs")]
    DigestMismatch,

    #[error("{failed} of {total} items failed")]
    PartialBatchFailure { failed: usize, total: usize },

    #[error("descendant {tab:?} could not be moved after {attempts} attempts")]
    SubtreeMoveFailure { tab: TabId, attempts: u32 },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl EngineError {
    /// Expected outcomes that only abort the current step
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            EngineError::StaleReference(_)
                | EngineError::DigestMismatch
                | EngineError::Host(HostError::NotFound(_))
        )
    }

    /// Log at the level the failure deserves; handlers never rethrow
    pub fn log(&self, context: &str) {
        if self.is_soft() {
            log::debug!("{}: {}", context, self);
        } else if matches!(self, EngineError::SubtreeMoveFailure { .. }) {
            log::error!("{}: {}", context, self);
        } else {
            log::warn!("{}: {}", context, self);
        }
    }
}
