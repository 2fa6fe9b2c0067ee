//! Error taxonomy of the data-access layer.
//!
//! Every controller operation settles into one of these variants; callers
//! inspect them through the controller state rather than through panics or
//! propagated results.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The capability check for the requested action failed.
    #[error("permission denied: cannot {action} {subject}")]
    PermissionDenied { action: String, subject: String },

    /// An external caller has no organization to scope an
    /// organization-scoped collection by.
    #[error("tenant unresolved: no organization to scope collection '{collection}'")]
    TenantUnresolved { collection: String },

    /// The store reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("record '{id}' not found in collection '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("unknown subject type '{0}'")]
    UnknownSubject(String),
}

impl AccessError {
    pub fn permission_denied(action: &str, subject: &str) -> Self {
        Self::PermissionDenied {
            action: action.to_owned(),
            subject: subject.to_owned(),
        }
    }

    pub fn tenant_unresolved(collection: &str) -> Self {
        Self::TenantUnresolved {
            collection: collection.to_owned(),
        }
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_owned(),
            id: id.to_owned(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
