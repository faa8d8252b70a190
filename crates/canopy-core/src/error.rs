//! The shared error type for collaborator and collection failures.

use thiserror::Error;

/// An error raised by a repository-facing collaborator or recorded during
/// collection.
///
/// Variants carry the display form of the artifact involved rather than the
/// artifact itself so errors stay cheap to clone into partial results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Version range resolution failed, produced no versions, or every
    /// version was rejected by the version filter.
    #[error("version range resolution failed for {artifact}: {reason}")]
    VersionRange { artifact: String, reason: String },

    /// The artifact's descriptor could not be read.
    #[error("failed to read descriptor for {artifact}: {reason}")]
    Descriptor { artifact: String, reason: String },

    /// The graph transformer failed after collection.
    #[error("graph transformation failed: {reason}")]
    Transform { reason: String },

    /// A policy or filter callback failed for a reason of its own, outside
    /// the categories above.
    #[error("collaborator failure: {reason}")]
    Collaborator { reason: String },
}

impl RepositoryError {
    pub fn version_range(artifact: impl ToString, reason: impl Into<String>) -> Self {
        RepositoryError::VersionRange {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }

    pub fn descriptor(artifact: impl ToString, reason: impl Into<String>) -> Self {
        RepositoryError::Descriptor {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }

    pub fn transform(reason: impl Into<String>) -> Self {
        RepositoryError::Transform {
            reason: reason.into(),
        }
    }

    pub fn collaborator(reason: impl Into<String>) -> Self {
        RepositoryError::Collaborator {
            reason: reason.into(),
        }
    }
}
