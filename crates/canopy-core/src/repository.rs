//! Repository identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote repository artifacts can be discovered in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepository {
    id: String,
    url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// A local store artifacts may have been installed into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalRepository {
    path: String,
}

impl LocalRepository {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Where a concrete version of an artifact was discovered.
///
/// The range resolver reports this per version; the collector turns it into
/// the node's effective repository list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactRepository {
    Remote(RemoteRepository),
    Local(LocalRepository),
}

impl fmt::Display for ArtifactRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRepository::Remote(repo) => repo.fmt(f),
            ArtifactRepository::Local(repo) => write!(f, "local ({})", repo.path()),
        }
    }
}
