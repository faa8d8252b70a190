//! Dependencies: artifacts annotated with scope, optionality, and exclusions.

use crate::artifact::Artifact;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Excludes a (group, id) pair from a dependency's transitive closure.
///
/// Either component may be the wildcard `"*"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exclusion {
    group: String,
    id: String,
}

impl Exclusion {
    pub fn new(group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when this exclusion applies to the given artifact.
    pub fn matches(&self, artifact: &Artifact) -> bool {
        (self.group == "*" || self.group == artifact.group())
            && (self.id == "*" || self.id == artifact.id())
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.id)
    }
}

/// An artifact reference with a scope, a tri-state optional flag, and a set
/// of exclusions.
///
/// The artifact sits behind a shared handle so that interning equal artifacts
/// across a large graph actually shares memory. Dependencies are immutable;
/// every `set_*` method returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    artifact: Rc<Artifact>,
    scope: String,
    optional: Option<bool>,
    exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(artifact: Artifact, scope: impl Into<String>) -> Self {
        Self {
            artifact: Rc::new(artifact),
            scope: scope.into(),
            optional: None,
            exclusions: Vec::new(),
        }
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// The shared artifact handle, for interning.
    pub fn shared_artifact(&self) -> &Rc<Artifact> {
        &self.artifact
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The raw tri-state flag: `None` means the descriptor left it unset.
    pub fn optional(&self) -> Option<bool> {
        self.optional
    }

    /// The effective flag; unset counts as not optional.
    pub fn is_optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    pub fn set_artifact(&self, artifact: Artifact) -> Self {
        self.set_shared_artifact(Rc::new(artifact))
    }

    pub fn set_shared_artifact(&self, artifact: Rc<Artifact>) -> Self {
        let mut d = self.clone();
        d.artifact = artifact;
        d
    }

    pub fn set_scope(&self, scope: impl Into<String>) -> Self {
        let mut d = self.clone();
        d.scope = scope.into();
        d
    }

    pub fn set_optional(&self, optional: Option<bool>) -> Self {
        let mut d = self.clone();
        d.optional = optional;
        d
    }

    pub fn set_exclusions(&self, exclusions: Vec<Exclusion>) -> Self {
        let mut d = self.clone();
        d.exclusions = exclusions;
        d
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.artifact, self.scope)?;
        if self.is_optional() {
            write!(f, ", optional")?;
        }
        write!(f, ")")
    }
}
