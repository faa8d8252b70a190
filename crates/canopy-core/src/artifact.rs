//! Artifact identity.
//!
//! An artifact is identified by the tuple (group, id, classifier, extension,
//! version) plus a free-form property map. Two artifacts with the same group,
//! id, classifier, and extension refer to the same logical component
//! regardless of version; that relation is what cycle detection keys on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known artifact property keys.
pub mod properties {
    /// Marks an artifact that exists only on the local filesystem and has no
    /// resolvable remote descriptor.
    pub const LOCAL_PATH: &str = "localPath";
}

/// An identified build output.
///
/// Artifacts are immutable; the `set_*` methods return a new value with the
/// requested field replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    group: String,
    id: String,
    classifier: String,
    extension: String,
    version: String,
    properties: BTreeMap<String, String>,
}

impl Artifact {
    /// Creates an artifact with an empty classifier and extension.
    pub fn new(group: impl Into<String>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
            classifier: String::new(),
            extension: String::new(),
            version: version.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Returns the artifact with the given classifier.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    /// Returns the artifact with the given extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Returns the artifact with the given property set.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The declared version. For a dependency that has not been resolved yet
    /// this may be a range expression rather than a concrete version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Looks up a property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns a copy of this artifact with a different version.
    pub fn set_version(&self, version: impl Into<String>) -> Self {
        let mut a = self.clone();
        a.version = version.into();
        a
    }

    /// Returns a copy of this artifact with the property map replaced.
    pub fn set_properties(&self, properties: BTreeMap<String, String>) -> Self {
        let mut a = self.clone();
        a.properties = properties;
        a
    }

    /// True when this artifact names the same logical component as `other`,
    /// ignoring version and properties.
    pub fn same_coordinates(&self, other: &Artifact) -> bool {
        self.id == other.id
            && self.group == other.group
            && self.classifier == other.classifier
            && self.extension == other.extension
    }

    /// The version-less coordinate key, used to deduplicate dependency lists.
    pub fn coordinate_id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group, self.id, self.classifier, self.extension
        )
    }
}

impl fmt::Display for Artifact {
    /// Renders `group:id:extension[:classifier]:version`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}
