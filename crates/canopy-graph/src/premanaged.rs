//! Application of dependency management to a raw dependency.

use crate::node::{managed, DependencyNode, PremanagedInfo};
use crate::policy::DependencyManager;
use canopy_core::Dependency;
use std::rc::Rc;

/// A dependency after management, together with what management changed.
///
/// Overrides apply in a fixed order: version (unless disabled), properties,
/// scope, optional, exclusions. The pre-override value of version, scope,
/// and optional is captured iff that field was overridden; [`apply_to`]
/// writes the managed bits onto a node and, when `verbose` was set at
/// creation, attaches the captured originals for introspection.
///
/// [`apply_to`]: PremanagedDependency::apply_to
#[derive(Debug, Clone)]
pub struct PremanagedDependency {
    premanaged_version: Option<String>,
    premanaged_scope: Option<String>,
    premanaged_optional: Option<bool>,
    managed_bits: u8,
    managed_dependency: Dependency,
    verbose: bool,
}

impl PremanagedDependency {
    pub fn create(
        manager: Option<&Rc<dyn DependencyManager>>,
        dependency: Dependency,
        disable_version_management: bool,
        verbose: bool,
    ) -> Self {
        let management = manager.and_then(|m| m.manage(&dependency));

        let mut managed_bits = 0u8;
        let mut premanaged_version = None;
        let mut premanaged_scope = None;
        let mut premanaged_optional = None;
        let mut dependency = dependency;

        if let Some(management) = management {
            if let Some(version) = &management.version {
                if !disable_version_management {
                    let artifact = dependency.artifact();
                    premanaged_version = Some(artifact.version().to_string());
                    dependency = dependency.set_artifact(artifact.set_version(version));
                    managed_bits |= managed::VERSION;
                }
            }
            if let Some(properties) = management.properties {
                let artifact = dependency.artifact();
                dependency = dependency.set_artifact(artifact.set_properties(properties));
                managed_bits |= managed::PROPERTIES;
            }
            if let Some(scope) = management.scope {
                premanaged_scope = Some(dependency.scope().to_string());
                dependency = dependency.set_scope(scope);
                managed_bits |= managed::SCOPE;
            }
            if let Some(optional) = management.optional {
                premanaged_optional = dependency.optional();
                dependency = dependency.set_optional(Some(optional));
                managed_bits |= managed::OPTIONAL;
            }
            if let Some(exclusions) = management.exclusions {
                dependency = dependency.set_exclusions(exclusions);
                managed_bits |= managed::EXCLUSIONS;
            }
        }

        Self {
            premanaged_version,
            premanaged_scope,
            premanaged_optional,
            managed_bits,
            managed_dependency: dependency,
            verbose,
        }
    }

    /// The dependency with all applicable overrides applied.
    pub fn managed_dependency(&self) -> &Dependency {
        &self.managed_dependency
    }

    pub fn managed_bits(&self) -> u8 {
        self.managed_bits
    }

    /// Writes the managed bits onto the node, plus the pre-management
    /// originals when verbose recording is on.
    pub fn apply_to(&self, node: &mut DependencyNode) {
        node.set_managed_bits(self.managed_bits);
        if self.verbose {
            node.set_premanaged(PremanagedInfo {
                version: self.premanaged_version.clone(),
                scope: self.premanaged_scope.clone(),
                optional: self.premanaged_optional,
            });
        }
    }
}
