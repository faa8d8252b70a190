//! The collection session: policies, flags, and tunables.

use crate::policy::{
    DependencyManager, DependencySelector, DependencyTraverser, Policies, VersionFilter,
};
use crate::resolution::GraphTransformer;
use canopy_core::ConfigMap;
use std::rc::Rc;

/// Config key for the exception quota. Integer; negative means unbounded.
pub const MAX_EXCEPTIONS_KEY: &str = "canopy.collector.maxExceptions";

/// Config key for the cycle quota. Integer; negative means unbounded.
pub const MAX_CYCLES_KEY: &str = "canopy.collector.maxCycles";

/// Config key for recording pre-management state on nodes. Boolean.
pub const VERBOSE_PREMANAGED_KEY: &str = "canopy.collector.verbosePremanaged";

pub(crate) const DEFAULT_MAX_EXCEPTIONS: i64 = 50;

pub(crate) const DEFAULT_MAX_CYCLES: i64 = 10;

/// Everything a `collect` call reads besides the request itself.
///
/// A session is inert data; it can be reused across any number of collect
/// calls. The policies it carries must tolerate repeated invocation within
/// one call, but are never shared between concurrent calls by the engine.
#[derive(Default, Clone)]
pub struct CollectSession {
    pub selector: Option<Rc<dyn DependencySelector>>,
    pub manager: Option<Rc<dyn DependencyManager>>,
    pub traverser: Option<Rc<dyn DependencyTraverser>>,
    pub version_filter: Option<Rc<dyn VersionFilter>>,
    pub transformer: Option<Rc<dyn GraphTransformer>>,

    /// When set, descriptors' declared repositories are ignored and every
    /// recursion step keeps the caller's repository list.
    pub ignore_artifact_descriptor_repositories: bool,

    pub config: ConfigMap,
}

impl CollectSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_exceptions(&self) -> i64 {
        self.config.get_int(MAX_EXCEPTIONS_KEY, DEFAULT_MAX_EXCEPTIONS)
    }

    pub fn max_cycles(&self) -> i64 {
        self.config.get_int(MAX_CYCLES_KEY, DEFAULT_MAX_CYCLES)
    }

    pub fn verbose_premanaged(&self) -> bool {
        self.config.get_bool(VERBOSE_PREMANAGED_KEY, false)
    }

    /// The session's policy bundle, the root of every derivation chain.
    pub fn policies(&self) -> Policies {
        Policies {
            selector: self.selector.clone(),
            manager: self.manager.clone(),
            traverser: self.traverser.clone(),
            version_filter: self.version_filter.clone(),
        }
    }
}
