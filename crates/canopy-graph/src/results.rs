//! Bounded accumulation of errors and cycles during the walk.

use crate::request::{CollectResult, DependencyCycle};
use crate::session::CollectSession;
use crate::stack::NodeStack;
use canopy_core::{Dependency, RepositoryError};
use tracing::{debug, warn};

/// Collects errors and cycles as the walk progresses.
///
/// Both lists are bounded by the session quotas; entries past a quota are
/// dropped without aborting the walk. The first recorded error also fixes
/// the `error_path`, the root-to-failure chain cited by the terminal error.
pub(crate) struct Results {
    result: CollectResult,
    max_exceptions: i64,
    max_cycles: i64,
    pub(crate) error_path: Option<String>,
}

impl Results {
    pub(crate) fn new(result: CollectResult, session: &CollectSession) -> Self {
        Self {
            result,
            max_exceptions: session.max_exceptions(),
            max_cycles: session.max_cycles(),
            error_path: None,
        }
    }

    pub(crate) fn into_result(self) -> CollectResult {
        self.result
    }

    /// Records an error against the current ancestor path.
    pub(crate) fn add_exception(
        &mut self,
        dependency: &Dependency,
        exception: RepositoryError,
        nodes: &NodeStack,
    ) {
        if self.max_exceptions < 0 || (self.result.exceptions().len() as i64) < self.max_exceptions
        {
            warn!(dependency = %dependency, error = %exception, "recording collection error");
            self.result.add_exception(exception);
            if self.error_path.is_none() {
                self.error_path = Some(build_error_path(nodes, dependency));
            }
        }
    }

    /// Records a cycle closing at `dependency`, whose coordinate-equal
    /// ancestor sits at `cycle_entry` on the stack.
    pub(crate) fn add_cycle(
        &mut self,
        nodes: &NodeStack,
        cycle_entry: usize,
        dependency: &Dependency,
    ) {
        if self.max_cycles < 0 || (self.result.cycles().len() as i64) < self.max_cycles {
            let path = (cycle_entry..nodes.len())
                .filter_map(|i| nodes.get(i).borrow().artifact().cloned())
                .collect();
            let cycle = DependencyCycle::new(path, dependency.clone());
            debug!(cycle = %cycle, "dependency cycle detected");
            self.result.add_cycle(cycle);
        }
    }
}

fn build_error_path(nodes: &NodeStack, dependency: &Dependency) -> String {
    let mut path = String::new();
    for i in 0..nodes.len() {
        if let Some(dep) = nodes.get(i).borrow().dependency() {
            if !path.is_empty() {
                path.push_str(" -> ");
            }
            path.push_str(&dep.artifact().to_string());
        }
    }
    if !path.is_empty() {
        path.push_str(" -> ");
    }
    path.push_str(&dependency.artifact().to_string());
    path
}
