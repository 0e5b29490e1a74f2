use super::{BuildHandle, CommitId, MergeOutcome, PickOutcome, RepositoryHost};
use crate::engine::UpdateCandidate;
use crate::error::Result;
use crate::registry::{Branch, Module};
use crate::utils::console;
use crate::version::Version;

pub const SIMULATED_COMMIT: &str = "simulated";

/// Passes read-only calls through to the wrapped host and turns every
/// mutating call into a logged no-op that reports success.
pub struct SimulatedHost<'a> {
    inner: &'a dyn RepositoryHost,
}

impl<'a> SimulatedHost<'a> {
    pub fn new(inner: &'a dyn RepositoryHost) -> Self {
        Self { inner }
    }
}

impl RepositoryHost for SimulatedHost<'_> {
    fn fetch_and_reset(&self, module: &Module, branch: &Branch) -> Result<()> {
        self.inner.fetch_and_reset(module, branch)
    }

    fn current_manifest_version(&self, module: &Module, branch: &Branch) -> Result<Version> {
        self.inner.current_manifest_version(module, branch)
    }

    fn installed_version(&self, module: &Module) -> Result<Option<Version>> {
        self.inner.installed_version(module)
    }

    fn apply_update(
        &self,
        module: &Module,
        branch: &Branch,
        candidate: &UpdateCandidate,
    ) -> Result<CommitId> {
        console::debug(format!(
            "[simulate] would update {} on {} to {}",
            module.package, branch.name, candidate.proposed
        ));
        Ok(CommitId(SIMULATED_COMMIT.to_string()))
    }

    fn push(&self, module: &Module, branch: &Branch) -> Result<()> {
        console::debug(format!(
            "[simulate] not pushing {} to {}",
            module.package, branch.name
        ));
        Ok(())
    }

    fn fast_forward_merge(
        &self,
        module: &Module,
        source: &Branch,
        head: &Branch,
    ) -> Result<MergeOutcome> {
        console::debug(format!(
            "[simulate] would merge {} {} into {}",
            module.package, source.name, head.name
        ));
        Ok(MergeOutcome::Merged)
    }

    fn cherry_pick(
        &self,
        module: &Module,
        commit: &CommitId,
        head: &Branch,
    ) -> Result<PickOutcome> {
        console::debug(format!(
            "[simulate] would cherry-pick {commit} of {} onto {}",
            module.package, head.name
        ));
        Ok(PickOutcome::Applied)
    }

    fn trigger_build(
        &self,
        module: &Module,
        branch: &Branch,
        side_tag: Option<&str>,
    ) -> Result<BuildHandle> {
        console::debug(format!(
            "[simulate] would build {} on {}{}",
            module.package,
            branch.name,
            side_tag.map(|tag| format!(" in {tag}")).unwrap_or_default()
        ));
        Ok(BuildHandle {
            branch: branch.name.clone(),
            task: None,
        })
    }
}
