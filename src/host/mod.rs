// Repository host - everything that touches the package checkout, the
// dist-git remote or the build system.
//
// - RepositoryHost: the operations a session needs from the host
// - DistGitHost: real implementation driving git, fedpkg and rpmdev tools
// - SimulatedHost: wrapper that turns every mutating call into a no-op
// - SessionLock: keeps two runs from sharing one checkout cache
use crate::engine::UpdateCandidate;
use crate::error::Result;
use crate::registry::{Branch, Module};
use crate::version::Version;
use std::fmt;

pub mod distgit;
pub mod lock;
pub mod simulate;
pub mod specfile;

#[cfg(test)]
pub mod mock;

pub use distgit::DistGitHost;
pub use lock::SessionLock;
pub use simulate::SimulatedHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitId(pub String);

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A build submitted to the build system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildHandle {
    pub branch: String,
    pub task: Option<String>,
}

impl fmt::Display for BuildHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.task {
            Some(task) => write!(f, "{} (task {task})", self.branch),
            None => f.write_str(&self.branch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged,
    /// The target has commits the source does not.
    Diverged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    Applied,
    Conflict,
}

/// Operations on the package repository and build system. Every call is
/// synchronous and may fail; nothing here is retried.
pub trait RepositoryHost {
    /// Bring the local checkout of `branch` in line with its remote,
    /// discarding any local residue.
    fn fetch_and_reset(&self, module: &Module, branch: &Branch) -> Result<()>;

    fn current_manifest_version(&self, module: &Module, branch: &Branch) -> Result<Version>;

    /// Version of the package installed on this machine, `None` when it is
    /// not installed.
    fn installed_version(&self, module: &Module) -> Result<Option<Version>>;

    /// Edit the manifest, verify it builds locally and commit.
    fn apply_update(
        &self,
        module: &Module,
        branch: &Branch,
        candidate: &UpdateCandidate,
    ) -> Result<CommitId>;

    fn push(&self, module: &Module, branch: &Branch) -> Result<()>;

    fn fast_forward_merge(
        &self,
        module: &Module,
        source: &Branch,
        head: &Branch,
    ) -> Result<MergeOutcome>;

    fn cherry_pick(&self, module: &Module, commit: &CommitId, head: &Branch)
    -> Result<PickOutcome>;

    fn trigger_build(
        &self,
        module: &Module,
        branch: &Branch,
        side_tag: Option<&str>,
    ) -> Result<BuildHandle>;
}
