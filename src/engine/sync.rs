use crate::host::{BuildHandle, CommitId, MergeOutcome, PickOutcome, RepositoryHost};
use crate::registry::{Branch, Module};
use crate::utils::console;
use std::fmt;

/// Result of propagating an update to the head branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    FastForwarded,
    CherryPicked,
    /// Propagation given up; the selected-branch update stands.
    Abandoned(String),
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::FastForwarded => f.write_str("fast-forwarded"),
            SyncOutcome::CherryPicked => f.write_str("cherry-picked"),
            SyncOutcome::Abandoned(reason) => write!(f, "abandoned ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadBuild {
    NotRequested,
    Triggered(BuildHandle),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    pub outcome: SyncOutcome,
    pub head_build: HeadBuild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landed {
    FastForwarded,
    CherryPicked,
}

impl From<Landed> for SyncOutcome {
    fn from(landed: Landed) -> Self {
        match landed {
            Landed::FastForwarded => SyncOutcome::FastForwarded,
            Landed::CherryPicked => SyncOutcome::CherryPicked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SyncState {
    Reset,
    FastForward,
    CherryPick,
    Publish(Landed),
    Done(SyncOutcome),
}

/// Lands a change already pushed on a selected branch onto the head branch:
/// fast-forward first, cherry-pick when the head has diverged, abandon when
/// the cherry-pick conflicts.
pub struct BranchSync<'a> {
    host: &'a dyn RepositoryHost,
    head: &'a Branch,
    side_tag: Option<&'a str>,
    build: bool,
}

impl<'a> BranchSync<'a> {
    pub fn new(
        host: &'a dyn RepositoryHost,
        head: &'a Branch,
        side_tag: Option<&'a str>,
        build: bool,
    ) -> Self {
        Self {
            host,
            head,
            side_tag,
            build,
        }
    }

    pub fn run(&self, module: &Module, selected: &Branch, commit: &CommitId) -> SyncRecord {
        let mut state = SyncState::Reset;
        let outcome = loop {
            state = match state {
                SyncState::Done(outcome) => break outcome,
                other => self.step(other, module, selected, commit),
            };
        };

        let head_build = match outcome {
            SyncOutcome::FastForwarded | SyncOutcome::CherryPicked if self.build => {
                match self.host.trigger_build(module, self.head, self.side_tag) {
                    Ok(handle) => HeadBuild::Triggered(handle),
                    Err(e) => {
                        console::fail(format!(
                            "{}: build on {} failed: {e}",
                            module.name, self.head.name
                        ));
                        HeadBuild::Failed(e.to_string())
                    }
                }
            }
            _ => HeadBuild::NotRequested,
        };

        SyncRecord {
            outcome,
            head_build,
        }
    }

    fn step(
        &self,
        state: SyncState,
        module: &Module,
        selected: &Branch,
        commit: &CommitId,
    ) -> SyncState {
        let head = self.head;
        match state {
            SyncState::Reset => match self.host.fetch_and_reset(module, head) {
                Ok(()) => SyncState::FastForward,
                Err(e) => abandon(format!("could not reset {}: {e}", head.name)),
            },
            SyncState::FastForward => match self.host.fast_forward_merge(module, selected, head) {
                Ok(MergeOutcome::Merged) => SyncState::Publish(Landed::FastForwarded),
                Ok(MergeOutcome::Diverged) => {
                    console::info(format!("{}: no fast-forward merge possible", module.name));
                    SyncState::CherryPick
                }
                Err(e) => abandon(format!("fast-forward failed: {e}")),
            },
            SyncState::CherryPick => match self.host.cherry_pick(module, commit, head) {
                Ok(PickOutcome::Applied) => SyncState::Publish(Landed::CherryPicked),
                Ok(PickOutcome::Conflict) => abandon("cherry-pick conflict".to_string()),
                Err(e) => abandon(format!("cherry-pick failed: {e}")),
            },
            SyncState::Publish(landed) => match self.host.push(module, head) {
                Ok(()) => SyncState::Done(landed.into()),
                Err(e) => abandon(format!("push to {} failed: {e}", head.name)),
            },
            SyncState::Done(outcome) => SyncState::Done(outcome),
        }
    }
}

fn abandon(reason: String) -> SyncState {
    SyncState::Done(SyncOutcome::Abandoned(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;

    fn run(host: &MockHost, build: bool) -> SyncRecord {
        let mut head = Branch::new("rawhide");
        head.head = true;
        let selected = Branch::new("f43");
        BranchSync::new(host, &head, Some("rawhide-side"), build).run(
            &Module::new("foo"),
            &selected,
            &CommitId("abc123".to_string()),
        )
    }

    #[test]
    fn fast_forward_never_cherry_picks() {
        let host = MockHost::new();
        let record = run(&host, true);
        assert_eq!(record.outcome, SyncOutcome::FastForwarded);
        assert_eq!(
            host.calls(),
            vec![
                "fetch_and_reset foo rawhide",
                "fast_forward_merge foo f43->rawhide",
                "push foo rawhide",
                "trigger_build foo rawhide",
            ]
        );
        assert!(matches!(record.head_build, HeadBuild::Triggered(_)));
    }

    #[test]
    fn diverged_head_falls_back_to_cherry_pick() {
        let host = MockHost::new().diverged("foo");
        let record = run(&host, false);
        assert_eq!(record.outcome, SyncOutcome::CherryPicked);
        assert_eq!(record.head_build, HeadBuild::NotRequested);
        assert!(host.calls().contains(&"cherry_pick foo rawhide".to_string()));
        assert!(host.calls().contains(&"push foo rawhide".to_string()));
    }

    #[test]
    fn conflicting_cherry_pick_is_abandoned_without_push() {
        let host = MockHost::new().diverged("foo").conflicting("foo");
        let record = run(&host, true);
        assert_eq!(
            record.outcome,
            SyncOutcome::Abandoned("cherry-pick conflict".to_string())
        );
        assert_eq!(record.head_build, HeadBuild::NotRequested);
        assert!(!host.calls().iter().any(|call| call.starts_with("push")));
        assert!(!host.calls().iter().any(|call| call.starts_with("trigger_build")));
    }

    #[test]
    fn resets_head_before_merging() {
        let host = MockHost::new().failing_on("foo", "fetch_and_reset", "rawhide");
        let record = run(&host, true);
        assert!(matches!(
            record.outcome,
            SyncOutcome::Abandoned(reason) if reason.starts_with("could not reset rawhide")
        ));
        assert_eq!(host.calls(), vec!["fetch_and_reset foo rawhide"]);
    }

    #[test]
    fn failed_head_push_abandons() {
        let host = MockHost::new().failing_on("foo", "push", "rawhide");
        let record = run(&host, true);
        assert!(matches!(
            record.outcome,
            SyncOutcome::Abandoned(reason) if reason.starts_with("push to rawhide failed")
        ));
    }

    #[test]
    fn failed_fast_forward_abandons_without_cherry_pick() {
        let host = MockHost::new().failing_on("foo", "fast_forward_merge", "f43->rawhide");
        let record = run(&host, true);
        assert!(matches!(
            &record.outcome,
            SyncOutcome::Abandoned(reason) if reason.starts_with("fast-forward failed")
        ));
        assert_eq!(record.head_build, HeadBuild::NotRequested);
        assert_eq!(
            host.calls(),
            vec![
                "fetch_and_reset foo rawhide",
                "fast_forward_merge foo f43->rawhide",
            ]
        );
    }

    #[test]
    fn failed_cherry_pick_abandons_without_push() {
        let host = MockHost::new()
            .diverged("foo")
            .failing_on("foo", "cherry_pick", "rawhide");
        let record = run(&host, true);
        assert!(matches!(
            &record.outcome,
            SyncOutcome::Abandoned(reason) if reason.starts_with("cherry-pick failed")
        ));
        assert_eq!(record.head_build, HeadBuild::NotRequested);
        assert!(host.calls().contains(&"cherry_pick foo rawhide".to_string()));
        assert!(!host.calls().iter().any(|call| call.starts_with("push")));
    }

    #[test]
    fn failed_head_build_is_recorded() {
        let host = MockHost::new().failing("foo", "trigger_build");
        let record = run(&host, true);
        assert_eq!(record.outcome, SyncOutcome::FastForwarded);
        assert!(matches!(record.head_build, HeadBuild::Failed(_)));
    }
}
