use super::{BuildHandle, CommitId, MergeOutcome, PickOutcome, RepositoryHost};
use crate::engine::UpdateCandidate;
use crate::error::{BumpError, Result};
use crate::registry::{Branch, Module};
use crate::version::Version;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Scripted host for tests. Records every call as `"<op> <module> <branch>"`.
#[derive(Default)]
pub struct MockHost {
    versions: HashMap<String, String>,
    installed: HashMap<String, String>,
    failures: Vec<(String, String, Option<String>)>,
    diverged: HashSet<String>,
    conflicting: HashSet<String>,
    calls: RefCell<Vec<String>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, module: &str, raw: &str) -> Self {
        self.versions.insert(module.to_string(), raw.to_string());
        self
    }

    pub fn with_installed(mut self, module: &str, raw: &str) -> Self {
        self.installed.insert(module.to_string(), raw.to_string());
        self
    }

    /// Make `op` fail for `module` on every branch.
    pub fn failing(mut self, module: &str, op: &str) -> Self {
        self.failures.push((module.to_string(), op.to_string(), None));
        self
    }

    /// Make `op` fail for `module` only on `branch`.
    pub fn failing_on(mut self, module: &str, op: &str, branch: &str) -> Self {
        self.failures
            .push((module.to_string(), op.to_string(), Some(branch.to_string())));
        self
    }

    pub fn diverged(mut self, module: &str) -> Self {
        self.diverged.insert(module.to_string());
        self
    }

    pub fn conflicting(mut self, module: &str) -> Self {
        self.conflicting.insert(module.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, module: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.split(' ').nth(1) == Some(module))
            .collect()
    }

    fn record(&self, op: &str, module: &Module, branch: &str) {
        self.calls
            .borrow_mut()
            .push(format!("{op} {} {branch}", module.name));
    }

    fn fails(&self, op: &str, module: &Module, branch: &str) -> bool {
        self.failures.iter().any(|(m, o, b)| {
            m == &module.name && o == op && b.as_deref().is_none_or(|b| b == branch)
        })
    }

    fn check(&self, op: &str, module: &Module, branch: &str) -> Result<()> {
        self.record(op, module, branch);
        if !self.fails(op, module, branch) {
            return Ok(());
        }
        let message = format!("{op} failed for {} on {branch}", module.name);
        Err(match op {
            "fetch_and_reset" => BumpError::Network(message),
            "push" => BumpError::Push(message),
            "apply_update" | "trigger_build" => BumpError::Build(message),
            _ => BumpError::Command(message),
        })
    }
}

impl RepositoryHost for MockHost {
    fn fetch_and_reset(&self, module: &Module, branch: &Branch) -> Result<()> {
        self.check("fetch_and_reset", module, &branch.name)
    }

    fn current_manifest_version(&self, module: &Module, branch: &Branch) -> Result<Version> {
        self.check("current_manifest_version", module, &branch.name)?;
        let raw = self
            .versions
            .get(&module.name)
            .ok_or_else(|| BumpError::Command(format!("No spec file for {}", module.name)))?;
        Version::parse(raw)
    }

    fn installed_version(&self, module: &Module) -> Result<Option<Version>> {
        self.check("installed_version", module, "local")?;
        self.installed
            .get(&module.name)
            .map(|raw| Version::parse(raw))
            .transpose()
    }

    fn apply_update(
        &self,
        module: &Module,
        branch: &Branch,
        candidate: &UpdateCandidate,
    ) -> Result<CommitId> {
        self.check("apply_update", module, &branch.name)?;
        Ok(CommitId(format!("{}-{}", module.name, candidate.proposed)))
    }

    fn push(&self, module: &Module, branch: &Branch) -> Result<()> {
        self.check("push", module, &branch.name)
    }

    fn fast_forward_merge(
        &self,
        module: &Module,
        source: &Branch,
        head: &Branch,
    ) -> Result<MergeOutcome> {
        self.check(
            "fast_forward_merge",
            module,
            &format!("{}->{}", source.name, head.name),
        )?;
        Ok(if self.diverged.contains(&module.name) {
            MergeOutcome::Diverged
        } else {
            MergeOutcome::Merged
        })
    }

    fn cherry_pick(
        &self,
        module: &Module,
        _commit: &CommitId,
        head: &Branch,
    ) -> Result<PickOutcome> {
        self.check("cherry_pick", module, &head.name)?;
        Ok(if self.conflicting.contains(&module.name) {
            PickOutcome::Conflict
        } else {
            PickOutcome::Applied
        })
    }

    fn trigger_build(
        &self,
        module: &Module,
        branch: &Branch,
        side_tag: Option<&str>,
    ) -> Result<BuildHandle> {
        self.check("trigger_build", module, &branch.name)?;
        Ok(BuildHandle {
            branch: branch.name.clone(),
            task: side_tag.map(|tag| format!("{tag}-task")),
        })
    }
}
