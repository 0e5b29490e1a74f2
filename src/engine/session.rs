use super::decision::{Evaluation, UpdateCandidate, UpdateDecisionEngine, UpdatePolicy};
use super::report::{ModuleEntry, ModuleResult, SessionReport, Stage};
use super::sync::{BranchSync, HeadBuild};
use crate::error::{BumpError, Result};
use crate::host::{RepositoryHost, SimulatedHost};
use crate::registry::{Branch, Module, ModuleRegistry};
use crate::upstream::UpstreamSource;
use crate::utils::console;
use crate::version::Version;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Replace every mutating host call with a logged no-op.
    pub simulate: bool,
    pub selected_side_tag: Option<String>,
    pub head_side_tag: Option<String>,
    pub build: bool,
    pub head_sync: bool,
    /// Refuse updates older than the package installed on this machine.
    pub check_installed: bool,
    pub policy: UpdatePolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            simulate: false,
            selected_side_tag: None,
            head_side_tag: None,
            build: true,
            head_sync: true,
            check_installed: false,
            policy: UpdatePolicy::default(),
        }
    }
}

/// One run over a branch: modules are processed strictly one after another
/// because they share the checkout cache.
pub struct Session<'a> {
    registry: &'a ModuleRegistry,
    host: &'a dyn RepositoryHost,
    upstream: &'a dyn UpstreamSource,
}

impl<'a> Session<'a> {
    pub fn new(
        registry: &'a ModuleRegistry,
        host: &'a dyn RepositoryHost,
        upstream: &'a dyn UpstreamSource,
    ) -> Self {
        Self {
            registry,
            host,
            upstream,
        }
    }

    /// Process `modules` on the branch named by `branch_or_alias`.
    ///
    /// Only an unknown branch aborts the run; every per-module failure ends
    /// up in the returned report.
    pub fn run_session(
        &self,
        branch_or_alias: &str,
        modules: &[&Module],
        options: &SessionOptions,
    ) -> Result<SessionReport> {
        let branch = self.registry.resolve_branch(branch_or_alias)?;
        if branch.name != branch_or_alias {
            console::debug(format!(
                "Branch alias {branch_or_alias} resolved to {}",
                branch.name
            ));
        }

        let simulated;
        let host: &dyn RepositoryHost = if options.simulate {
            simulated = SimulatedHost::new(self.host);
            &simulated
        } else {
            self.host
        };

        let mut report = SessionReport::new(&branch.name, options.simulate);
        let pb = ProgressBar::new(modules.len() as u64);
        if console::verbose() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::default_bar().template("  [{bar:40}] {pos}/{len} {msg}");
        if let Ok(style) = style {
            pb.set_style(style.progress_chars("=>-"));
        }

        for module in modules {
            pb.set_message(format!("Processing {}", module.name));
            if report.contains(&module.name) {
                console::warn(format!("{} listed twice, ignoring the repeat", module.name));
                pb.inc(1);
                continue;
            }

            let entry = self.process(host, module, branch, options);
            if let Err(e) = report.record(entry) {
                console::warn(e.to_string());
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(report)
    }

    fn process(
        &self,
        host: &dyn RepositoryHost,
        module: &Module,
        branch: &Branch,
        options: &SessionOptions,
    ) -> ModuleEntry {
        let engine = UpdateDecisionEngine::new(self.registry, options.policy);
        if let Some(result) = engine.precheck(module, branch) {
            return ModuleEntry::new(&module.name, result);
        }

        console::debug(format!("{}: resetting {} from remote", module.name, branch.name));
        if let Err(e) = host.fetch_and_reset(module, branch) {
            return failed(module, Stage::Checkout, e);
        }

        let current = match host.current_manifest_version(module, branch) {
            Ok(version) => version,
            Err(BumpError::VersionParse(raw)) => {
                console::warn(format!("{}: cannot parse packaged version '{raw}'", module.name));
                return ModuleEntry::new(
                    &module.name,
                    ModuleResult::Skipped(format!("unparseable packaged version '{raw}'")),
                );
            }
            Err(e) => return failed(module, Stage::Manifest, e),
        };

        let latest = match self.upstream.latest_version(module) {
            Ok(latest) => latest,
            Err(BumpError::NotFound(_)) => {
                return with_current(
                    module,
                    ModuleResult::Skipped("no upstream releases".to_string()),
                    current,
                );
            }
            Err(e) => return failed(module, Stage::Upstream, e),
        };
        if latest <= current {
            console::debug(format!("{}: newest upstream release is {latest}", module.name));
            return with_current(module, ModuleResult::UpToDate, current);
        }

        // Unparseable entries were already reported while finding the latest.
        let releases: Vec<Version> = match self.upstream.available_versions(module) {
            Ok(raw) => raw.iter().filter_map(|r| Version::parse(r).ok()).collect(),
            Err(e) => return failed(module, Stage::Upstream, e),
        };

        match engine.evaluate_releases(module, branch, &current, &releases) {
            Evaluation::Settled { result, filtered } => {
                if let Some(version) = &filtered {
                    console::debug(format!("{}: {version} available but filtered", module.name));
                }
                let mut entry = with_current(module, result, current);
                entry.filtered = filtered;
                entry
            }
            Evaluation::Candidate(candidate) => {
                if options.check_installed {
                    if let Some(entry) = check_installed(host, module, &candidate) {
                        return entry;
                    }
                }
                self.update(host, module, branch, candidate, options)
            }
        }
    }

    fn update(
        &self,
        host: &dyn RepositoryHost,
        module: &Module,
        branch: &Branch,
        candidate: UpdateCandidate,
        options: &SessionOptions,
    ) -> ModuleEntry {
        console::info(format!(
            "{}: updating {} to {}",
            module.name, candidate.current, candidate.proposed
        ));
        let mut entry = ModuleEntry::new(&module.name, ModuleResult::Updated);
        entry.from = Some(candidate.current.clone());
        entry.to = Some(candidate.proposed.clone());

        let commit = match host.apply_update(module, branch, &candidate) {
            Ok(commit) => commit,
            Err(e) => return failed_entry(entry, module, Stage::Update, e),
        };
        if let Err(e) = host.push(module, branch) {
            return failed_entry(entry, module, Stage::Push, e);
        }

        let mut partial = None;
        if options.head_sync && !self.registry.is_head(branch) {
            let sync = BranchSync::new(
                host,
                self.registry.head(),
                options.head_side_tag.as_deref(),
                options.build,
            );
            let record = sync.run(module, branch, &commit);
            console::info(format!(
                "{}: {} {}",
                module.name,
                self.registry.head().name,
                record.outcome
            ));
            if matches!(record.head_build, HeadBuild::Failed(_)) {
                partial = Some(Stage::HeadBuild);
            }
            entry.sync = Some(record);
        }

        if options.build {
            console::info(format!(
                "Building {}",
                build_nvr(module, branch, &candidate.proposed)
            ));
            match host.trigger_build(module, branch, options.selected_side_tag.as_deref()) {
                Ok(handle) => entry.build = Some(handle),
                Err(e) => {
                    console::fail(format!("{}: build on {} failed: {e}", module.name, branch.name));
                    partial = Some(Stage::Build);
                }
            }
        }

        entry.result = match partial {
            Some(stage) => ModuleResult::PartiallyApplied(stage),
            None => {
                console::success(format!("{} updated to {}", module.name, candidate.proposed));
                ModuleResult::Updated
            }
        };
        entry
    }
}

const INSTALLED_IS_NEWER: &str = "installed version is newer than selected release";

/// Settles the module when the installed package is already newer than the
/// chosen release, which usually means the module tracks the wrong branch.
fn check_installed(
    host: &dyn RepositoryHost,
    module: &Module,
    candidate: &UpdateCandidate,
) -> Option<ModuleEntry> {
    match host.installed_version(module) {
        Ok(Some(installed)) if installed > candidate.proposed => {
            console::warn(format!(
                "{}: installed version {installed} is newer than {}, \
                 check modules.xml is looking at the correct branch",
                module.name, candidate.proposed
            ));
            let mut entry = with_current(
                module,
                ModuleResult::Skipped(INSTALLED_IS_NEWER.to_string()),
                candidate.current.clone(),
            );
            entry.filtered = Some(candidate.proposed.clone());
            Some(entry)
        }
        Ok(_) => None,
        Err(e) => Some(failed(module, Stage::Installed, e)),
    }
}

fn build_nvr(module: &Module, branch: &Branch, version: &Version) -> String {
    let tag = branch.release_tag.as_deref().unwrap_or(&branch.name);
    format!("{}-{}-1.{tag}", module.package, version.packaged())
}

fn with_current(module: &Module, result: ModuleResult, current: Version) -> ModuleEntry {
    let mut entry = ModuleEntry::new(&module.name, result);
    entry.from = Some(current);
    entry
}

fn failed(module: &Module, stage: Stage, error: BumpError) -> ModuleEntry {
    console::fail(format!("{}: {stage} failed: {error}", module.name));
    ModuleEntry::new(&module.name, ModuleResult::Failed(stage, error.to_string()))
}

/// Keeps the versions already recorded on `entry`.
fn failed_entry(
    mut entry: ModuleEntry,
    module: &Module,
    stage: Stage,
    error: BumpError,
) -> ModuleEntry {
    console::fail(format!("{}: {stage} failed: {error}", module.name));
    entry.result = ModuleResult::Failed(stage, error.to_string());
    entry
}
