use super::sync::{HeadBuild, SyncOutcome, SyncRecord};
use crate::error::{BumpError, Result};
use crate::host::BuildHandle;
use crate::version::Version;
use colored::Colorize;
use jiff::Timestamp;
use std::fmt;

/// Step of a module's update sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Checkout,
    Manifest,
    Upstream,
    /// Comparing against the locally installed package.
    Installed,
    Update,
    Push,
    Build,
    HeadBuild,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Checkout => "checkout",
            Stage::Manifest => "manifest",
            Stage::Upstream => "upstream",
            Stage::Installed => "installed-check",
            Stage::Update => "update",
            Stage::Push => "push",
            Stage::Build => "build",
            Stage::HeadBuild => "head-build",
        };
        f.write_str(label)
    }
}

/// Terminal status of one module in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResult {
    Updated,
    UpToDate,
    Skipped(String),
    Failed(Stage, String),
    /// Shared branch state was changed but the sequence did not finish;
    /// needs manual follow-up.
    PartiallyApplied(Stage),
}

impl ModuleResult {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ModuleResult::Updated => OutcomeKind::Updated,
            ModuleResult::UpToDate => OutcomeKind::UpToDate,
            ModuleResult::Skipped(_) => OutcomeKind::Skipped,
            ModuleResult::Failed(..) => OutcomeKind::Failed,
            ModuleResult::PartiallyApplied(_) => OutcomeKind::PartiallyApplied,
        }
    }
}

/// Summary groups, in the order they are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Failed,
    PartiallyApplied,
    Skipped,
    Updated,
    UpToDate,
}

impl OutcomeKind {
    pub const ORDER: [OutcomeKind; 5] = [
        OutcomeKind::Failed,
        OutcomeKind::PartiallyApplied,
        OutcomeKind::Skipped,
        OutcomeKind::Updated,
        OutcomeKind::UpToDate,
    ];

    fn title(&self) -> &'static str {
        match self {
            OutcomeKind::Failed => "Failed",
            OutcomeKind::PartiallyApplied => "Partially applied (manual follow-up needed)",
            OutcomeKind::Skipped => "Skipped",
            OutcomeKind::Updated => "Updated",
            OutcomeKind::UpToDate => "Up to date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub module: String,
    pub result: ModuleResult,
    pub from: Option<Version>,
    pub to: Option<Version>,
    /// Newer upstream release held back by a version limit.
    pub filtered: Option<Version>,
    pub sync: Option<SyncRecord>,
    pub build: Option<BuildHandle>,
}

impl ModuleEntry {
    pub fn new(module: impl Into<String>, result: ModuleResult) -> Self {
        Self {
            module: module.into(),
            result,
            from: None,
            to: None,
            filtered: None,
            sync: None,
            build: None,
        }
    }
}

/// Append-only record of every module's outcome in one run.
#[derive(Debug, Clone)]
pub struct SessionReport {
    branch: String,
    simulate: bool,
    started_at: Timestamp,
    entries: Vec<ModuleEntry>,
}

impl SessionReport {
    pub fn new(branch: impl Into<String>, simulate: bool) -> Self {
        Self {
            branch: branch.into(),
            simulate,
            started_at: Timestamp::now(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: ModuleEntry) -> Result<()> {
        if self.contains(&entry.module) {
            return Err(BumpError::DuplicateModule(entry.module));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.entries.iter().any(|entry| entry.module == module)
    }

    #[cfg(test)]
    pub fn get(&self, module: &str) -> Option<&ModuleEntry> {
        self.entries.iter().find(|entry| entry.module == module)
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    #[cfg(test)]
    pub fn is_simulated(&self) -> bool {
        self.simulate
    }

    /// Non-empty groups in [`OutcomeKind::ORDER`], entries in the order
    /// they were recorded.
    pub fn grouped(&self) -> Vec<(OutcomeKind, Vec<&ModuleEntry>)> {
        OutcomeKind::ORDER
            .iter()
            .map(|kind| {
                let entries = self
                    .entries
                    .iter()
                    .filter(|entry| entry.result.kind() == *kind)
                    .collect::<Vec<_>>();
                (*kind, entries)
            })
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }

    /// Modules whose head-branch sync was given up on.
    pub fn abandoned_syncs(&self) -> Vec<(&ModuleEntry, &str)> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.sync {
                Some(SyncRecord {
                    outcome: SyncOutcome::Abandoned(reason),
                    ..
                }) => Some((entry, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Modules with a newer upstream release held back by a limit.
    pub fn filtered(&self) -> Vec<&ModuleEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.filtered.is_some())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|entry| {
            matches!(
                entry.result,
                ModuleResult::Failed(..) | ModuleResult::PartiallyApplied(_)
            )
        })
    }

    pub fn print_summary(&self) {
        let mode = if self.simulate { " (simulated)" } else { "" };
        let started = self
            .started_at
            .to_zoned(jiff::tz::TimeZone::system())
            .strftime("%Y-%m-%d %H:%M:%S")
            .to_string();
        let elapsed = Timestamp::now().duration_since(self.started_at);

        println!(
            "\n{}",
            format!("Summary for branch {}{mode}", self.branch)
                .cyan()
                .bold()
        );
        println!(
            "{}",
            format!(
                "   started {started}, took {:.1}s, {} module(s)",
                elapsed.as_secs_f64(),
                self.entries.len()
            )
            .dimmed()
        );

        if self.entries.is_empty() {
            println!("\n{}", "Completed processing without any modules".yellow());
            return;
        }

        for (kind, entries) in self.grouped() {
            let heading = format!("{} ({}):", kind.title(), entries.len());
            let heading = match kind {
                OutcomeKind::Failed | OutcomeKind::PartiallyApplied => heading.red().bold(),
                OutcomeKind::Skipped => heading.yellow().bold(),
                OutcomeKind::Updated => heading.green().bold(),
                OutcomeKind::UpToDate => heading.dimmed(),
            };
            println!("\n{heading}");
            for entry in entries {
                println!("  • {}", describe(entry));
            }
        }

        let abandoned = self.abandoned_syncs();
        if !abandoned.is_empty() {
            println!("\n{}", "Needs manual head-branch sync:".red().bold());
            for (entry, reason) in abandoned {
                println!("  • {} {}", entry.module.white().bold(), reason.dimmed());
            }
        }

        let filtered = self.filtered();
        if !filtered.is_empty() {
            println!("\n{}", "Available but filtered by version limits:".yellow().bold());
            for entry in filtered {
                if let Some(version) = &entry.filtered {
                    println!(
                        "  • {} {}",
                        entry.module.white().bold(),
                        version.to_string().yellow()
                    );
                }
            }
        }

        if !self.has_failures() {
            println!("\n{}", "Completed processing without any errors".green().bold());
        }
    }
}

fn describe(entry: &ModuleEntry) -> String {
    let name = entry.module.white().bold();
    let versions = match (&entry.from, &entry.to) {
        (Some(from), Some(to)) => {
            format!(" {} → {}", from.to_string().red(), to.to_string().green())
        }
        (Some(from), None) => format!(" {}", from.to_string().dimmed()),
        _ => String::new(),
    };

    let detail = match &entry.result {
        ModuleResult::Skipped(reason) => format!(" ({reason})"),
        ModuleResult::Failed(stage, reason) => format!(" [{stage}] {reason}"),
        ModuleResult::PartiallyApplied(stage) => format!(" stopped at {stage}"),
        ModuleResult::Updated | ModuleResult::UpToDate => String::new(),
    };

    let sync = match &entry.sync {
        Some(record) => {
            let build = match &record.head_build {
                HeadBuild::Triggered(handle) => format!(", built {handle}"),
                HeadBuild::Failed(reason) => format!(", head build failed: {reason}"),
                HeadBuild::NotRequested => String::new(),
            };
            format!(" | head: {}{build}", record.outcome)
        }
        None => String::new(),
    };

    format!("{name}{versions}{detail}{sync}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(module: &str, result: ModuleResult) -> ModuleEntry {
        ModuleEntry::new(module, result)
    }

    #[test]
    fn rejects_duplicate_modules() {
        let mut report = SessionReport::new("f43", false);
        report.record(entry("foo", ModuleResult::Updated)).unwrap();
        let err = report.record(entry("foo", ModuleResult::UpToDate)).unwrap_err();
        assert!(matches!(err, BumpError::DuplicateModule(name) if name == "foo"));
        assert_eq!(report.entries().len(), 1);
        assert_eq!(report.get("foo").unwrap().result, ModuleResult::Updated);
    }

    #[test]
    fn groups_failures_first_in_registration_order() {
        let mut report = SessionReport::new("f43", false);
        report.record(entry("a", ModuleResult::Updated)).unwrap();
        report
            .record(entry("b", ModuleResult::Failed(Stage::Push, "denied".into())))
            .unwrap();
        report.record(entry("c", ModuleResult::UpToDate)).unwrap();
        report
            .record(entry("d", ModuleResult::Failed(Stage::Checkout, "offline".into())))
            .unwrap();
        report.record(entry("e", ModuleResult::Updated)).unwrap();

        let groups: Vec<(OutcomeKind, Vec<&str>)> = report
            .grouped()
            .into_iter()
            .map(|(kind, entries)| (kind, entries.iter().map(|e| e.module.as_str()).collect()))
            .collect();
        assert_eq!(
            groups,
            vec![
                (OutcomeKind::Failed, vec!["b", "d"]),
                (OutcomeKind::Updated, vec!["a", "e"]),
                (OutcomeKind::UpToDate, vec!["c"]),
            ]
        );
        assert!(report.has_failures());
    }

    #[test]
    fn lists_abandoned_syncs_and_filtered_versions_separately() {
        let mut report = SessionReport::new("f43", true);
        let mut updated = entry("foo", ModuleResult::Updated);
        updated.sync = Some(SyncRecord {
            outcome: SyncOutcome::Abandoned("cherry-pick conflict".into()),
            head_build: HeadBuild::NotRequested,
        });
        report.record(updated).unwrap();

        let mut skipped = entry("baz", ModuleResult::Skipped("above upper limit".into()));
        skipped.filtered = Some(Version::parse("3.1.1").unwrap());
        report.record(skipped).unwrap();

        let abandoned = report.abandoned_syncs();
        assert_eq!(abandoned.len(), 1);
        assert_eq!(abandoned[0].0.module, "foo");
        assert_eq!(abandoned[0].1, "cherry-pick conflict");

        let filtered: Vec<&str> = report.filtered().iter().map(|e| e.module.as_str()).collect();
        assert_eq!(filtered, vec!["baz"]);
        assert!(!report.has_failures());
        assert!(report.is_simulated());
    }
}
