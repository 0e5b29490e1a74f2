use super::report::ModuleResult;
use crate::registry::{Branch, Module, ModuleRegistry};
use crate::version::{CALENDAR_MAJOR_FLOOR, UpdateVerdict, Version, VersionComparator};

/// An update the host should apply. Lives only for one module's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub module: String,
    pub branch: String,
    pub current: Version,
    pub proposed: Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Candidate(UpdateCandidate),
    Settled {
        result: ModuleResult,
        /// Newer release held back by a limit, surfaced in the report.
        filtered: Option<Version>,
    },
}

impl Evaluation {
    fn settled(result: ModuleResult) -> Self {
        Evaluation::Settled {
            result,
            filtered: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Allow updates that change the major version below the calendar
    /// numbering floor.
    pub relax_version_checks: bool,
}

/// Decides, per module and branch, whether an upstream release should be
/// applied. Never touches the host.
pub struct UpdateDecisionEngine<'a> {
    registry: &'a ModuleRegistry,
    policy: UpdatePolicy,
}

impl<'a> UpdateDecisionEngine<'a> {
    pub fn new(registry: &'a ModuleRegistry, policy: UpdatePolicy) -> Self {
        Self { registry, policy }
    }

    /// Verdicts that need no versions at all.
    pub fn precheck(&self, module: &Module, branch: &Branch) -> Option<ModuleResult> {
        if module.disabled {
            return Some(ModuleResult::Skipped(
                "excluded from automatic updates".to_string(),
            ));
        }
        if branch.eol {
            return Some(ModuleResult::Skipped(format!(
                "branch {} is end-of-life",
                branch.name
            )));
        }
        None
    }

    pub fn evaluate(
        &self,
        module: &Module,
        branch: &Branch,
        current: &Version,
        available: &Version,
    ) -> Evaluation {
        if let Some(result) = self.precheck(module, branch) {
            return Evaluation::settled(result);
        }
        let limit = self.registry.rules_for_branch(module, branch);
        let verdict = VersionComparator::decide(current, available, &limit);
        self.settle(module, branch, current, verdict)
    }

    /// Like [`UpdateDecisionEngine::evaluate`], deciding on the best of
    /// every published release.
    pub fn evaluate_releases(
        &self,
        module: &Module,
        branch: &Branch,
        current: &Version,
        releases: &[Version],
    ) -> Evaluation {
        if let Some(result) = self.precheck(module, branch) {
            return Evaluation::settled(result);
        }
        let limit = self.registry.rules_for_branch(module, branch);
        match VersionComparator::select(current, releases, &limit) {
            Some(chosen) => self.evaluate(module, branch, current, chosen),
            None => Evaluation::settled(ModuleResult::UpToDate),
        }
    }

    fn settle(
        &self,
        module: &Module,
        branch: &Branch,
        current: &Version,
        verdict: UpdateVerdict,
    ) -> Evaluation {
        match verdict {
            UpdateVerdict::NoUpdate => Evaluation::settled(ModuleResult::UpToDate),
            UpdateVerdict::Rejected { version, reason } => Evaluation::Settled {
                result: ModuleResult::Skipped(reason.to_string()),
                filtered: Some(version),
            },
            UpdateVerdict::Eligible(proposed) => {
                if self.is_blocked_major_change(current, &proposed) {
                    return Evaluation::Settled {
                        result: ModuleResult::Skipped(format!(
                            "major version change {current} -> {proposed} \
                             needs --relax-version-checks"
                        )),
                        filtered: Some(proposed),
                    };
                }
                Evaluation::Candidate(UpdateCandidate {
                    module: module.name.clone(),
                    branch: branch.name.clone(),
                    current: current.clone(),
                    proposed,
                })
            }
        }
    }

    fn is_blocked_major_change(&self, current: &Version, proposed: &Version) -> bool {
        !self.policy.relax_version_checks
            && current.major() != proposed.major()
            && proposed.major() < CALENDAR_MAJOR_FLOOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionLimitRule;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn registry() -> ModuleRegistry {
        let mut rawhide = Branch::new("rawhide");
        rawhide.head = true;
        let mut f43 = Branch::new("f43");
        f43.aliases.push("newstable".to_string());
        f43.series = Some(49);
        let mut f39 = Branch::new("f39");
        f39.eol = true;

        let mut disabled = Module::new("gtk2");
        disabled.disabled = true;
        let modules = vec![
            Module::new("foo"),
            Module::new("bar"),
            Module::new("baz")
                .with_limit(VersionLimitRule::parse(None, Some("3.0.99")).unwrap()),
            disabled,
        ];
        ModuleRegistry::new(vec![rawhide, f43, f39], modules).unwrap()
    }

    fn evaluate(
        registry: &ModuleRegistry,
        module: &str,
        branch: &str,
        current: &str,
        available: &str,
    ) -> Evaluation {
        let engine = UpdateDecisionEngine::new(registry, UpdatePolicy::default());
        engine.evaluate(
            registry.module(module).unwrap(),
            registry.resolve_branch(branch).unwrap(),
            &v(current),
            &v(available),
        )
    }

    #[test]
    fn newer_release_becomes_candidate() {
        let registry = registry();
        assert_eq!(
            evaluate(&registry, "foo", "f43", "1.0.0", "1.2.0"),
            Evaluation::Candidate(UpdateCandidate {
                module: "foo".to_string(),
                branch: "f43".to_string(),
                current: v("1.0.0"),
                proposed: v("1.2.0"),
            })
        );
    }

    #[test]
    fn older_release_is_up_to_date() {
        let registry = registry();
        assert_eq!(
            evaluate(&registry, "bar", "f43", "2.0.0", "1.9.0"),
            Evaluation::Settled {
                result: ModuleResult::UpToDate,
                filtered: None,
            }
        );
    }

    #[test]
    fn limited_release_is_skipped_and_remembered() {
        let registry = registry();
        assert_eq!(
            evaluate(&registry, "baz", "rawhide", "3.0.0", "3.1.1"),
            Evaluation::Settled {
                result: ModuleResult::Skipped("above upper limit".to_string()),
                filtered: Some(v("3.1.1")),
            }
        );
    }

    #[test]
    fn branch_series_limits_stable_branches_only() {
        let registry = registry();
        assert!(matches!(
            evaluate(&registry, "foo", "newstable", "49.2", "50.alpha"),
            Evaluation::Settled { result: ModuleResult::Skipped(_), .. }
        ));
        assert!(matches!(
            evaluate(&registry, "foo", "rawhide", "49.2", "50.alpha"),
            Evaluation::Candidate(_)
        ));
    }

    #[test]
    fn disabled_modules_and_eol_branches_are_skipped() {
        let registry = registry();
        assert_eq!(
            evaluate(&registry, "gtk2", "rawhide", "2.24", "2.25"),
            Evaluation::Settled {
                result: ModuleResult::Skipped(
                    "excluded from automatic updates".to_string()
                ),
                filtered: None,
            }
        );
        assert_eq!(
            evaluate(&registry, "foo", "f39", "1.0", "2.0"),
            Evaluation::Settled {
                result: ModuleResult::Skipped("branch f39 is end-of-life".to_string()),
                filtered: None,
            }
        );
    }

    #[test]
    fn major_change_below_calendar_floor_needs_relaxed_checks() {
        let registry = registry();
        assert!(matches!(
            evaluate(&registry, "foo", "rawhide", "2.8", "3.0"),
            Evaluation::Settled { filtered: Some(_), .. }
        ));
        assert!(matches!(
            evaluate(&registry, "foo", "rawhide", "3.38.1", "40.0"),
            Evaluation::Candidate(_)
        ));

        let policy = UpdatePolicy {
            relax_version_checks: true,
        };
        let relaxed = UpdateDecisionEngine::new(&registry, policy);
        assert!(matches!(
            relaxed.evaluate(
                registry.module("foo").unwrap(),
                registry.head(),
                &v("2.8"),
                &v("3.0"),
            ),
            Evaluation::Candidate(_)
        ));
    }

    #[test]
    fn filtered_release_is_reported_when_nothing_qualifies() {
        let registry = registry();
        let engine = UpdateDecisionEngine::new(&registry, UpdatePolicy::default());
        let evaluation = engine.evaluate_releases(
            registry.module("baz").unwrap(),
            registry.head(),
            &v("3.0.0"),
            &[v("3.0.0"), v("3.1.1"), v("3.1.0")],
        );
        assert_eq!(
            evaluation,
            Evaluation::Settled {
                result: ModuleResult::Skipped("above upper limit".to_string()),
                filtered: Some(v("3.1.1")),
            }
        );
        let none = engine.evaluate_releases(
            registry.module("foo").unwrap(),
            registry.head(),
            &v("1.0"),
            &[],
        );
        assert_eq!(none, Evaluation::settled(ModuleResult::UpToDate));
    }

    #[test]
    fn picks_newest_release_within_branch_series() {
        let registry = registry();
        let engine = UpdateDecisionEngine::new(&registry, UpdatePolicy::default());
        let releases = [v("49.1"), v("49.3"), v("50.alpha"), v("48.9")];
        let evaluation = engine.evaluate_releases(
            registry.module("foo").unwrap(),
            registry.resolve_branch("f43").unwrap(),
            &v("49.1"),
            &releases,
        );
        assert!(matches!(evaluation, Evaluation::Candidate(c) if c.proposed == v("49.3")));
    }
}
