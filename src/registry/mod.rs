use crate::error::{BumpError, Result};
use crate::utils::console;
use crate::version::VersionLimitRule;
use serde::{Deserialize, Deserializer};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

pub mod branches;
pub mod modules;

pub use branches::{Branch, parse_branches};
pub use modules::{Module, parse_modules};

/// Boolean XML attribute. Hand-maintained files spell it `True`, `true`
/// or `1`.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid flag value '{other}'"
        ))),
    }
}

/// Name of the branch treated as head when none is flagged explicitly.
pub const DEFAULT_HEAD_BRANCH: &str = "rawhide";

/// Immutable view of the configured branches and modules, loaded once per
/// session.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    branches: Vec<Branch>,
    lookup: HashMap<String, usize>,
    head: usize,
    modules: Vec<Module>,
}

impl ModuleRegistry {
    pub fn new(mut branches: Vec<Branch>, modules: Vec<Module>) -> Result<Self> {
        let mut lookup = HashMap::new();
        for (index, branch) in branches.iter().enumerate() {
            if lookup.insert(branch.name.clone(), index).is_some() {
                return Err(BumpError::Config(format!(
                    "branch '{}' is defined more than once",
                    branch.name
                )));
            }
        }

        for (index, branch) in branches.iter().enumerate() {
            for alias in &branch.aliases {
                if lookup.contains_key(alias) {
                    console::warn(format!(
                        "Duplicated alias '{alias}' on branch '{}', skipping",
                        branch.name
                    ));
                    continue;
                }
                lookup.insert(alias.clone(), index);
            }
        }

        let head = Self::find_head(&mut branches)?;

        let mut seen = HashSet::new();
        let mut canonical_modules = Vec::with_capacity(modules.len());
        for mut module in modules {
            if !seen.insert(module.name.clone()) {
                return Err(BumpError::Config(format!(
                    "module '{}' is defined more than once",
                    module.name
                )));
            }

            for (branch, _) in module.branch_limits.iter_mut() {
                let index = lookup.get(branch.as_str()).copied().ok_or_else(|| {
                    BumpError::Config(format!(
                        "module '{}' sets a limit for unknown branch '{branch}'",
                        module.name
                    ))
                })?;
                *branch = branches[index].name.clone();
            }
            canonical_modules.push(module);
        }

        Ok(Self {
            branches,
            lookup,
            head,
            modules: canonical_modules,
        })
    }

    pub fn load(branches_path: &Path, modules_path: &Path) -> Result<Self> {
        let branches_xml = fs::read_to_string(branches_path).map_err(|e| {
            BumpError::Config(format!("Failed to read {}: {e}", branches_path.display()))
        })?;
        let modules_xml = fs::read_to_string(modules_path).map_err(|e| {
            BumpError::Config(format!("Failed to read {}: {e}", modules_path.display()))
        })?;

        Self::new(parse_branches(&branches_xml)?, parse_modules(&modules_xml)?)
    }

    fn find_head(branches: &mut [Branch]) -> Result<usize> {
        let flagged: Vec<usize> = branches
            .iter()
            .enumerate()
            .filter(|(_, branch)| branch.head)
            .map(|(index, _)| index)
            .collect();

        match flagged.as_slice() {
            [index] => Ok(*index),
            [] => {
                let index = branches
                    .iter()
                    .position(|branch| branch.name == DEFAULT_HEAD_BRANCH)
                    .ok_or_else(|| {
                        BumpError::Config(format!(
                            "no head branch configured and no '{DEFAULT_HEAD_BRANCH}' branch"
                        ))
                    })?;
                branches[index].head = true;
                Ok(index)
            }
            _ => Err(BumpError::Config(
                "more than one branch is flagged as head".to_string(),
            )),
        }
    }

    /// Resolve a canonical branch name or alias (case-sensitive).
    pub fn resolve_branch(&self, name_or_alias: &str) -> Result<&Branch> {
        self.lookup
            .get(name_or_alias)
            .map(|index| &self.branches[*index])
            .ok_or_else(|| BumpError::UnknownBranch(name_or_alias.to_string()))
    }

    pub fn head(&self) -> &Branch {
        &self.branches[self.head]
    }

    pub fn is_head(&self, branch: &Branch) -> bool {
        branch.name == self.head().name
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.name == name)
    }

    /// Module-wide rule; no limit when none is configured.
    pub fn rules_for(&self, module: &Module) -> VersionLimitRule {
        module.limit.clone().unwrap_or_default()
    }

    /// Effective rule on a branch: per-branch override, then the module-wide
    /// rule, then the branch's own series limit.
    pub fn rules_for_branch(&self, module: &Module, branch: &Branch) -> VersionLimitRule {
        if let Some(rule) = module.limit_for(&branch.name) {
            return rule.clone();
        }
        let rule = self.rules_for(module);
        if rule.is_unlimited() {
            branch.default_limit()
        } else {
            rule
        }
    }
}
