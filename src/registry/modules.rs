use crate::error::Result;
use crate::version::VersionLimitRule;
use quick_xml::de::from_str;
use serde::Deserialize;

/// An upstream module and the package it is shipped as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub package: String,
    /// Excluded from automatic updates.
    pub disabled: bool,
    pub limit: Option<VersionLimitRule>,
    /// Per-branch overrides keyed by the branch name or alias as written
    /// in the configuration; the registry canonicalises them.
    pub branch_limits: Vec<(String, VersionLimitRule)>,
}

impl Module {
    #[cfg(test)]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            package: name.clone(),
            name,
            disabled: false,
            limit: None,
            branch_limits: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_limit(mut self, limit: VersionLimitRule) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn limit_for(&self, branch: &str) -> Option<&VersionLimitRule> {
        self.branch_limits
            .iter()
            .find(|(name, _)| name == branch)
            .map(|(_, limit)| limit)
    }
}

#[derive(Debug, Deserialize)]
struct ModulesFile {
    #[serde(rename = "project", default)]
    projects: Vec<ProjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@pkgname", default)]
    pkgname: Option<String>,
    #[serde(rename = "@disabled", default, deserialize_with = "super::deserialize_flag")]
    disabled: bool,
    #[serde(rename = "@lower", default)]
    lower: Option<String>,
    #[serde(rename = "@upper", default)]
    upper: Option<String>,
    #[serde(rename = "limit", default)]
    limits: Vec<LimitEntry>,
}

#[derive(Debug, Deserialize)]
struct LimitEntry {
    #[serde(rename = "@branch")]
    branch: String,
    #[serde(rename = "@lower", default)]
    lower: Option<String>,
    #[serde(rename = "@upper", default)]
    upper: Option<String>,
}

/// Parse the module list, e.g.
///
/// ```xml
/// <modules>
///   <project name="gnome-shell"/>
///   <project name="glib" pkgname="glib2" upper="2.999">
///     <limit branch="f42" upper="2.84.99"/>
///   </project>
///   <project name="gtk2" disabled="true"/>
/// </modules>
/// ```
pub fn parse_modules(xml: &str) -> Result<Vec<Module>> {
    let file: ModulesFile = from_str(xml)?;
    file.projects
        .into_iter()
        .map(|project| {
            let limit = if project.lower.is_some() || project.upper.is_some() {
                Some(VersionLimitRule::parse(
                    project.lower.as_deref(),
                    project.upper.as_deref(),
                )?)
            } else {
                None
            };

            let branch_limits = project
                .limits
                .into_iter()
                .map(|entry| {
                    let rule =
                        VersionLimitRule::parse(entry.lower.as_deref(), entry.upper.as_deref())?;
                    Ok((entry.branch, rule))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Module {
                package: project.pkgname.unwrap_or_else(|| project.name.clone()),
                name: project.name,
                disabled: project.disabled,
                limit,
                branch_limits,
            })
        })
        .collect()
}
