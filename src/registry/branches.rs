use crate::error::Result;
use crate::version::VersionLimitRule;
use quick_xml::de::from_str;
use serde::Deserialize;

/// A release branch of the distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub aliases: Vec<String>,
    pub head: bool,
    pub eol: bool,
    /// Dist tag used in built package names, e.g. `fc43`.
    pub release_tag: Option<String>,
    /// Upstream release series the branch tracks, e.g. `49`.
    pub series: Option<u64>,
}

impl Branch {
    #[cfg(test)]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            head: false,
            eol: false,
            release_tag: None,
            series: None,
        }
    }

    /// Limit applied when a module configures nothing for this branch.
    /// The head branch follows upstream without restriction.
    pub fn default_limit(&self) -> VersionLimitRule {
        match self.series {
            Some(series) if !self.head => VersionLimitRule::series(series),
            _ => VersionLimitRule::unlimited(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BranchesFile {
    #[serde(rename = "branch", default)]
    branches: Vec<BranchEntry>,
}

#[derive(Debug, Deserialize)]
struct BranchEntry {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@tag", default)]
    tag: Option<String>,
    #[serde(rename = "@series", default)]
    series: Option<u64>,
    #[serde(rename = "@head", default, deserialize_with = "super::deserialize_flag")]
    head: bool,
    #[serde(rename = "@eol", default, deserialize_with = "super::deserialize_flag")]
    eol: bool,
    #[serde(rename = "alias", default)]
    aliases: Vec<String>,
}

/// Parse the branch list, e.g.
///
/// ```xml
/// <branches>
///   <branch name="rawhide" tag="fc44" series="50" head="true"/>
///   <branch name="f43" tag="fc43" series="49"><alias>newstable</alias></branch>
/// </branches>
/// ```
pub fn parse_branches(xml: &str) -> Result<Vec<Branch>> {
    let file: BranchesFile = from_str(xml)?;
    Ok(file
        .branches
        .into_iter()
        .map(|entry| Branch {
            name: entry.name,
            aliases: entry
                .aliases
                .into_iter()
                .map(|alias| alias.trim().to_string())
                .collect(),
            head: entry.head,
            eol: entry.eol,
            release_tag: entry.tag,
            series: entry.series,
        })
        .collect())
}
