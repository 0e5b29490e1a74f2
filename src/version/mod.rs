use crate::error::{BumpError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub mod comparator;
pub mod limit;

pub use comparator::{UpdateVerdict, VersionComparator};
pub use limit::{LimitViolation, VersionLimitRule};

/// First major version of the calendar-style numbering (40, 41, ...).
/// Releases below it use the `major.minor` series scheme.
pub const CALENDAR_MAJOR_FLOOR: u64 = 40;

/// Pre-release marker. Sorts below the final release of the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha,
    Beta,
    Rc,
}

impl PreRelease {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "alpha" => Some(PreRelease::Alpha),
            "beta" => Some(PreRelease::Beta),
            "rc" => Some(PreRelease::Rc),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PreRelease::Alpha => "alpha",
            PreRelease::Beta => "beta",
            PreRelease::Rc => "rc",
        }
    }
}

/// Dotted-numeric version, optionally tagged as a pre-release.
///
/// Accepts the upstream spelling (`48.rc`) and the packaged spelling
/// (`48~rc`). Comparison pads the shorter tuple with zeros, so `3.2`
/// and `3.2.0` are equal.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    parts: Vec<u64>,
    pre: Option<PreRelease>,
}

impl Version {
    pub fn parse(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        let invalid = || BumpError::VersionParse(version.to_string());

        let (numeric, pre) = match trimmed.split_once('~') {
            Some((numeric, tag)) => (numeric, Some(PreRelease::parse(tag).ok_or_else(invalid)?)),
            None => match trimmed.rsplit_once('.') {
                Some((numeric, tag)) => match PreRelease::parse(tag) {
                    Some(pre) => (numeric, Some(pre)),
                    None => (trimmed, None),
                },
                None => (trimmed, None),
            },
        };

        let parts = numeric
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<u64>>>()?;

        Ok(Self {
            original: trimmed.to_string(),
            parts,
            pre,
        })
    }

    pub(crate) fn from_parts(parts: Vec<u64>) -> Self {
        let original = parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Self {
            original,
            parts,
            pre: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn major(&self) -> u64 {
        self.parts[0]
    }

    pub fn minor(&self) -> u64 {
        self.parts.get(1).copied().unwrap_or(0)
    }

    /// The form written into a package manifest: pre-release tags use `~`
    /// so they sort before the final release.
    pub fn packaged(&self) -> String {
        let numeric = self
            .parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        match self.pre {
            Some(pre) => format!("{numeric}~{}", pre.as_str()),
            None => numeric,
        }
    }

    /// Directory name upstream publishes the release under: `48` for
    /// calendar versions, `3.38` before that.
    pub fn release_series(&self) -> String {
        if self.major() >= CALENDAR_MAJOR_FLOOR {
            self.major().to_string()
        } else {
            format!("{}.{}", self.major(), self.minor())
        }
    }
}

impl FromStr for Version {
    type Err = BumpError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }

        match (self.pre, other.pre) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}
