use super::Version;
use crate::error::{BumpError, Result};
use std::fmt;

/// Minor number used as the inclusive ceiling of a release series.
pub const SERIES_CEILING: u64 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitViolation {
    BelowLower,
    AboveUpper,
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitViolation::BelowLower => f.write_str("below lower limit"),
            LimitViolation::AboveUpper => f.write_str("above upper limit"),
        }
    }
}

/// Inclusive bounds an upstream release must fall within to be picked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionLimitRule {
    lower: Option<Version>,
    upper: Option<Version>,
}

impl VersionLimitRule {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn new(lower: Option<Version>, upper: Option<Version>) -> Result<Self> {
        if let (Some(lower), Some(upper)) = (&lower, &upper) {
            if lower > upper {
                return Err(BumpError::InvalidLimit(format!(
                    "lower bound {lower} is above upper bound {upper}"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn parse(lower: Option<&str>, upper: Option<&str>) -> Result<Self> {
        let lower = lower.map(Version::parse).transpose()?;
        let upper = upper.map(Version::parse).transpose()?;
        Self::new(lower, upper)
    }

    /// Everything up to and including the last release of `major`.
    pub fn series(major: u64) -> Self {
        Self {
            lower: None,
            upper: Some(Version::from_parts(vec![major, SERIES_CEILING])),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn check(&self, version: &Version) -> std::result::Result<(), LimitViolation> {
        if self.lower.as_ref().is_some_and(|lower| version < lower) {
            return Err(LimitViolation::BelowLower);
        }
        if self.upper.as_ref().is_some_and(|upper| version > upper) {
            return Err(LimitViolation::AboveUpper);
        }
        Ok(())
    }
}

impl fmt::Display for VersionLimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (None, None) => f.write_str("no limit"),
            (Some(lower), None) => write!(f, ">= {lower}"),
            (None, Some(upper)) => write!(f, "<= {upper}"),
            (Some(lower), Some(upper)) => write!(f, "{lower} ..= {upper}"),
        }
    }
}
