use super::{LimitViolation, Version, VersionLimitRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateVerdict {
    /// Nothing newer than the packaged version.
    NoUpdate,
    /// Newer, but outside the configured limits.
    Rejected {
        version: Version,
        reason: LimitViolation,
    },
    Eligible(Version),
}

pub struct VersionComparator;

impl VersionComparator {
    pub fn decide(
        current: &Version,
        available: &Version,
        limit: &VersionLimitRule,
    ) -> UpdateVerdict {
        if available <= current {
            return UpdateVerdict::NoUpdate;
        }

        match limit.check(available) {
            Ok(()) => UpdateVerdict::Eligible(available.clone()),
            Err(reason) => UpdateVerdict::Rejected {
                version: available.clone(),
                reason,
            },
        }
    }

    /// The release worth deciding on: the newest one newer than `current`
    /// and within limits, otherwise the newest published release so a
    /// filtered update can still be reported.
    pub fn select<'r>(
        current: &Version,
        releases: &'r [Version],
        limit: &VersionLimitRule,
    ) -> Option<&'r Version> {
        releases
            .iter()
            .filter(|release| *release > current && limit.check(release).is_ok())
            .max()
            .or_else(|| Self::newest(releases))
    }

    pub fn newest(releases: &[Version]) -> Option<&Version> {
        releases.iter().max()
    }
}
