use crate::error::{BumpError, Result};
use crate::registry::Module;
use crate::utils::console;
use crate::version::{Version, VersionComparator};
use std::path::{Path, PathBuf};

pub mod gnome;

pub use gnome::GnomeMirror;

/// Where upstream releases of a module are published.
pub trait UpstreamSource {
    /// Every published release, as written upstream.
    fn available_versions(&self, module: &Module) -> Result<Vec<String>>;

    /// Download the release tarball into `dest_dir`, returning its path.
    fn download_tarball(&self, module: &Module, version: &Version, dest_dir: &Path)
    -> Result<PathBuf>;

    fn latest_version(&self, module: &Module) -> Result<Version> {
        let releases = parse_releases(&module.name, &self.available_versions(module)?);
        VersionComparator::newest(&releases)
            .cloned()
            .ok_or_else(|| BumpError::NotFound(module.name.clone()))
    }
}

/// Parse upstream release strings, logging and dropping the ones that do not
/// parse so they can be triaged by hand.
pub fn parse_releases(module: &str, raw: &[String]) -> Vec<Version> {
    raw.iter()
        .filter_map(|release| match Version::parse(release) {
            Ok(version) => Some(version),
            Err(_) => {
                console::warn(format!(
                    "{module}: ignoring unparseable upstream version '{release}'"
                ));
                None
            }
        })
        .collect()
}
