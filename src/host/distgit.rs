use super::specfile;
use super::{BuildHandle, CommitId, MergeOutcome, PickOutcome, RepositoryHost};
use crate::engine::UpdateCandidate;
use crate::error::{BumpError, Result};
use crate::registry::{Branch, Module};
use crate::upstream::UpstreamSource;
use crate::utils::console;
use crate::version::Version;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

/// Repository host backed by dist-git checkouts under a cache directory,
/// driven through `git`, `fedpkg` and `rpmdev-bumpspec`.
pub struct DistGitHost {
    cache_dir: PathBuf,
    upstream: Arc<dyn UpstreamSource>,
    mockbuild: bool,
}

impl DistGitHost {
    pub fn new<P: AsRef<Path>>(
        cache_dir: P,
        upstream: Arc<dyn UpstreamSource>,
        mockbuild: bool,
    ) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        fs::create_dir_all(cache_dir)?;
        let cache_dir = cache_dir.canonicalize()?;

        Ok(Self {
            cache_dir,
            upstream,
            mockbuild,
        })
    }

    fn checkout_dir(&self, module: &Module) -> Result<PathBuf> {
        validate_package_name(&module.package)?;
        Ok(self.cache_dir.join(&module.package))
    }

    fn spec_path(&self, module: &Module) -> Result<PathBuf> {
        Ok(self
            .checkout_dir(module)?
            .join(format!("{}.spec", module.package)))
    }

    fn run(&self, cwd: &Path, program: &str, args: &[&str]) -> Result<Output> {
        console::debug(format!("Running {program} {}", args.join(" ")));
        Command::new(program)
            .current_dir(cwd)
            .args(args)
            .output()
            .map_err(|e| {
                BumpError::Command(format!(
                    "Failed to execute '{program} {}': {e}",
                    args.join(" ")
                ))
            })
    }

    fn git(&self, module: &Module, args: &[&str]) -> Result<Output> {
        self.run(&self.checkout_dir(module)?, "git", args)
    }

    fn ensure_success(output: &Output, command: &str) -> std::result::Result<(), String> {
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        console::debug(String::from_utf8_lossy(&output.stdout));
        console::debug(&stderr);
        Err(format!("{command} failed: {}", stderr.trim()))
    }

    fn verify_mockbuild(&self, module: &Module, checkout: &Path) -> Result<()> {
        let output = self.run(checkout, "fedpkg", &["mockbuild"])?;
        Self::ensure_success(&output, "fedpkg mockbuild").map_err(|_| {
            BumpError::Build(format!("package {} failed mock test build", module.package))
        })?;

        let pattern = checkout
            .join(format!("results_{}", module.package))
            .join("*/*/*.rpm");
        let built = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| BumpError::Build(format!("invalid results pattern: {e}")))?
            .filter_map(|entry| entry.ok())
            .count();
        if built == 0 {
            return Err(BumpError::Build(format!(
                "package {} failed mock test build: no results",
                module.package
            )));
        }
        Ok(())
    }
}

impl RepositoryHost for DistGitHost {
    fn fetch_and_reset(&self, module: &Module, branch: &Branch) -> Result<()> {
        let checkout = self.checkout_dir(module)?;

        if !checkout.is_dir() {
            let output = self.run(&self.cache_dir, "fedpkg", &["co", &module.package])?;
            Self::ensure_success(&output, "fedpkg co").map_err(BumpError::Network)?;
        } else {
            let output = self.run(&checkout, "git", &["fetch"])?;
            Self::ensure_success(&output, "git fetch").map_err(BumpError::Network)?;
        }

        let remote = format!("origin/{}", branch.name);
        let steps: [&[&str]; 4] = [
            &["clean", "-dffx"],
            &["reset", "--hard", "HEAD"],
            &["checkout", branch.name.as_str()],
            &["reset", "--hard", remote.as_str()],
        ];
        for args in steps {
            let output = self.git(module, args)?;
            Self::ensure_success(&output, &format!("git {}", args.join(" ")))
                .map_err(BumpError::Command)?;
        }
        Ok(())
    }

    fn current_manifest_version(&self, module: &Module, _branch: &Branch) -> Result<Version> {
        let spec_path = self.spec_path(module)?;
        let spec = fs::read_to_string(&spec_path).map_err(|e| {
            BumpError::Command(format!("No spec file {}: {e}", spec_path.display()))
        })?;

        let raw = specfile::manifest_version(&spec)
            .ok_or_else(|| BumpError::VersionParse(String::new()))?;
        Version::parse(raw)
    }

    fn installed_version(&self, module: &Module) -> Result<Option<Version>> {
        validate_package_name(&module.package)?;
        let output = self.run(
            &self.cache_dir,
            "rpm",
            &["-q", "--queryformat", "%{VERSION}", &module.package],
        )?;
        if !output.status.success() {
            console::debug(format!("{} is not installed", module.package));
            return Ok(None);
        }
        Version::parse(String::from_utf8_lossy(&output.stdout).trim()).map(Some)
    }

    fn apply_update(
        &self,
        module: &Module,
        branch: &Branch,
        candidate: &UpdateCandidate,
    ) -> Result<CommitId> {
        let checkout = self.checkout_dir(module)?;
        let spec_path = self.spec_path(module)?;

        let tarball = self
            .upstream
            .download_tarball(module, &candidate.proposed, &checkout)?;
        let tarball_name = tarball
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = self.run(&checkout, "fedpkg", &["new-sources", &tarball_name])?;
        Self::ensure_success(&output, "fedpkg new-sources").map_err(|_| {
            BumpError::Build(format!("Failed to upload new sources for {}", module.package))
        })?;

        let spec = fs::read_to_string(&spec_path)?;
        fs::write(
            &spec_path,
            specfile::bump(&spec, &candidate.current, &candidate.proposed),
        )?;

        let comment = format!("Update to {}", candidate.proposed);
        let spec_name = format!("{}.spec", module.package);
        let output = self.run(
            &checkout,
            "rpmdev-bumpspec",
            &[
                "--legacy-datestamp",
                &format!("--comment={comment}"),
                &spec_name,
            ],
        )?;
        if let Err(e) = Self::ensure_success(&output, "rpmdev-bumpspec") {
            console::warn(format!("{}: {e}", module.name));
        }

        let output = self.run(&checkout, "fedpkg", &["prep"])?;
        Self::ensure_success(&output, "fedpkg prep").map_err(|_| {
            BumpError::Build(format!(
                "package {} failed prep (do the patches not apply?)",
                module.package
            ))
        })?;

        if self.mockbuild {
            self.verify_mockbuild(module, &checkout)?;
        }

        let output = self.git(module, &["commit", "-a", &format!("--message={comment}")])?;
        Self::ensure_success(&output, "git commit").map_err(BumpError::Command)?;

        let output = self.git(module, &["rev-parse", "HEAD"])?;
        Self::ensure_success(&output, "git rev-parse").map_err(BumpError::Command)?;
        let commit = CommitId(String::from_utf8_lossy(&output.stdout).trim().to_string());
        console::debug(format!("Committed {commit} on {}", branch.name));
        Ok(commit)
    }

    fn push(&self, module: &Module, branch: &Branch) -> Result<()> {
        let output = self.git(module, &["push", "origin", &branch.name])?;
        Self::ensure_success(&output, "git push").map_err(BumpError::Push)
    }

    fn fast_forward_merge(
        &self,
        module: &Module,
        source: &Branch,
        _head: &Branch,
    ) -> Result<MergeOutcome> {
        let output = self.git(module, &["merge", "--ff-only", &source.name])?;
        if output.status.success() {
            return Ok(MergeOutcome::Merged);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_diverged(&stderr) {
            return Ok(MergeOutcome::Diverged);
        }
        Err(BumpError::Command(format!(
            "git merge --ff-only {} failed: {}",
            source.name,
            stderr.trim()
        )))
    }

    fn cherry_pick(
        &self,
        module: &Module,
        commit: &CommitId,
        _head: &Branch,
    ) -> Result<PickOutcome> {
        let output = self.git(module, &["cherry-pick", &commit.0])?;
        if output.status.success() {
            return Ok(PickOutcome::Applied);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let abort = self.git(module, &["cherry-pick", "--abort"])?;
        if let Err(e) = Self::ensure_success(&abort, "git cherry-pick --abort") {
            console::warn(format!("{}: {e}", module.name));
        }
        if stderr.to_ascii_lowercase().contains("conflict") {
            return Ok(PickOutcome::Conflict);
        }
        Err(BumpError::Command(format!(
            "git cherry-pick {commit} failed: {}",
            stderr.trim()
        )))
    }

    fn trigger_build(
        &self,
        module: &Module,
        branch: &Branch,
        side_tag: Option<&str>,
    ) -> Result<BuildHandle> {
        let output = self.git(module, &["checkout", &branch.name])?;
        Self::ensure_success(&output, "git checkout").map_err(BumpError::Command)?;

        let mut args = vec!["build", "--nowait"];
        if let Some(tag) = side_tag {
            args.push("--target");
            args.push(tag);
        }
        let output = self.run(&self.checkout_dir(module)?, "fedpkg", &args)?;
        Self::ensure_success(&output, "fedpkg build").map_err(BumpError::Build)?;

        Ok(BuildHandle {
            branch: branch.name.clone(),
            task: parse_task_id(&String::from_utf8_lossy(&output.stdout)),
        })
    }
}

/// `git merge --ff-only` refused because the target has commits of its own,
/// as opposed to failing for any other reason.
fn is_diverged(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("not possible to fast-forward") || stderr.contains("can't be fast-forwarded")
}

fn parse_task_id(stdout: &str) -> Option<String> {
    let re = Regex::new(r"Created task:\s*(\d+)").ok()?;
    re.captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}

/// Package names end up in paths and command lines; only allow the
/// characters packaging guidelines permit.
fn validate_package_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'));
    if valid {
        Ok(())
    } else {
        Err(BumpError::Config(format!(
            "Refusing unsafe package name '{name}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::MockUpstream;
    use tempfile::tempdir;

    fn host(dir: &Path) -> DistGitHost {
        DistGitHost::new(dir, Arc::new(MockUpstream::new()), false).unwrap()
    }

    #[test]
    fn rejects_dangerous_package_names() {
        for name in ["", "../etc", "foo;rm", "a b", ".hidden", "x|y"] {
            assert!(validate_package_name(name).is_err(), "accepted {name:?}");
        }
        for name in ["gnome-shell", "glib2", "gtk4", "libsigc++30", "python3.12"] {
            assert!(validate_package_name(name).is_ok(), "rejected {name:?}");
        }
    }

    #[test]
    fn parses_build_task_id() {
        let stdout = "Building gnome-shell-48.1-1.fc43 for f43-candidate\n\
                      Created task: 123456789\n\
                      Task info: https://koji/taskinfo?taskID=123456789\n";
        assert_eq!(parse_task_id(stdout), Some("123456789".to_string()));
        assert_eq!(parse_task_id("nothing here"), None);
    }

    #[test]
    fn only_fast_forward_refusals_count_as_divergence() {
        assert!(is_diverged("fatal: Not possible to fast-forward, aborting.\n"));
        assert!(is_diverged(
            "hint: Diverging branches can't be fast-forwarded, you need to either:\n"
        ));
        assert!(!is_diverged(
            "merge: f43 - not something we can merge\n"
        ));
        assert!(!is_diverged(""));
    }

    #[test]
    fn reads_version_from_checked_out_spec() {
        let dir = tempdir().unwrap();
        let host = host(dir.path());
        let module = Module::new("gnome-calculator");
        let checkout = dir.path().join("gnome-calculator");
        fs::create_dir_all(&checkout).unwrap();
        fs::write(
            checkout.join("gnome-calculator.spec"),
            "Name: gnome-calculator\nVersion:        48~beta\n",
        )
        .unwrap();

        let version = host
            .current_manifest_version(&module, &Branch::new("rawhide"))
            .unwrap();
        assert_eq!(version, Version::parse("48.beta").unwrap());
    }

    #[test]
    fn macro_versions_are_parse_errors() {
        let dir = tempdir().unwrap();
        let host = host(dir.path());
        let module = Module::new("foo");
        let checkout = dir.path().join("foo");
        fs::create_dir_all(&checkout).unwrap();
        fs::write(checkout.join("foo.spec"), "Version: %{major}.1\n").unwrap();

        let err = host
            .current_manifest_version(&module, &Branch::new("rawhide"))
            .unwrap_err();
        assert!(matches!(err, BumpError::VersionParse(raw) if raw == "%{major}.1"));
    }

    #[test]
    fn missing_spec_is_reported() {
        let dir = tempdir().unwrap();
        let host = host(dir.path());
        let err = host
            .current_manifest_version(&Module::new("foo"), &Branch::new("rawhide"))
            .unwrap_err();
        assert!(matches!(err, BumpError::Command(_)));
    }
}
