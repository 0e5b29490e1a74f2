use crate::error::{BumpError, Result};
use crate::utils::console;
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCK_FILE_NAME: &str = "distbump.lock";

/// PID lock over the checkout cache. Released when dropped.
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    pub fn acquire<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(LOCK_FILE_NAME);

        if path.exists() {
            let contents = fs::read_to_string(&path).unwrap_or_default();
            match contents.trim().parse::<u32>() {
                Ok(pid) if pid != std::process::id() && process_alive(pid) => {
                    return Err(BumpError::Lock(format!(
                        "another run (PID {pid}) holds {}",
                        path.display()
                    )));
                }
                Ok(pid) => console::warn(format!(
                    "Process with PID {pid} locked the cache but did not release it; \
                     a previous run died uncleanly, branches will be reset from the remote"
                )),
                Err(_) => console::warn(format!(
                    "Ignoring unreadable lock file {}",
                    path.display()
                )),
            }
        }

        fs::write(&path, std::process::id().to_string())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).is_dir()
}
