use super::UpstreamSource;
use crate::error::{BumpError, Result};
use crate::registry::Module;
use crate::utils::console;
use crate::version::Version;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MIRROR: &str = "https://download.gnome.org/sources";
const MAX_INDEX_BYTES: usize = 10 * 1024 * 1024;

/// Release index of one module, taken from the mirror's `cache.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseIndex {
    pub versions: Vec<String>,
    /// Release version to tarball path relative to the module directory.
    pub tarballs: HashMap<String, String>,
}

impl ReleaseIndex {
    /// `cache.json` is a four element array: format version, per-release
    /// files, release list and the LATEST-IS markers.
    pub fn parse(module: &str, body: &str) -> Result<Self> {
        let entries: Vec<Value> = serde_json::from_str(body)?;

        let versions = match entries.get(2).and_then(|v| v.get(module)) {
            Some(list) => serde_json::from_value::<Vec<String>>(list.clone())?,
            None => return Err(BumpError::NotFound(module.to_string())),
        };

        let mut tarballs = HashMap::new();
        if let Some(files) = entries
            .get(1)
            .and_then(|v| v.get(module))
            .and_then(Value::as_object)
        {
            for (version, kinds) in files {
                let path = ["tar.xz", "tar.gz"]
                    .iter()
                    .find_map(|kind| kinds.get(*kind).and_then(Value::as_str));
                if let Some(path) = path {
                    tarballs.insert(version.clone(), path.to_string());
                }
            }
        }

        Ok(Self { versions, tarballs })
    }
}

/// Upstream source backed by a GNOME-style download mirror.
pub struct GnomeMirror {
    client: Client,
    base_url: String,
    indexes: Mutex<HashMap<String, ReleaseIndex>>,
}

impl GnomeMirror {
    pub fn new(base_url: &str) -> Result<Self> {
        validate_mirror_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("distbump/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BumpError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            indexes: Mutex::new(HashMap::new()),
        })
    }

    fn index(&self, module: &str) -> Result<ReleaseIndex> {
        if let Some(index) = self.cached(module) {
            return Ok(index);
        }

        let url = format!("{}/{}/cache.json", self.base_url, module);
        console::debug(format!("Fetching: {url}"));

        let body = self.get(&url, module)?.text().map_err(|e| {
            BumpError::Network(format!("Failed to read {url}: {e}"))
        })?;
        if body.len() > MAX_INDEX_BYTES {
            return Err(BumpError::Network(format!(
                "{url} exceeded the 10MB index limit"
            )));
        }

        let index = ReleaseIndex::parse(module, &body)?;
        if let Ok(mut indexes) = self.indexes.lock() {
            indexes.insert(module.to_string(), index.clone());
        }
        Ok(index)
    }

    fn cached(&self, module: &str) -> Option<ReleaseIndex> {
        self.indexes
            .lock()
            .ok()
            .and_then(|indexes| indexes.get(module).cloned())
    }

    fn get(&self, url: &str, module: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| BumpError::Network(format!("Request to {url} failed: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(BumpError::NotFound(module.to_string())),
            status => Err(BumpError::Network(format!("HTTP {status}: {url}"))),
        }
    }
}

impl UpstreamSource for GnomeMirror {
    fn available_versions(&self, module: &Module) -> Result<Vec<String>> {
        Ok(self.index(&module.name)?.versions)
    }

    fn download_tarball(
        &self,
        module: &Module,
        version: &Version,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let index = self.index(&module.name)?;
        let relative = index.tarballs.get(version.as_str()).ok_or_else(|| {
            BumpError::NotFound(format!("{} tarball for {}", module.name, version))
        })?;

        let file_name = relative.rsplit('/').next().unwrap_or(relative);
        let dest = dest_dir.join(file_name);
        if dest.exists() {
            console::debug(format!("Source {file_name} already exists"));
            return Ok(dest);
        }

        let url = format!("{}/{}/{}", self.base_url, module.name, relative);
        console::debug(format!("Download {url}"));
        let bytes = self
            .get(&url, &module.name)?
            .bytes()
            .map_err(|e| BumpError::Network(format!("Failed to get tarball: {e}")))?;
        fs::write(&dest, &bytes)?;
        Ok(dest)
    }
}

pub fn validate_mirror_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|_| BumpError::Config(format!("Invalid upstream URL: {url}")))?;

    match parsed.scheme() {
        "https" | "http" => Ok(()),
        scheme => Err(BumpError::Config(format!(
            "Unsupported upstream URL scheme: {scheme}"
        ))),
    }
}
