//! Baseline stores
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use visualcheck_core_types::{BaselineKey, CapturedImage};

use crate::errors::{CheckError, CheckResult};
use crate::ports::BaselineStore;

const EXTENSION: &str = "png";

/// Lossless PNG files under a root directory, one per baseline name.
#[derive(Debug, Clone)]
pub struct FsBaselineStore {
    root: PathBuf,
}

impl FsBaselineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &BaselineKey) -> PathBuf {
        self.root.join(format!("{}.{EXTENSION}", key.as_str()))
    }
}

impl BaselineStore for FsBaselineStore {
    fn load(&self, key: &BaselineKey) -> CheckResult<Option<CapturedImage>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(CheckError::Store(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        let image = CapturedImage::from_png(&bytes)
            .map_err(|err| CheckError::Store(format!("{}: {err}", path.display())))?;
        tracing::debug!(baseline = %key, path = %path.display(), "loaded baseline");
        Ok(Some(image))
    }

    fn save(&self, key: &BaselineKey, image: &CapturedImage) -> CheckResult<()> {
        let path = self.path_for(key);
        let data = image
            .to_png()
            .map_err(|err| CheckError::Store(err.to_string()))?;
        write_atomic(&path, &data).map_err(|err| {
            CheckError::Store(format!("failed to write {}: {err}", path.display()))
        })?;
        tracing::info!(baseline = %key, path = %path.display(), "saved baseline");
        Ok(())
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Process-local store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryBaselineStore {
    entries: DashMap<BaselineKey, CapturedImage>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &BaselineKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BaselineStore for InMemoryBaselineStore {
    fn load(&self, key: &BaselineKey) -> CheckResult<Option<CapturedImage>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn save(&self, key: &BaselineKey, image: &CapturedImage) -> CheckResult<()> {
        self.entries.insert(key.clone(), image.clone());
        Ok(())
    }
}
