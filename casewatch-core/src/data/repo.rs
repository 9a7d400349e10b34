//! Dataset repository working copy.
//!
//! The county/state case files live in a remote git repository. `sync()`
//! pulls into the local checkout; when that fails (network error, corrupted
//! checkout) the repository is cloned again from scratch and the pull is
//! attempted once more.
//!
//! A reclone goes into a sibling `<checkout>.new` directory and replaces the
//! checkout only once the clone succeeded. If the remote is unreachable the
//! old checkout stays on disk and can still be read.

use super::provider::DataError;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

const REPO_SOURCE_ID: &str = "dataset-repo";

/// Version-control operations the repository handle needs.
pub trait RepoBackend: Send + Sync {
    /// Create a fresh checkout of `url` at `dest` (which does not exist).
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), DataError>;

    /// Fast-forward an existing checkout to the remote head.
    fn pull(&self, checkout: &Path) -> Result<(), DataError>;
}

/// Backend that shells out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run<I, S>(&self, args: I) -> Result<(), DataError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| DataError::unavailable(REPO_SOURCE_ID, format!("spawn git: {e}")))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DataError::unavailable(
                REPO_SOURCE_ID,
                format!("git exited with {}: {}", output.status, stderr.trim()),
            ))
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoBackend for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), DataError> {
        self.run([
            OsStr::new("clone"),
            OsStr::new("--depth"),
            OsStr::new("1"),
            OsStr::new(url),
            dest.as_os_str(),
        ])
    }

    fn pull(&self, checkout: &Path) -> Result<(), DataError> {
        self.run([
            OsStr::new("-C"),
            checkout.as_os_str(),
            OsStr::new("pull"),
            OsStr::new("--ff-only"),
        ])
    }
}

/// How a successful sync got the checkout up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The incremental update worked on the existing (or newly cloned) checkout.
    Pulled,
    /// The incremental update failed; the checkout was replaced by a fresh clone.
    Recloned,
}

/// Handle on the local checkout of the dataset repository.
pub struct DatasetRepo {
    url: String,
    checkout_dir: PathBuf,
    backend: Arc<dyn RepoBackend>,
    lock: Mutex<()>,
}

impl DatasetRepo {
    pub fn new(
        url: impl Into<String>,
        checkout_dir: impl Into<PathBuf>,
        backend: Arc<dyn RepoBackend>,
    ) -> Self {
        Self {
            url: url.into(),
            checkout_dir: checkout_dir.into(),
            backend,
            lock: Mutex::new(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn checkout_dir(&self) -> &Path {
        &self.checkout_dir
    }

    pub fn has_checkout(&self) -> bool {
        self.checkout_dir.is_dir()
    }

    /// Bring the checkout up to date, recloning once if the pull fails.
    pub fn sync(&self) -> Result<SyncOutcome, DataError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        match self.incremental() {
            Ok(()) => {
                info!(dir = %self.checkout_dir.display(), "dataset repository pulled");
                Ok(SyncOutcome::Pulled)
            }
            Err(e) => {
                warn!(error = %e, "incremental sync failed, recloning");
                self.reclone()?;
                self.incremental()?;
                info!(dir = %self.checkout_dir.display(), "dataset repository recloned");
                Ok(SyncOutcome::Recloned)
            }
        }
    }

    /// Replace the checkout with a fresh clone, then pull.
    pub fn resync(&self) -> Result<(), DataError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        warn!(dir = %self.checkout_dir.display(), "forcing resync from a fresh clone");
        self.reclone()?;
        self.incremental()
    }

    /// Read one file from the checkout.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>, DataError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.checkout_dir.join(name);
        fs::read(&path).map_err(|e| DataError::MissingFile(format!("{}: {e}", path.display())))
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.checkout_dir.join(name).is_file()
    }

    fn incremental(&self) -> Result<(), DataError> {
        if !self.has_checkout() {
            self.backend.clone_repo(&self.url, &self.checkout_dir)?;
        }
        self.backend.pull(&self.checkout_dir)
    }

    fn staging_dir(&self) -> PathBuf {
        sibling(&self.checkout_dir, "new")
    }

    /// Clone into the staging directory, then swap it in for the checkout.
    /// On a failed clone the existing checkout is left untouched.
    fn reclone(&self) -> Result<(), DataError> {
        let staging = self.staging_dir();
        remove_dir(&staging)?;

        if let Err(e) = self.backend.clone_repo(&self.url, &staging) {
            let _ = remove_dir(&staging);
            if self.has_checkout() {
                warn!(error = %e, "reclone failed, keeping existing checkout");
            }
            return Err(e);
        }

        let retired = sibling(&self.checkout_dir, "old");
        remove_dir(&retired)?;
        if self.has_checkout() {
            fs::rename(&self.checkout_dir, &retired)
                .map_err(|e| rename_error(&self.checkout_dir, e))?;
        }
        fs::rename(&staging, &self.checkout_dir).map_err(|e| rename_error(&staging, e))?;
        remove_dir(&retired)
    }
}

/// `<dir>.<suffix>` next to `dir`.
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.file_name().map(OsStr::to_os_string).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    dir.with_file_name(name)
}

fn remove_dir(dir: &Path) -> Result<(), DataError> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .map_err(|e| DataError::CacheError(format!("discarding {}: {e}", dir.display())))?;
    }
    Ok(())
}

fn rename_error(from: &Path, e: std::io::Error) -> DataError {
    DataError::CacheError(format!("replacing checkout from {}: {e}", from.display()))
}
