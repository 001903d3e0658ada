//! Pre-flight checks for callprof
//!
//! Validates the profiling target before any instrumentation starts and
//! resolves it to the form the tracer filters on.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::domain::{FunctionIdentity, ProfilerError};

/// The source file whose call boundaries a session records.
#[derive(Debug)]
pub struct Target {
    /// Canonical path, symlinks resolved.
    path: PathBuf,
    /// Absolute form of the path the session was configured with.
    configured: PathBuf,
    file: String,
    /// Reported absolute paths already checked against `path`.
    resolved: Mutex<HashMap<PathBuf, bool>>,
}

impl Target {
    /// Check that `path` is an existing file and canonicalize it.
    ///
    /// # Errors
    /// [`ProfilerError::TargetNotFound`] if nothing exists at `path`,
    /// [`ProfilerError::TargetNotAFile`] if it is a directory.
    pub fn resolve(path: &Path) -> Result<Self, ProfilerError> {
        check_target_exists(path)?;
        let canonical = std::fs::canonicalize(path)?;
        let configured = std::path::absolute(path)?;
        Ok(Self::with_paths(canonical, configured))
    }

    /// Build a target from an already canonical path without touching the
    /// filesystem.
    pub(crate) fn from_canonical(path: PathBuf) -> Self {
        Self::with_paths(path.clone(), path)
    }

    fn with_paths(path: PathBuf, configured: PathBuf) -> Self {
        let file = configured.to_string_lossy().into_owned();
        Self { path, configured, file, resolved: Mutex::new(HashMap::new()) }
    }

    /// Canonical path of the target.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured target path, made absolute, as reported in call
    /// locations.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Whether a reported location file refers to this target.
    ///
    /// Absolute paths match the configured or canonical path directly, or
    /// after canonicalization. Relative paths (such as the output of
    /// `file!()`) match when, with `.` components dropped, they form a
    /// trailing component sequence of either path.
    pub fn matches(&self, file: &str) -> bool {
        let file = Path::new(file);
        if file.is_absolute() {
            file == self.path || file == self.configured || self.canonicalizes_to_target(file)
        } else {
            let relative: PathBuf =
                file.components().filter(|c| !matches!(c, Component::CurDir)).collect();
            !relative.as_os_str().is_empty()
                && (self.path.ends_with(&relative) || self.configured.ends_with(&relative))
        }
    }

    fn canonicalizes_to_target(&self, file: &Path) -> bool {
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        *resolved.entry(file.to_path_buf()).or_insert_with(|| {
            std::fs::canonicalize(file).is_ok_and(|canonical| canonical == self.path)
        })
    }

    /// The synthetic whole-program identity, named after the configured path.
    pub fn main_identity(&self) -> FunctionIdentity {
        FunctionIdentity::main(&self.file)
    }
}

/// Check that the target exists and is a regular file.
fn check_target_exists(path: &Path) -> Result<(), ProfilerError> {
    if !path.exists() {
        return Err(ProfilerError::TargetNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ProfilerError::TargetNotAFile(path.to_path_buf()));
    }
    Ok(())
}
