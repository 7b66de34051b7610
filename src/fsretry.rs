//! Filesystem operations with bounded retry
//!
//! Plot and drill writers release their files late on some hosts and
//! directory listings can lag behind deletes. Every mutating call here is
//! idempotent and polls the filesystem until the change is visible or the
//! retry budget runs out.

use crate::error::{ExportError, Result, ResultExt};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry budget applied to every single file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,

    /// Sleep between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 10,
            interval: Duration::from_millis(100),
        }
    }
}

/// Retrying wrapper around remove, rename and mkdir
#[derive(Debug, Clone, Default)]
pub struct RetryFs {
    policy: RetryPolicy,
}

impl RetryFs {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Remove every file matching `pattern`; nothing matching is fine
    pub fn remove_if_exists(&self, pattern: &Path) -> Result<()> {
        let matches = expand_pattern(pattern).with_path_context("expand pattern", pattern)?;

        for path in matches.iter().filter(|p| p.is_file()) {
            debug!("Removing file {}", path.display());
            self.remove_file_polled(path)
                .with_path_context("remove file", path)?;
        }

        Ok(())
    }

    /// Rename `src` to `dst` when `src` exists; returns whether a rename happened
    pub fn rename_if_exists(&self, src: &Path, dst: &Path) -> Result<bool> {
        if !src.exists() {
            debug!("Nothing to rename at {}", src.display());
            return Ok(false);
        }

        self.rename(src, dst)?;
        Ok(true)
    }

    /// Rename `src` to `dst`, replacing `dst` and retrying on failure
    ///
    /// Renaming a path onto itself leaves the file untouched.
    pub fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        if src == dst {
            debug!("{} already has its target name", src.display());
            return Ok(());
        }

        let mut attempt = 1;
        loop {
            match self.try_rename(src, dst) {
                Ok(()) => {
                    debug!("Renamed {} to {}", src.display(), dst.display());
                    return Ok(());
                }
                Err(source) if attempt > self.policy.retries => {
                    return Err(ExportError::RenameFailed {
                        src: src.to_path_buf(),
                        dst: dst.to_path_buf(),
                        attempts: attempt,
                        source,
                    }
                    .into());
                }
                Err(e) => {
                    warn!(
                        "Rename {} to {} failed (attempt {}): {}",
                        src.display(),
                        dst.display(),
                        attempt,
                        e
                    );
                    thread::sleep(self.policy.interval);
                    attempt += 1;
                }
            }
        }
    }

    /// Remove every directory tree matching `pattern`
    pub fn remove_dir_if_exists(&self, pattern: &Path) -> Result<()> {
        let matches = expand_pattern(pattern).with_path_context("expand pattern", pattern)?;

        for path in matches.iter().filter(|p| p.is_dir()) {
            debug!("Removing directory {}", path.display());
            match fs::remove_dir_all(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e).with_path_context("remove directory", path),
            }

            if !self.wait_until(|| !path.exists()) {
                warn!("Directory still visible after removal: {}", path.display());
            }
        }

        Ok(())
    }

    /// Create `path` (and parents) and wait until it is visible
    pub fn make_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_path_context("create directory", path)?;

        if !self.wait_until(|| path.is_dir()) {
            warn!("Directory not visible after creation: {}", path.display());
        }

        Ok(())
    }

    fn try_rename(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if dst.exists() {
            self.remove_file_polled(dst)?;
        }
        fs::rename(src, dst)
    }

    fn remove_file_polled(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        }

        if !self.wait_until(|| !path.exists()) {
            warn!("File still visible after removal: {}", path.display());
        }
        Ok(())
    }

    /// Poll `done` up to the retry budget
    fn wait_until<F: Fn() -> bool>(&self, done: F) -> bool {
        for _ in 0..self.policy.retries {
            if done() {
                return true;
            }
            thread::sleep(self.policy.interval);
        }
        done()
    }
}

/// Expand `*` and `?` in the last component of `pattern` to existing paths
///
/// A pattern without wildcards expands to itself when it exists.
pub fn expand_pattern(pattern: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(name) = pattern.file_name().and_then(|name| name.to_str()) else {
        return Ok(existing(pattern));
    };

    if !name.contains(['*', '?']) {
        return Ok(existing(pattern));
    }

    let parent = match pattern.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Ok(Vec::new());
    }

    let regex = wildcard_regex(name)?;
    let mut matches = Vec::new();
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        if let Some(file_name) = entry.file_name().to_str() {
            if regex.is_match(file_name) {
                matches.push(entry.path());
            }
        }
    }
    matches.sort();

    debug!(
        "Pattern {} matched {} entries",
        pattern.display(),
        matches.len()
    );
    Ok(matches)
}

fn existing(path: &Path) -> Vec<PathBuf> {
    if path.exists() {
        vec![path.to_path_buf()]
    } else {
        Vec::new()
    }
}

fn wildcard_regex(name: &str) -> io::Result<Regex> {
    let mut expr = String::from("^");
    for c in name.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}
