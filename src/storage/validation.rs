//! Path validation
//!
//! Confines user-supplied paths to the vault root and sanitizes upload names.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{VaultError, VaultResult};
use crate::storage::STAGING_SUFFIX;

const MAX_FILENAME_BYTES: usize = 255;

/// The canonical vault root. Every path derived from user input is resolved
/// through it before touching the filesystem.
#[derive(Debug, Clone)]
pub struct VaultRoot {
    root: PathBuf,
}

impl VaultRoot {
    /// Canonicalizes `path`, which must be an existing directory.
    pub fn new(path: &Path) -> io::Result<Self> {
        let root = path.canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolves `subpath` under the root.
    ///
    /// Existing prefixes are canonicalized one component at a time, so `..`
    /// after a symlink applies to the link target, as the kernel would.
    /// Components that do not exist yet are appended lexically. The result is
    /// always the root itself or nested below it.
    pub fn resolve(&self, subpath: &str) -> VaultResult<PathBuf> {
        let violation = || VaultError::PathViolation(subpath.to_string());
        let mut current = self.root.clone();

        for component in Path::new(subpath).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !current.pop() || !current.starts_with(&self.root) {
                        return Err(violation());
                    }
                }
                Component::Normal(name) => {
                    let candidate = current.join(name);
                    if candidate.symlink_metadata().is_ok() {
                        // Dangling links fail here and are refused outright.
                        current = candidate.canonicalize().map_err(|_| violation())?;
                    } else {
                        current = candidate;
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(violation()),
            }

            if !current.starts_with(&self.root) {
                return Err(violation());
            }
        }

        Ok(current)
    }

    /// `/`-joined path of `path` relative to the root, empty for the root itself.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}

/// Validates an upload filename, returning the trimmed name.
pub fn sanitize_filename(raw: &str) -> VaultResult<String> {
    let name = raw.trim();
    let invalid = |reason: &str| VaultError::InvalidRequest(format!("Invalid filename: {reason}"));

    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("reserved name"));
    }
    if name.contains(['/', '\\']) || name.chars().any(char::is_control) {
        return Err(invalid("contains a path separator or control character"));
    }
    if name.starts_with('.') {
        return Err(invalid("hidden names are not accepted"));
    }
    if name.ends_with(STAGING_SUFFIX) {
        return Err(invalid("reserved suffix"));
    }
    if name.len() > MAX_FILENAME_BYTES {
        return Err(invalid("too long"));
    }

    Ok(name.to_string())
}
