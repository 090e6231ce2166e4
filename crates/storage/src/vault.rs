//! Vault addressing: `<hash[0:3]>/<hash[3:]>.gpx` under the vault root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use track_common::{GeekError, GeekResult};
use track_library::hash_file;

/// Length of the leading directory component of a vault path.
const PREFIX_LEN: usize = 3;

/// Directory of GPX files named by content hash.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    /// Use `root` as a vault, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> GeekResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        // Canonical so containment checks survive `..` and symlinked temp dirs.
        let root = fs::canonicalize(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a hash relative to the vault root.
    pub fn relative_path(hash: &str) -> GeekResult<PathBuf> {
        let valid = hash.len() > PREFIX_LEN
            && hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(GeekError::NotFound(format!(
                "'{}' is not a lowercase hex content hash",
                hash
            )));
        }
        let (prefix, rest) = hash.split_at(PREFIX_LEN);
        Ok(Path::new(prefix).join(format!("{}.gpx", rest)))
    }

    /// Absolute path of a hash inside this vault.
    pub fn path(&self, hash: &str) -> GeekResult<PathBuf> {
        Ok(self.root.join(Self::relative_path(hash)?))
    }

    /// `path` relative to the vault root, or `VaultMismatch` if it lies outside.
    pub fn relativize(&self, path: &Path) -> GeekResult<PathBuf> {
        let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        resolved
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| GeekError::VaultMismatch {
                path: path.to_path_buf(),
                vault: self.root.clone(),
            })
    }

    /// Copy `source` into the vault under `hash` and check the copy's hash.
    ///
    /// A copy that does not hash back to `hash` is removed.
    pub fn store(&self, source: &Path, hash: &str) -> GeekResult<PathBuf> {
        let target = self.path(hash)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &target)?;

        let copied = hash_file(&target)?;
        if copied != hash {
            fs::remove_file(&target)?;
            return Err(GeekError::track(
                source,
                format!("Vault copy hashed to {} instead of {}", copied, hash),
            ));
        }
        debug!(source = %source.display(), target = %target.display(), "Copied track into vault");
        Ok(target)
    }

    /// Whether the file for `hash` exists and still hashes to `hash`.
    pub fn verify(&self, hash: &str) -> GeekResult<bool> {
        let path = self.path(hash)?;
        if !path.is_file() {
            return Ok(false);
        }
        Ok(hash_file(&path)? == hash)
    }
}
