//! Content-reader capability: existence probes and raw reads of recipe files.
//!
//! The resolver and collector only touch storage through [`ContentReader`],
//! so a sprout can live on the local filesystem ([`LocalFs`]) or anywhere
//! else ([`MemorySprout`] keeps one in memory).

use super::error::{CookError, Result};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Storage backend of a sprout.
pub trait ContentReader {
    /// Canonical form of a sprout base path.
    fn root(&self, base: &Path) -> Result<PathBuf>;

    /// Canonical path of `path` if it is an existing file, `None` if absent.
    fn probe(&self, path: &Path) -> Result<Option<PathBuf>>;

    /// Raw bytes of `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

impl<R: ContentReader + ?Sized> ContentReader for &R {
    fn root(&self, base: &Path) -> Result<PathBuf> {
        (**self).root(base)
    }

    fn probe(&self, path: &Path) -> Result<Option<PathBuf>> {
        (**self).probe(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read(path)
    }
}

/// Plain filesystem access.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

impl ContentReader for LocalFs {
    fn root(&self, base: &Path) -> Result<PathBuf> {
        std::fs::canonicalize(base).map_err(|e| {
            if is_absent(&e) {
                CookError::SproutNotFound {
                    base: base.to_path_buf(),
                }
            } else {
                CookError::io(base, e)
            }
        })
    }

    fn probe(&self, path: &Path) -> Result<Option<PathBuf>> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => std::fs::canonicalize(path)
                .map(Some)
                .map_err(|e| CookError::io(path, e)),
            Ok(_) => Ok(None),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(CookError::io(path, e)),
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| CookError::io(path, e))
    }
}

/// A sprout held in memory, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MemorySprout {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySprout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    /// Builder form of [`MemorySprout::insert`].
    pub fn with(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ContentReader for MemorySprout {
    fn root(&self, base: &Path) -> Result<PathBuf> {
        if self.files.keys().any(|p| p.starts_with(base)) {
            Ok(base.to_path_buf())
        } else {
            Err(CookError::SproutNotFound {
                base: base.to_path_buf(),
            })
        }
    }

    fn probe(&self, path: &Path) -> Result<Option<PathBuf>> {
        Ok(self
            .files
            .contains_key(path)
            .then(|| path.to_path_buf()))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CookError::io(path, io::Error::from(io::ErrorKind::NotFound)))
    }
}

/// Cooperative cancellation flag shared between a caller and a resolution run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`CancelToken::cancel`] was called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CookError::Cancelled)
        } else {
            Ok(())
        }
    }
}
