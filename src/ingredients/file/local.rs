//! `file` protocol: copy an artifact from the local filesystem.

use super::hashers::{guess_hash_type, verify_file};
use super::{FileProperties, FileProvider, FileSpec, HashType, ProviderFactory};
use crate::core::error::{CookError, Result};
use crate::core::reader::CancelToken;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROTOCOLS: &[&str] = &["file"];

/// Factory for [`LocalFile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFactory;

impl ProviderFactory for LocalFactory {
    fn protocols(&self) -> &'static [&'static str] {
        PROTOCOLS
    }

    fn build(&self, spec: FileSpec) -> Result<Box<dyn FileProvider>> {
        Ok(Box::new(LocalFile::new(spec)?))
    }
}

/// A local file artifact.
#[derive(Debug, Clone)]
pub struct LocalFile {
    spec: FileSpec,
    source: PathBuf,
}

/// Outcome of hashing the destination.
enum Check {
    Missing,
    Matches,
    Differs { actual: String },
}

impl LocalFile {
    pub fn new(spec: FileSpec) -> Result<Self> {
        let source = source_path(&spec.source);
        if source.as_os_str().is_empty() {
            return Err(CookError::InvalidFileSpec {
                id: spec.id.clone(),
                message: format!("empty source path in '{}'", spec.source),
            });
        }
        Ok(Self { spec, source })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.spec.destination
    }

    fn hash_type(&self, expected: &str) -> Result<HashType> {
        self.spec
            .properties
            .hash_type
            .or_else(|| guess_hash_type(expected))
            .ok_or_else(|| CookError::UnsupportedHash {
                hash_type: format!("unknown (cannot guess from '{expected}')"),
            })
    }

    fn check(&self, cancel: &CancelToken) -> Result<Check> {
        cancel.check()?;
        let dest = self.destination();
        match std::fs::metadata(dest) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Check::Missing),
            Err(e) => return Err(CookError::io(dest, e)),
        }
        let Some(expected) = self.spec.hash.as_deref() else {
            return Ok(Check::Matches);
        };
        let (actual, matches) = verify_file(dest, expected, self.hash_type(expected)?)?;
        Ok(if matches {
            Check::Matches
        } else {
            Check::Differs { actual }
        })
    }
}

impl FileProvider for LocalFile {
    fn protocols(&self) -> &'static [&'static str] {
        PROTOCOLS
    }

    fn download(&self, cancel: &CancelToken) -> Result<()> {
        if let Check::Matches = self.check(cancel)? {
            debug!(id = %self.spec.id, dest = %self.destination().display(), "already up to date");
            return Ok(());
        }
        cancel.check()?;
        let dest = self.destination();
        std::fs::copy(&self.source, dest).map_err(|e| CookError::io(&self.source, e))?;
        info!(
            id = %self.spec.id,
            source = %self.source.display(),
            dest = %dest.display(),
            "copied file"
        );
        match self.check(cancel)? {
            Check::Matches => Ok(()),
            Check::Differs { actual } => Err(CookError::HashMismatch {
                id: self.spec.id.clone(),
                path: dest.to_path_buf(),
                expected: self.spec.hash.clone().unwrap_or_default(),
                actual,
            }),
            Check::Missing => Err(CookError::io(
                dest,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )),
        }
    }

    fn verify(&self, cancel: &CancelToken) -> Result<bool> {
        Ok(matches!(self.check(cancel)?, Check::Matches))
    }

    fn properties(&self) -> &FileProperties {
        &self.spec.properties
    }
}

/// Filesystem path of a `file://` URL or bare path.
fn source_path(source: &str) -> PathBuf {
    PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::ingredients::file::hashers::hash_file;
    use crate::ingredients::file::ProviderRegistry;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        dest: PathBuf,
    }

    fn fixture(content: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.conf");
        std::fs::write(&source, content).unwrap();
        let dest = dir.path().join("dest.conf");
        Fixture {
            _dir: dir,
            source,
            dest,
        }
    }

    fn local(f: &Fixture, hash: Option<String>) -> LocalFile {
        LocalFile::new(FileSpec {
            id: "dev:conf".into(),
            source: format!("file://{}", f.source.display()),
            destination: f.dest.clone(),
            hash,
            properties: FileProperties::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_source_path_forms() {
        assert_eq!(source_path("file:///srv/a.conf"), PathBuf::from("/srv/a.conf"));
        assert_eq!(source_path("/srv/a.conf"), PathBuf::from("/srv/a.conf"));
    }

    #[test]
    fn test_verify_missing_destination() {
        let f = fixture("hello");
        let cancel = CancelToken::new();
        assert!(!local(&f, None).verify(&cancel).unwrap());
    }

    #[test]
    fn test_verify_no_hash_existence_is_enough() {
        let f = fixture("hello");
        std::fs::write(&f.dest, "anything").unwrap();
        assert!(local(&f, None).verify(&CancelToken::new()).unwrap());
    }

    #[test]
    fn test_download_copies_and_verifies() {
        let f = fixture("hello world");
        let hash = hash_file(&f.source, HashType::Sha256).unwrap();
        let provider = local(&f, Some(hash));
        let cancel = CancelToken::new();
        assert!(!provider.verify(&cancel).unwrap());
        provider.download(&cancel).unwrap();
        assert_eq!(std::fs::read_to_string(&f.dest).unwrap(), "hello world");
        assert!(provider.verify(&cancel).unwrap());
    }

    #[test]
    fn test_download_noop_when_verified() {
        let f = fixture("new");
        std::fs::write(&f.dest, "kept").unwrap();
        let provider = local(&f, None);
        provider.download(&CancelToken::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&f.dest).unwrap(), "kept");
    }

    #[test]
    fn test_download_replaces_stale_destination() {
        let f = fixture("fresh");
        std::fs::write(&f.dest, "stale").unwrap();
        let hash = format!("blake3:{}", hash_file(&f.source, HashType::Blake3).unwrap());
        local(&f, Some(hash)).download(&CancelToken::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&f.dest).unwrap(), "fresh");
    }

    #[test]
    fn test_download_hash_mismatch() {
        let f = fixture("hello");
        let provider = local(&f, Some("0".repeat(64)));
        let err = provider.download(&CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        match err {
            CookError::HashMismatch { id, path, .. } => {
                assert_eq!(id, "dev:conf");
                assert_eq!(path, f.dest);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_download_missing_source() {
        let f = fixture("hello");
        std::fs::remove_file(&f.source).unwrap();
        let err = local(&f, None).download(&CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_unguessable_hash() {
        let f = fixture("hello");
        std::fs::write(&f.dest, "hello").unwrap();
        let err = local(&f, Some("abc".into()))
            .verify(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CookError::UnsupportedHash { .. }));
    }

    #[test]
    fn test_cancelled_before_verify() {
        let f = fixture("hello");
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = local(&f, None).download(&cancel).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(!f.dest.exists());
    }

    #[test]
    fn test_built_through_registry() {
        let f = fixture("via registry");
        let spec = FileSpec {
            id: "dev:conf".into(),
            source: f.source.display().to_string(),
            destination: f.dest.clone(),
            hash: None,
            properties: FileProperties {
                hash_type: Some(HashType::Sha512),
                ..FileProperties::default()
            },
        };
        let provider = ProviderRegistry::with_defaults().provider_for(spec).unwrap();
        assert_eq!(provider.properties().hash_type, Some(HashType::Sha512));
        provider.download(&CancelToken::new()).unwrap();
        assert!(f.dest.exists());
    }

    #[test]
    fn test_empty_source_rejected() {
        let err = LocalFile::new(FileSpec {
            id: "dev:conf".into(),
            source: "file://".into(),
            destination: PathBuf::from("/tmp/x"),
            hash: None,
            properties: FileProperties::default(),
        })
        .unwrap_err();
        assert!(matches!(err, CookError::InvalidFileSpec { .. }));
    }
}
