//! File ingredient providers.
//!
//! A [`FileProvider`] fetches one artifact (`source`) to a destination and
//! verifies it against an expected hash. Providers are built by a
//! [`ProviderFactory`] looked up by the protocol of the source URL in an
//! explicit [`ProviderRegistry`].

pub mod hashers;
pub mod local;

use crate::core::document::StepProperties;
use crate::core::error::{CookError, Result};
use crate::core::reader::CancelToken;
use crate::core::types::StepId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Protocol assumed for a source with no `scheme://`.
pub const DEFAULT_PROTOCOL: &str = "file";

/// Digest algorithm of an expected hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    Sha256,
    Sha512,
    Blake3,
}

impl FromStr for HashType {
    type Err = CookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(CookError::UnsupportedHash {
                hash_type: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Provider-facing properties of a file step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileProperties {
    /// Explicit algorithm; guessed from the hash when absent.
    #[serde(default)]
    pub hash_type: Option<HashType>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Everything a factory needs to build a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSpec {
    pub id: String,
    pub source: String,
    pub destination: PathBuf,
    pub hash: Option<String>,
    pub properties: FileProperties,
}

impl FileSpec {
    /// Build a spec from a recipe step: `source` is the artifact, `name` the
    /// destination.
    pub fn from_step(step: &StepId, props: &StepProperties) -> Result<Self> {
        let id = step.to_string();
        let invalid = |message: &str| CookError::InvalidFileSpec {
            id: id.clone(),
            message: message.to_string(),
        };
        let source = props
            .source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| invalid("missing source"))?;
        let destination = props
            .name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| invalid("missing destination name"))?;
        let hash_type = props.hash_type.as_deref().map(str::parse::<HashType>).transpose()?;
        Ok(Self {
            id: id.clone(),
            source: source.to_string(),
            destination: PathBuf::from(destination),
            hash: props.hash.clone().filter(|h| !h.trim().is_empty()),
            properties: FileProperties {
                hash_type,
                extra: props.extra.clone(),
            },
        })
    }

    /// Protocol of the source: the scheme before `://`, or `file`.
    pub fn protocol(&self) -> &str {
        protocol_of(&self.source)
    }
}

/// Scheme of `source`, or [`DEFAULT_PROTOCOL`] for a bare path.
pub fn protocol_of(source: &str) -> &str {
    source
        .split_once("://")
        .map_or(DEFAULT_PROTOCOL, |(scheme, _)| scheme)
}

/// A single artifact fetched to a destination.
pub trait FileProvider: fmt::Debug + Send + Sync {
    /// Protocols this provider serves.
    fn protocols(&self) -> &'static [&'static str];

    /// Make the destination match the source. No-op when already verified.
    fn download(&self, cancel: &CancelToken) -> Result<()>;

    /// Whether the destination exists and matches the expected hash.
    fn verify(&self, cancel: &CancelToken) -> Result<bool>;

    fn properties(&self) -> &FileProperties;
}

/// Builds providers for one or more protocols.
pub trait ProviderFactory: Send + Sync {
    fn protocols(&self) -> &'static [&'static str];

    fn build(&self, spec: FileSpec) -> Result<Box<dyn FileProvider>>;
}

/// Protocol → factory table. Constructed explicitly; there is no global
/// registration.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: IndexMap<String, Arc<dyn ProviderFactory>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("protocols", &self.protocols())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry serving the built-in protocols.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(local::LocalFactory));
        registry
    }

    /// Register `factory` for each protocol it serves, replacing any
    /// previous factory for that protocol.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        for protocol in factory.protocols() {
            debug!(protocol, "registered file provider");
            self.factories.insert((*protocol).to_string(), Arc::clone(&factory));
        }
    }

    pub fn protocols(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the provider for `spec`'s source protocol.
    pub fn provider_for(&self, spec: FileSpec) -> Result<Box<dyn FileProvider>> {
        let protocol = spec.protocol().to_string();
        let factory = self
            .factories
            .get(&protocol)
            .ok_or(CookError::UnknownProtocol { protocol })?;
        factory.build(spec)
    }
}
