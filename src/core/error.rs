//! Error type shared by the resolver, extractors, collector and providers.
//!
//! Every failure is a [`CookError`] variant. Callers branch on
//! [`CookError::kind`] instead of matching message text; the kind is stable
//! across the [`CookError::InRecipe`] wrapping the collector adds when an
//! error crosses a recipe boundary.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = CookError> = std::result::Result<T, E>;

/// Coarse classification of a [`CookError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Parse,
    Io,
    Cancelled,
    Plan,
    Provider,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Parse => write!(f, "parse error"),
            Self::Io => write!(f, "I/O error"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Plan => write!(f, "plan error"),
            Self::Provider => write!(f, "provider error"),
            Self::Config => write!(f, "config error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CookError {
    /// No naming rule produced an existing file.
    #[error("recipe '{name}' not found in {}", base.display())]
    RecipeNotFound { name: String, base: PathBuf },

    /// The sprout's base path does not exist.
    #[error("sprout root {} does not exist", base.display())]
    SproutNotFound { base: PathBuf },

    /// A relative recipe reference with no referencing file.
    #[error("relative recipe '{name}' has no referencing recipe to resolve against")]
    NoRelativeBase { name: String },

    /// A path that resolves outside the sprout's base path.
    #[error("{} is outside sprout root {}", path.display(), base.display())]
    OutsideSprout { path: PathBuf, base: PathBuf },

    #[error("invalid recipe name '{name}'")]
    InvalidName { name: String },

    #[error("recipe '{recipe}': {message}")]
    Syntax { recipe: String, message: String },

    #[error("recipe '{recipe}': malformed include entry {entry}")]
    MalformedInclude { recipe: String, entry: String },

    #[error("recipe '{recipe}': step '{step}' has malformed {kind} entry {entry}")]
    MalformedRequisite {
        recipe: String,
        step: String,
        kind: String,
        entry: String,
    },

    #[error("recipe '{recipe}': step '{step}' declares a {kind} requisite on itself")]
    SelfRequisite {
        recipe: String,
        step: String,
        kind: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("resolution cancelled")]
    Cancelled,

    #[error("step '{from}' has a requisite on unknown step '{to}'")]
    UnknownStep { from: String, to: String },

    #[error("requisite cycle detected involving: {}", members.join(", "))]
    RequisiteCycle { members: Vec<String> },

    #[error("no file provider registered for protocol '{protocol}'")]
    UnknownProtocol { protocol: String },

    #[error("unsupported hash type '{hash_type}'")]
    UnsupportedHash { hash_type: String },

    #[error("step '{id}': hash for {} failed: expected {expected} but found {actual}", path.display())]
    HashMismatch {
        id: String,
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("step '{id}': {message}")]
    InvalidFileSpec { id: String, message: String },

    #[error("{count} file artifact(s) out of date")]
    StaleArtifacts { count: usize },

    #[error("config: {0}")]
    Config(String),

    /// An error raised while processing `recipe`.
    #[error("while processing recipe '{recipe}': {source}")]
    InRecipe {
        recipe: String,
        #[source]
        source: Box<CookError>,
    },
}

impl CookError {
    /// Classification of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RecipeNotFound { .. }
            | Self::SproutNotFound { .. }
            | Self::NoRelativeBase { .. }
            | Self::OutsideSprout { .. } => ErrorKind::NotFound,
            Self::InvalidName { .. }
            | Self::Syntax { .. }
            | Self::MalformedInclude { .. }
            | Self::MalformedRequisite { .. }
            | Self::SelfRequisite { .. } => ErrorKind::Parse,
            Self::Io { .. } => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::UnknownStep { .. } | Self::RequisiteCycle { .. } => ErrorKind::Plan,
            Self::UnknownProtocol { .. }
            | Self::UnsupportedHash { .. }
            | Self::HashMismatch { .. }
            | Self::InvalidFileSpec { .. }
            | Self::StaleArtifacts { .. } => ErrorKind::Provider,
            Self::Config(_) => ErrorKind::Config,
            Self::InRecipe { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// The error with every [`CookError::InRecipe`] layer peeled off.
    pub fn root_cause(&self) -> &CookError {
        let mut current = self;
        while let Self::InRecipe { source, .. } = current {
            current = source;
        }
        current
    }

    /// Wrap `self` with the recipe it was raised for.
    pub fn in_recipe(self, recipe: impl Into<String>) -> Self {
        Self::InRecipe {
            recipe: recipe.into(),
            source: Box::new(self),
        }
    }

    /// Build an [`CookError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
