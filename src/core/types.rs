//! Core value types: recipe names, sprouts, recipe files, step ids,
//! requisite edges and the dependency closure handed to the execution engine.

use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File extension of recipe files.
pub const RECIPE_EXTENSION: &str = "grlx";

/// File name (without extension) of a directory's implicit recipe.
pub const INIT_RECIPE: &str = "init";

/// Leading marker of a recipe name relative to the referencing recipe.
pub const RELATIVE_MARKER: char = '.';

/// Separator between name segments.
pub const NAME_SEPARATOR: char = '.';

static NAME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.?[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").expect("valid recipe name pattern")
});

// ============================================================================
// Recipe names
// ============================================================================

/// Identifier of a recipe: `dev`, `apache.init`, `apache.init.grlx` or
/// `.sibling` (relative to the referencing recipe's directory).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeName(String);

impl RecipeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Starts with the relative marker.
    pub fn is_relative(&self) -> bool {
        self.0.starts_with(RELATIVE_MARKER)
    }

    /// Ends with `.grlx` after a non-empty stem.
    pub fn has_extension(&self) -> bool {
        self.0
            .strip_suffix(RECIPE_EXTENSION)
            .and_then(|stem| stem.strip_suffix(NAME_SEPARATOR))
            .is_some_and(|stem| !stem.is_empty())
    }

    /// Name-shaped: optional relative marker, then non-empty segments of
    /// `[A-Za-z0-9_-]` joined by `.`.
    pub fn is_well_formed(&self) -> bool {
        NAME_SHAPE.is_match(&self.0)
    }

    /// The name with a trailing `.grlx` removed.
    pub fn without_extension(&self) -> &str {
        if self.has_extension() {
            &self.0[..self.0.len() - RECIPE_EXTENSION.len() - 1]
        } else {
            &self.0
        }
    }

    /// Segments of the name as a relative path, marker and extension removed.
    pub fn to_relative_path(&self) -> PathBuf {
        self.without_extension()
            .trim_start_matches(RELATIVE_MARKER)
            .split(NAME_SEPARATOR)
            .collect()
    }

    /// Namespace containing this recipe: `apache.init` → `apache`, `dev` → ``.
    pub fn namespace(&self) -> &str {
        let stem = self.without_extension();
        stem.rsplit_once(NAME_SEPARATOR)
            .map(|(ns, _)| ns)
            .unwrap_or("")
    }

    /// Qualify a relative name with `namespace`; non-relative names are returned as is.
    pub fn qualify(&self, namespace: &str) -> RecipeName {
        match self.0.strip_prefix(RELATIVE_MARKER) {
            Some(rest) if namespace.is_empty() => RecipeName::new(rest),
            Some(rest) => RecipeName::new(format!("{namespace}{NAME_SEPARATOR}{rest}")),
            None => self.clone(),
        }
    }
}

impl fmt::Display for RecipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecipeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for RecipeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Sprouts and recipe files
// ============================================================================

/// A named source tree of recipes rooted at `base_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprout {
    pub name: String,
    pub base_path: PathBuf,
}

impl Sprout {
    pub fn new(name: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// A resolved recipe: canonical name, canonical path, raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeFile {
    pub name: RecipeName,
    pub path: PathBuf,
    #[serde(skip)]
    pub content: Vec<u8>,
}

// ============================================================================
// Steps and requisites
// ============================================================================

/// A step qualified by the recipe that declares it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId {
    pub recipe: RecipeName,
    pub step: String,
}

impl StepId {
    pub fn new(recipe: impl Into<RecipeName>, step: impl Into<String>) -> Self {
        Self {
            recipe: recipe.into(),
            step: step.into(),
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.recipe, self.step)
    }
}

/// Requisite kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisiteKind {
    /// `to` completes before `from` runs.
    Require,
    /// Ordering, and `from` re-runs when `to` changes.
    Watch,
}

impl RequisiteKind {
    /// Directive key in a recipe step.
    pub fn key(self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::Watch => "watch",
        }
    }
}

impl fmt::Display for RequisiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequisiteEdge {
    pub from: StepId,
    pub to: StepId,
    pub kind: RequisiteKind,
}

impl fmt::Display for RequisiteEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.from, self.kind, self.to)
    }
}

// ============================================================================
// Dependency closure
// ============================================================================

/// How the collector treats an include that resolves to no file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludePolicy {
    /// Abort the whole collection.
    #[default]
    FailFast,
    /// Record it in [`DependencyClosure::unresolved`] and continue.
    BestEffort,
}

/// An include that did not resolve under [`IncludePolicy::BestEffort`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedInclude {
    pub from: RecipeName,
    pub name: RecipeName,
    pub reason: String,
}

/// Every recipe reachable from `root`, once each, with their steps and
/// requisite edges.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyClosure {
    pub sprout: String,
    pub root: RecipeName,
    pub recipes: Vec<RecipeFile>,
    pub steps: IndexSet<StepId>,
    pub requisites: IndexSet<RequisiteEdge>,
    pub unresolved: Vec<UnresolvedInclude>,
}

impl DependencyClosure {
    pub fn new(sprout: impl Into<String>, root: RecipeName) -> Self {
        Self {
            sprout: sprout.into(),
            root,
            recipes: Vec::new(),
            steps: IndexSet::new(),
            requisites: IndexSet::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.recipes.iter().any(|r| r.path == path)
    }

    pub fn recipe(&self, name: &str) -> Option<&RecipeFile> {
        self.recipes.iter().find(|r| r.name.as_str() == name)
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.recipes.iter().map(|r| r.path.as_path()).collect()
    }

    /// Canonical recipe names, sorted.
    pub fn recipe_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.recipes.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Map a step reference onto a declared step, following the implicit
    /// init convention (`apache:x` → `apache.init:x`).
    pub fn canonical_step(&self, id: &StepId) -> Option<&StepId> {
        if let Some(found) = self.steps.get(id) {
            return Some(found);
        }
        let init = StepId::new(
            format!("{}{}{}", id.recipe, NAME_SEPARATOR, INIT_RECIPE),
            id.step.clone(),
        );
        self.steps.get(&init)
    }
}
