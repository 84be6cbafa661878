//! Recipe name → file path resolution.
//!
//! Naming rules, tried in order until one names an existing file:
//!
//! 1. `apache.init.grlx` — explicit extension, checked as `apache/init.grlx` only.
//! 2. `apache.init` — dots become separators: `apache/init.grlx`.
//! 3. `apache` — when `apache.grlx` is absent, the implicit `apache/init.grlx`.
//!
//! Relative names (`.mods`) are first rewritten against the directory of the
//! referencing recipe by [`relative_recipe_to_absolute`].

use super::error::{CookError, Result};
use super::reader::{ContentReader, LocalFs};
use super::types::{RecipeName, INIT_RECIPE, NAME_SEPARATOR, RECIPE_EXTENSION};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Resolve `name` under `base` on the local filesystem.
pub fn resolve_recipe_file_path(base: &Path, name: &RecipeName) -> Result<PathBuf> {
    resolve_recipe_file_path_with(&LocalFs, base, name)
}

/// Resolve `name` under `base`, probing through `reader`.
pub fn resolve_recipe_file_path_with<R: ContentReader + ?Sized>(
    reader: &R,
    base: &Path,
    name: &RecipeName,
) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(not_found(base, name));
    }
    if !name.is_well_formed() {
        return Err(CookError::InvalidName {
            name: name.to_string(),
        });
    }
    if name.is_relative() {
        return Err(CookError::NoRelativeBase {
            name: name.to_string(),
        });
    }

    let root = reader.root(base)?;
    for candidate in candidate_paths(&root, name) {
        trace!(recipe = %name, candidate = %candidate.display(), "probing");
        if let Some(found) = reader.probe(&candidate)? {
            ensure_within(&root, &found)?;
            debug!(recipe = %name, path = %found.display(), "resolved recipe");
            return Ok(found);
        }
    }
    Err(not_found(base, name))
}

/// Candidate files for a non-relative, well-formed name.
fn candidate_paths(root: &Path, name: &RecipeName) -> Vec<PathBuf> {
    let rel = root.join(name.to_relative_path());
    if name.has_extension() {
        return vec![rel.with_extension(RECIPE_EXTENSION)];
    }
    vec![
        rel.with_extension(RECIPE_EXTENSION),
        rel.join(INIT_RECIPE).with_extension(RECIPE_EXTENSION),
    ]
}

fn not_found(base: &Path, name: &RecipeName) -> CookError {
    CookError::RecipeNotFound {
        name: name.to_string(),
        base: base.to_path_buf(),
    }
}

fn ensure_within(root: &Path, path: &Path) -> Result<()> {
    if path.starts_with(root) {
        Ok(())
    } else {
        Err(CookError::OutsideSprout {
            path: path.to_path_buf(),
            base: root.to_path_buf(),
        })
    }
}

/// Rewrite `name` into a sprout-absolute recipe name.
///
/// An empty `referencing_file` fails with a NotFound-kind error whatever the
/// name. Non-relative names come back unchanged; relative ones are prefixed
/// with the dotted directory of `referencing_file` under `base`. No
/// existence check happens here.
pub fn relative_recipe_to_absolute(
    base: &Path,
    referencing_file: &Path,
    name: &RecipeName,
) -> Result<RecipeName> {
    if referencing_file.as_os_str().is_empty() {
        return Err(CookError::NoRelativeBase {
            name: name.to_string(),
        });
    }
    if !name.is_relative() {
        return Ok(name.clone());
    }
    if !name.is_well_formed() {
        return Err(CookError::InvalidName {
            name: name.to_string(),
        });
    }
    let dir = referencing_file.parent().unwrap_or(Path::new(""));
    let namespace = dotted(base, dir)?;
    Ok(name.qualify(&namespace))
}

/// Resolve a possibly relative `name` referenced from `referencing_file`.
pub fn resolve_relative(
    base: &Path,
    referencing_file: &Path,
    name: &RecipeName,
) -> Result<PathBuf> {
    resolve_relative_with(&LocalFs, base, referencing_file, name)
}

/// Like [`resolve_relative`], through `reader`.
///
/// `base` is canonicalised first. A relative `referencing_file` is taken
/// from the sprout root and an existing one is canonicalised.
pub fn resolve_relative_with<R: ContentReader + ?Sized>(
    reader: &R,
    base: &Path,
    referencing_file: &Path,
    name: &RecipeName,
) -> Result<PathBuf> {
    if referencing_file.as_os_str().is_empty() {
        return Err(CookError::NoRelativeBase {
            name: name.to_string(),
        });
    }
    let root = reader.root(base)?;
    let joined = root.join(referencing_file);
    let referencing = reader.probe(&joined)?.unwrap_or(joined);
    let absolute = relative_recipe_to_absolute(&root, &referencing, name)?;
    resolve_recipe_file_path_with(reader, &root, &absolute)
}

/// Canonical recipe name of a file under `root`: `apache/init.grlx` → `apache.init`.
pub fn recipe_name_for_path(root: &Path, path: &Path) -> Result<RecipeName> {
    let stem = path.with_extension("");
    let stem = if path.extension().is_some_and(|e| e == RECIPE_EXTENSION) {
        stem.as_path()
    } else {
        path
    };
    let name = dotted(root, stem)?;
    if name.is_empty() {
        return Err(CookError::InvalidName {
            name: path.display().to_string(),
        });
    }
    Ok(RecipeName::new(name))
}

/// `dir` relative to `base`, segments joined by the name separator.
fn dotted(base: &Path, dir: &Path) -> Result<String> {
    let rel = dir.strip_prefix(base).map_err(|_| CookError::OutsideSprout {
        path: dir.to_path_buf(),
        base: base.to_path_buf(),
    })?;
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(CookError::OutsideSprout {
                    path: dir.to_path_buf(),
                    base: base.to_path_buf(),
                })
            }
        }
    }
    Ok(segments.join(&NAME_SEPARATOR.to_string()))
}
