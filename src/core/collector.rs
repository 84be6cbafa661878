//! Dependency collection: the transitive, deduplicated include closure of a
//! root recipe together with every collected recipe's steps and requisites.
//!
//! Recipes are walked breadth-first from an explicit queue. A visited set
//! keyed by canonical path guarantees each file is read at most once, which
//! is also what makes self-includes, include cycles and diamonds terminate.

use super::document::RecipeDocument;
use super::error::Result;
use super::includes::includes_from;
use super::paths::{
    recipe_name_for_path, relative_recipe_to_absolute, resolve_recipe_file_path_with,
};
use super::reader::{CancelToken, ContentReader, LocalFs};
use super::requisites::{requisites_from, steps_from};
use super::types::{
    DependencyClosure, IncludePolicy, RecipeFile, RecipeName, Sprout, UnresolvedInclude,
};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Options of a collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub policy: IncludePolicy,
    pub cancel: CancelToken,
}

impl CollectOptions {
    pub fn with_policy(policy: IncludePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

/// Collect the closure of `root` from the local filesystem, failing fast on
/// unresolvable includes.
pub fn collect_all_includes(sprout: &Sprout, root: &RecipeName) -> Result<DependencyClosure> {
    collect_all_includes_with(sprout, root, &LocalFs, &CollectOptions::default())
}

/// Collect the closure of `root`, reading through `reader`.
pub fn collect_all_includes_with<R: ContentReader + ?Sized>(
    sprout: &Sprout,
    root: &RecipeName,
    reader: &R,
    options: &CollectOptions,
) -> Result<DependencyClosure> {
    let base = sprout.base_path();
    let sprout_root = reader.root(base)?;
    let root_path = resolve_recipe_file_path_with(reader, &sprout_root, root)?;

    let mut closure = DependencyClosure::new(sprout.name.clone(), root.clone());
    let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    visited.insert(root_path.clone());
    queue.push_back(root_path);

    while let Some(path) = queue.pop_front() {
        options.cancel.check()?;
        let name = recipe_name_for_path(&sprout_root, &path)?;
        let content = reader.read(&path).map_err(|e| e.in_recipe(name.as_str()))?;
        let doc = RecipeDocument::parse(&name, &content).map_err(|e| e.in_recipe(name.as_str()))?;

        let includes = includes_from(&name, &doc).map_err(|e| e.in_recipe(name.as_str()))?;
        for include in includes {
            match resolve_include(reader, &sprout_root, &path, &include) {
                Ok(found) => {
                    if visited.insert(found.clone()) {
                        trace!(from = %name, include = %include, "queued");
                        queue.push_back(found);
                    } else {
                        trace!(from = %name, include = %include, "already visited");
                    }
                }
                Err(e) if e.is_not_found() && options.policy == IncludePolicy::BestEffort => {
                    warn!(from = %name, include = %include, "skipping unresolved include: {e}");
                    closure.unresolved.push(UnresolvedInclude {
                        from: name.clone(),
                        name: include,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e.in_recipe(name.as_str())),
            }
        }

        let steps = steps_from(&name, &doc).map_err(|e| e.in_recipe(name.as_str()))?;
        let edges = requisites_from(&name, &doc).map_err(|e| e.in_recipe(name.as_str()))?;
        debug!(
            recipe = %name,
            steps = steps.len(),
            requisites = edges.len(),
            "collected recipe"
        );
        closure.steps.extend(steps);
        closure.requisites.extend(edges);
        closure.recipes.push(RecipeFile {
            name,
            path,
            content,
        });
    }

    info!(
        sprout = %sprout.name,
        root = %root,
        recipes = closure.len(),
        unresolved = closure.unresolved.len(),
        "dependency closure complete"
    );
    Ok(closure)
}

/// Resolve an include found in `referencing`; relative names resolve
/// against its directory, everything else against the sprout root.
fn resolve_include<R: ContentReader + ?Sized>(
    reader: &R,
    sprout_root: &Path,
    referencing: &Path,
    include: &RecipeName,
) -> Result<PathBuf> {
    let absolute = relative_recipe_to_absolute(sprout_root, referencing, include)?;
    resolve_recipe_file_path_with(reader, sprout_root, &absolute)
}
