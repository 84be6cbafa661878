//! Requisite extraction: step → step ordering edges from `require:` and
//! `watch:` directives.
//!
//! References take three forms:
//! - `step` — a step of the same recipe
//! - `recipe:step` — a step of another recipe (`apache.grlx:x` is `apache:x`)
//! - `.sibling:step` — a step of a recipe next to this one

use super::document::{string_entries, RecipeDocument};
use super::error::{CookError, Result};
use super::paths::{recipe_name_for_path, resolve_recipe_file_path};
use super::reader::{ContentReader, LocalFs};
use super::types::{
    RecipeName, RequisiteEdge, RequisiteKind, Sprout, StepId, INIT_RECIPE, NAME_SEPARATOR,
};
use tracing::debug;

const STEP_QUALIFIER: char = ':';

/// Requisite edges declared in `content`.
///
/// Bare references are qualified with the canonical name `recipe` resolves
/// to in `sprout`; a recipe that does not resolve is qualified with its name
/// minus any extension.
pub fn extract_requisites(
    sprout: &Sprout,
    recipe: &RecipeName,
    content: &[u8],
) -> Result<Vec<RequisiteEdge>> {
    let qualified = qualified_recipe_name(sprout, recipe)?;
    let doc = RecipeDocument::parse(recipe, content)?;
    let edges = requisites_from(&qualified, &doc)?;
    debug!(
        sprout = %sprout.name,
        recipe = %qualified,
        count = edges.len(),
        "extracted requisites"
    );
    Ok(edges)
}

/// Qualified ids of every step declared in `content`.
pub fn extract_steps(sprout: &Sprout, recipe: &RecipeName, content: &[u8]) -> Result<Vec<StepId>> {
    let qualified = qualified_recipe_name(sprout, recipe)?;
    let doc = RecipeDocument::parse(recipe, content)?;
    steps_from(&qualified, &doc)
}

fn qualified_recipe_name(sprout: &Sprout, recipe: &RecipeName) -> Result<RecipeName> {
    match resolve_recipe_file_path(sprout.base_path(), recipe) {
        Ok(path) => {
            let root = LocalFs.root(sprout.base_path())?;
            recipe_name_for_path(&root, &path)
        }
        Err(e) if e.is_not_found() => Ok(RecipeName::new(recipe.without_extension())),
        Err(e) => Err(e),
    }
}

pub(crate) fn steps_from(recipe: &RecipeName, doc: &RecipeDocument) -> Result<Vec<StepId>> {
    doc.steps
        .keys()
        .map(|id| {
            validate_step_id(recipe, id)?;
            Ok(StepId::new(recipe.clone(), id.as_str()))
        })
        .collect()
}

fn validate_step_id(recipe: &RecipeName, id: &str) -> Result<()> {
    if id.trim().is_empty() || id.contains(STEP_QUALIFIER) {
        return Err(CookError::Syntax {
            recipe: recipe.to_string(),
            message: format!("invalid step id '{id}'"),
        });
    }
    Ok(())
}

/// Edges of an already parsed document, `recipe` being its canonical name.
pub(crate) fn requisites_from(
    recipe: &RecipeName,
    doc: &RecipeDocument,
) -> Result<Vec<RequisiteEdge>> {
    let mut edges = Vec::new();
    for (id, step) in &doc.steps {
        validate_step_id(recipe, id)?;
        let from = StepId::new(recipe.clone(), id.as_str());
        for kind in [RequisiteKind::Require, RequisiteKind::Watch] {
            let malformed = |entry: String| CookError::MalformedRequisite {
                recipe: recipe.to_string(),
                step: id.clone(),
                kind: kind.to_string(),
                entry,
            };
            let entries = string_entries(step.requisites(kind)).map_err(malformed)?;
            for entry in entries {
                let to = parse_reference(recipe, entry)
                    .ok_or_else(|| malformed(format!("'{entry}'")))?;
                if refers_to(&to, &from) {
                    return Err(CookError::SelfRequisite {
                        recipe: recipe.to_string(),
                        step: id.clone(),
                        kind: kind.to_string(),
                    });
                }
                edges.push(RequisiteEdge {
                    from: from.clone(),
                    to,
                    kind,
                });
            }
        }
    }
    Ok(edges)
}

/// Qualify a step reference made from inside `current`.
fn parse_reference(current: &RecipeName, reference: &str) -> Option<StepId> {
    let reference = reference.trim();
    let Some((recipe, step)) = reference.split_once(STEP_QUALIFIER) else {
        return (!reference.is_empty()).then(|| StepId::new(current.clone(), reference));
    };
    let step = step.trim();
    let name = RecipeName::from(recipe.trim());
    if step.is_empty() || !name.is_well_formed() {
        return None;
    }
    let name = name.qualify(current.namespace());
    Some(StepId::new(name.without_extension(), step))
}

/// `reference` names `step`, directly or through the implicit init recipe.
fn refers_to(reference: &StepId, step: &StepId) -> bool {
    if reference.step != step.step {
        return false;
    }
    reference.recipe == step.recipe
        || format!("{}{}{}", reference.recipe, NAME_SEPARATOR, INIT_RECIPE) == step.recipe.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::fixtures::{test_sprout, DEV_RECIPE};

    fn edges(recipe: &str, yaml: &str) -> Result<Vec<RequisiteEdge>> {
        let doc = RecipeDocument::parse(&recipe.into(), yaml.as_bytes())?;
        requisites_from(&recipe.into(), &doc)
    }

    #[test]
    fn test_requisites_dev_fixture() {
        let (_dir, base) = test_sprout();
        let sprout = Sprout::new("testSprout", &base);
        let found = extract_requisites(&sprout, &"dev".into(), DEV_RECIPE.as_bytes()).unwrap();
        assert_eq!(
            found,
            vec![
                RequisiteEdge {
                    from: StepId::new("dev", "configure-site"),
                    to: StepId::new("apache", "install-apache"),
                    kind: RequisiteKind::Require,
                },
                RequisiteEdge {
                    from: StepId::new("dev", "reload-apache"),
                    to: StepId::new("dev", "configure-site"),
                    kind: RequisiteKind::Watch,
                },
            ]
        );
    }

    #[test]
    fn test_requisites_bare_qualified_with_resolved_name() {
        let (_dir, base) = test_sprout();
        let sprout = Sprout::new("testSprout", &base);
        let yaml = r#"
steps:
  install-apache: {}
  enable-mods:
    require: install-apache
"#;
        for spelling in ["apache", "apache.init", "apache.init.grlx"] {
            let found = extract_requisites(&sprout, &spelling.into(), yaml.as_bytes()).unwrap();
            assert_eq!(found[0].from, StepId::new("apache.init", "enable-mods"));
            assert_eq!(found[0].to, StepId::new("apache.init", "install-apache"));
        }
    }

    #[test]
    fn test_requisites_unresolved_recipe_uses_stripped_name() {
        let (_dir, base) = test_sprout();
        let sprout = Sprout::new("testSprout", &base);
        let yaml = "steps:\n  b:\n    require: [a]\n";
        let found = extract_requisites(&sprout, &"web.grlx".into(), yaml.as_bytes()).unwrap();
        assert_eq!(found[0].to, StepId::new("web", "a"));
    }

    #[test]
    fn test_requisites_no_steps() {
        assert!(edges("independent", "").unwrap().is_empty());
        assert!(edges("independent", "steps: {}\n").unwrap().is_empty());
        assert!(edges("r", "steps:\n  a:\n    name: x\n").unwrap().is_empty());
    }

    #[test]
    fn test_requisites_cross_recipe_forms() {
        let yaml = r#"
steps:
  deploy:
    require:
      - db:migrate
      - web.grlx:build
      - .mods:enable
"#;
        let found = edges("apache.init", yaml).unwrap();
        let targets: Vec<String> = found.iter().map(|e| e.to.to_string()).collect();
        assert_eq!(targets, vec!["db:migrate", "web:build", "apache.mods:enable"]);
    }

    #[test]
    fn test_requisites_self_require_rejected() {
        let err = edges("dev", "steps:\n  a:\n    require: a\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(matches!(
            err,
            CookError::SelfRequisite { ref step, ref kind, .. } if step == "a" && kind == "require"
        ));
    }

    #[test]
    fn test_requisites_self_watch_rejected() {
        let err = edges("dev", "steps:\n  a:\n    watch: [dev:a]\n").unwrap_err();
        assert!(matches!(err, CookError::SelfRequisite { ref kind, .. } if kind == "watch"));
    }

    #[test]
    fn test_requisites_self_through_init_rejected() {
        let err = edges("apache.init", "steps:\n  a:\n    require: apache:a\n").unwrap_err();
        assert!(matches!(err, CookError::SelfRequisite { .. }));
    }

    #[test]
    fn test_requisites_same_step_name_other_recipe_allowed() {
        let found = edges("dev", "steps:\n  a:\n    require: web:a\n").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_requisites_malformed_entries() {
        for yaml in [
            "steps:\n  a:\n    require: [42]\n",
            "steps:\n  a:\n    require: 'web:'\n",
            "steps:\n  a:\n    watch: ['../x:y']\n",
            "steps:\n  a:\n    watch: ''\n",
            "steps:\n  a:\n    require: {b: c}\n",
        ] {
            let err = edges("dev", yaml).unwrap_err();
            assert!(matches!(err, CookError::MalformedRequisite { .. }), "{yaml}");
        }
    }

    #[test]
    fn test_requisites_invalid_step_id() {
        let err = edges("dev", "steps:\n  'a:b':\n    name: x\n").unwrap_err();
        assert!(matches!(err, CookError::Syntax { .. }));
    }

    #[test]
    fn test_extract_steps() {
        let (_dir, base) = test_sprout();
        let sprout = Sprout::new("testSprout", &base);
        let steps = extract_steps(&sprout, &"dev".into(), DEV_RECIPE.as_bytes()).unwrap();
        assert_eq!(
            steps,
            vec![
                StepId::new("dev", "configure-site"),
                StepId::new("dev", "reload-apache")
            ]
        );
    }
}
