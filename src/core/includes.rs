//! Include extraction: the recipe names a recipe declares under `include:`.

use super::document::{string_entries, RecipeDocument};
use super::error::{CookError, Result};
use super::types::{RecipeName, Sprout};
use tracing::debug;

/// Names listed in `content`'s include section, verbatim.
///
/// An absent or empty section gives an empty list. Names are not resolved
/// or trimmed; an entry with surrounding whitespace is malformed.
pub fn extract_includes(
    sprout: &Sprout,
    recipe: &RecipeName,
    content: &[u8],
) -> Result<Vec<RecipeName>> {
    let doc = RecipeDocument::parse(recipe, content)?;
    let includes = includes_from(recipe, &doc)?;
    debug!(
        sprout = %sprout.name,
        recipe = %recipe,
        count = includes.len(),
        "extracted includes"
    );
    Ok(includes)
}

/// Validated include names of an already parsed document.
pub(crate) fn includes_from(recipe: &RecipeName, doc: &RecipeDocument) -> Result<Vec<RecipeName>> {
    let malformed = |entry: String| CookError::MalformedInclude {
        recipe: recipe.to_string(),
        entry,
    };
    let entries = string_entries(doc.include.as_ref()).map_err(malformed)?;
    entries
        .into_iter()
        .map(|entry| {
            let name = RecipeName::from(entry);
            if name.is_well_formed() {
                Ok(name)
            } else {
                Err(malformed(format!("'{entry}'")))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::fixtures::test_sprout;
    use crate::core::paths::resolve_recipe_file_path;

    fn sorted(mut names: Vec<RecipeName>) -> Vec<String> {
        names.sort();
        names.into_iter().map(|n| n.to_string()).collect()
    }

    fn includes_of(recipe: &str) -> Vec<String> {
        let (_dir, base) = test_sprout();
        let sprout = Sprout::new("testSprout", &base);
        let path = resolve_recipe_file_path(&base, &recipe.into()).unwrap();
        let content = std::fs::read(path).unwrap();
        sorted(extract_includes(&sprout, &recipe.into(), &content).unwrap())
    }

    #[test]
    fn test_includes_dev() {
        assert_eq!(includes_of("dev"), vec!["apache", "missing"]);
    }

    #[test]
    fn test_includes_independent_is_empty() {
        assert!(includes_of("independent").is_empty());
    }

    #[test]
    fn test_includes_apache_init() {
        assert_eq!(includes_of("apache"), vec!["apache"]);
    }

    #[test]
    fn test_includes_apache_explicit_filename() {
        assert_eq!(includes_of("apache.init.grlx"), vec!["apache"]);
    }

    #[test]
    fn test_includes_order_independent() {
        let sprout = Sprout::new("s", "/srv/s");
        let a = extract_includes(&sprout, &"r".into(), b"include: [missing, apache]\n").unwrap();
        let b = extract_includes(&sprout, &"r".into(), b"include: [apache, missing]\n").unwrap();
        assert_eq!(sorted(a), sorted(b));
    }

    #[test]
    fn test_includes_single_scalar() {
        let sprout = Sprout::new("s", "/srv/s");
        let names = extract_includes(&sprout, &"r".into(), b"include: apache\n").unwrap();
        assert_eq!(sorted(names), vec!["apache"]);
    }

    #[test]
    fn test_includes_empty_content_and_empty_list() {
        let sprout = Sprout::new("s", "/srv/s");
        assert!(extract_includes(&sprout, &"r".into(), b"").unwrap().is_empty());
        assert!(extract_includes(&sprout, &"r".into(), b"include: []\n")
            .unwrap()
            .is_empty());
        assert!(extract_includes(&sprout, &"r".into(), b"include:\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_includes_relative_kept_verbatim() {
        let sprout = Sprout::new("s", "/srv/s");
        let names = extract_includes(&sprout, &"r".into(), b"include: [.mods]\n").unwrap();
        assert_eq!(sorted(names), vec![".mods"]);
    }

    #[test]
    fn test_includes_non_string_entry() {
        let sprout = Sprout::new("s", "/srv/s");
        let err =
            extract_includes(&sprout, &"dev".into(), b"include: [apache, {x: y}]\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        match err {
            CookError::MalformedInclude { recipe, entry } => {
                assert_eq!(recipe, "dev");
                assert_eq!(entry, r#"{"x":"y"}"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_includes_not_name_shaped() {
        let sprout = Sprout::new("s", "/srv/s");
        for bad in ["include: ['../etc']\n", "include: ['a b']\n", "include: ['']\n"] {
            let err = extract_includes(&sprout, &"dev".into(), bad.as_bytes()).unwrap_err();
            assert!(matches!(err, CookError::MalformedInclude { .. }), "{bad}");
        }
    }

    #[test]
    fn test_includes_surrounding_whitespace_is_malformed() {
        let sprout = Sprout::new("s", "/srv/s");
        for bad in ["include: [' apache']\n", "include: ['apache ']\n"] {
            let err = extract_includes(&sprout, &"dev".into(), bad.as_bytes()).unwrap_err();
            assert!(matches!(err, CookError::MalformedInclude { .. }), "{bad}");
        }
    }

    #[test]
    fn test_includes_mapping_section() {
        let sprout = Sprout::new("s", "/srv/s");
        let err =
            extract_includes(&sprout, &"dev".into(), b"include: {apache: true}\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
