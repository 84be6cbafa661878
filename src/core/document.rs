//! Recipe file schema.
//!
//! A recipe is a YAML mapping with an optional `include` list and a `steps`
//! mapping keyed by step id. Each step may carry `require` and `watch`
//! requisites (a string or a list of strings) next to its ingredient
//! properties.

use super::error::{CookError, Result};
use super::types::{RecipeName, RequisiteKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

/// A parsed recipe file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeDocument {
    /// Included recipe names; validated by the include extractor.
    #[serde(default)]
    pub include: Option<Value>,

    /// Steps keyed by id (order-preserving).
    #[serde(default)]
    pub steps: IndexMap<String, Step>,
}

/// A single step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Step {
    /// Ingredient and method, e.g. `file.managed`.
    #[serde(default)]
    pub ingredient: Option<String>,

    /// Steps that must complete before this one.
    #[serde(default)]
    pub require: Option<Value>,

    /// Steps whose changes re-trigger this one.
    #[serde(default)]
    pub watch: Option<Value>,

    #[serde(flatten)]
    pub properties: StepProperties,
}

impl Step {
    pub fn requisites(&self, kind: RequisiteKind) -> Option<&Value> {
        match kind {
            RequisiteKind::Require => self.require.as_ref(),
            RequisiteKind::Watch => self.watch.as_ref(),
        }
    }
}

/// Recognised step properties, plus anything ingredient-specific in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepProperties {
    /// Target of the step (package name, destination path, command).
    #[serde(default)]
    pub name: Option<String>,

    /// Artifact source, e.g. `file:///srv/files/app.conf`.
    #[serde(default)]
    pub source: Option<String>,

    /// Expected artifact hash.
    #[serde(default)]
    pub hash: Option<String>,

    /// Hash algorithm; guessed from `hash` when absent.
    #[serde(default)]
    pub hash_type: Option<String>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl RecipeDocument {
    /// Parse raw recipe bytes. Empty content is an empty recipe.
    pub fn parse(recipe: &RecipeName, content: &[u8]) -> Result<Self> {
        let syntax = |message: String| CookError::Syntax {
            recipe: recipe.to_string(),
            message,
        };
        let text = std::str::from_utf8(content)
            .map_err(|e| syntax(format!("recipe is not valid UTF-8: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml_ng::from_str(text)
            .map_err(|e| syntax(format!("YAML parse error: {e}")))?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_value(value).map_err(|e| syntax(format!("invalid recipe: {e}")))
    }
}

/// The strings of a scalar-or-list value. A non-string entry is returned as
/// the error, rendered for diagnostics.
pub(crate) fn string_entries(value: Option<&Value>) -> std::result::Result<Vec<&str>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.as_str()]),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(|entry| match entry {
                Value::String(s) => Ok(s.as_str()),
                other => Err(render_entry(other)),
            })
            .collect(),
        Some(other) => Err(render_entry(other)),
    }
}

/// Compact single-line rendering of a YAML value.
pub(crate) fn render_entry(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
