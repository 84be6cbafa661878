//! Ingredients: the step implementations recipes refer to.

pub mod file;
