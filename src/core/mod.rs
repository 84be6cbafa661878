//! Core recipe logic: naming, resolution, extraction, collection, planning.

pub mod collector;
pub mod config;
pub mod document;
pub mod error;
pub mod includes;
pub mod paths;
pub mod planner;
pub mod reader;
pub mod requisites;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

