//! cook — recipe resolution for grlx sprouts.
//!
//! Maps recipe names onto files, extracts includes and step requisites,
//! collects the transitive include closure of a root recipe and orders its
//! steps. File ingredients fetch and verify artifacts through a provider
//! registry.

pub mod cli;
pub mod core;
pub mod ingredients;
