//! Workflow compiler for the geoflow node-graph pipeline editor.
//!
//! Maps a backend-supplied operator schema into typed block definitions,
//! compiles the live node graph into a validated workflow document, and
//! reconstructs a laid-out graph from a persisted document.

pub mod backend;
pub mod compile;
pub mod editor;
pub mod error;
pub mod factory;
pub mod graph;
pub mod host;
pub mod import;
pub mod registry;
pub mod schema;
pub mod validate;
