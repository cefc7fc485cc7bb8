//! Batch migration of a source tree through a source-transformation engine.
//!
//! [`migrate_tree`] copies a directory tree to a destination and rewrites
//! every `.py` file in the copy in place, tolerating and counting per-file
//! failures. The engine is injected as an [`ibtool_core::SourceTransform`];
//! [`FixerEngine`] is the built-in default.

pub mod fixers;
pub mod orchestrator;

pub use fixers::FixerEngine;
pub use orchestrator::{migrate_tree, FileFailure, MigrateError, MigrationReport};
