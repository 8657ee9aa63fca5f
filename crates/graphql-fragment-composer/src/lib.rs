//! Generates reusable GraphQL fragments from a schema. The intended workflow is the following:
//!
//! - Describe the schema as an [EntityGraph], either with [analyze()] from SDL and optional
//!   resolver metadata, or by deserializing the analyzer's JSON output.
//! - Build a [Formatter] with a base configuration ([OptionsPatch]).
//! - Render fragments with [Formatter::format()] and [Formatter::format_many()], or collect
//!   them spread by spread with an [Importer].
//!
//! Each nested field is either inlined or referenced through a fragment spread, depending on
//! whether the field is resolved, the per-type overrides and the `levels` of the configuration.
//! Configurations that always inline a self-referencing type recurse without bound: cycles are
//! not detected.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod analyze;
mod error;
mod formatter;
mod graph;
mod importer;
mod options;

pub use analyze::{analyze, Resolvers};
pub use error::{AnalyzeError, ConfigurationError, Error};
pub use formatter::{Dependencies, Formatter, Fragment, FragmentSet, RenderHistory};
pub use graph::{Entity, EntityGraph, EntityGraphBuilder, EntityKind, FieldDescriptor, Fields};
pub use importer::Importer;
pub use options::{Blame, DescendInto, Options, OptionsPatch, OptionsResolver};
