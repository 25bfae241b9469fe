// src/dirty/mod.rs

//! Dirty descriptors: what a batch of edits invalidated.
//!
//! - [`descriptor`] defines the descriptor and the range types it carries.
//! - [`maps`] holds the two nested flag maps and their merge operators.
//!   Name maps merge last-wins, feature/other-formula maps merge with OR.
//! - [`merge`] folds a sequence of descriptors into one.
//! - [`registry`] maps command ids to the conversion that extracts a
//!   descriptor from an executed command.

pub mod descriptor;
pub mod maps;
pub mod merge;
pub mod registry;

pub use descriptor::{CellRange, DirtyDescriptor, UnitRange};
pub use maps::{DirtyFeatureMap, DirtyNameMap, SheetId, UnitId};
pub use merge::merge;
pub use registry::{DirtyConversion, DirtyConversionRegistry, ParamsConversion, StaticConversion};
