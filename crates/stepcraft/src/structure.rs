//! Input description of a page and the placement graph built from it.
//!
//! - [`tree`]: the typed page tree the composer consumes
//! - [`graph`]: an arena of sized nodes with anchor edges, and the walker
//!   that resolves it

pub mod graph;
pub mod tree;

pub use graph::{MAX_EXPANSIONS, PlacementGraph, Walk};
pub use tree::{
    Allocation, Callout, Divider, Element, PageDescription, PageItem, PartSource, PartsListSource,
    Range, ReservedSpace, Step, StepGroup, StepsChild,
};
