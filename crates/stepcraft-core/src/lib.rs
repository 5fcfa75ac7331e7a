//! Stepcraft Core Types and Definitions
//!
//! This crate provides the foundational types for the Stepcraft page
//! composition engine. It includes:
//!
//! - **Geometry**: Points, sizes, bounds and insets in page pixels ([`geometry`] module)
//! - **Placement**: Edges, justification, prepositions, margins and the
//!   relative-placement resolver ([`placement`] module)
//! - **Nodes**: Sized and placed page elements ([`node`] module)

pub mod geometry;
pub mod node;
pub mod placement;
