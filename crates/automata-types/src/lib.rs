//! Shared type definitions for the stochastic automata workspace.
//!
//! This crate holds the vocabulary every other crate speaks: how a site is
//! addressed and which discrete states a site can take under each rule
//! family.
//!
//! # Modules
//!
//! - [`ids`] -- Site addresses: [`GridPos`] for toroidal grids and
//!   [`VertexId`] for arbitrary graphs.
//! - [`enums`] -- Per-rule state alphabets: [`LifeState`], [`Species`] and
//!   [`Allegiance`].

pub mod enums;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{Allegiance, LifeState, Species};
pub use ids::{GridPos, VertexId};
