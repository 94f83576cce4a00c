//! Domain layer types and invariants.

pub mod conditions;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod search;
