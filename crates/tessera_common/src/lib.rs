//! Shared foundational types used across the Tessera CGRA mapper.
//!
//! This crate provides the opaque id newtype macro used by the arena-backed
//! crates and the [`Coord`] grid position.

#![warn(missing_docs)]

pub mod coord;
pub mod id;

pub use coord::Coord;
