// src/packing/mod.rs
//! Skyline-based placement of sized items onto fixed-width bases.

pub mod packer;
pub mod skyline;

pub use packer::{Base, PackError, PackResult, Packer, Placement};
pub use skyline::{Candidate, Skyline, SkylineSegment};
