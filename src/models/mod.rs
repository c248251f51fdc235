//! Domain models for work-rollup.
//!
//! A [`WorkItem`] is a node in a work breakdown tree. Leaf items carry the
//! values people actually enter — a status, an optional effort estimate and a
//! completion percentage. Parent items *inherit*: their `done_ratio` and
//! `estimated_hours` are derived from their children and overwritten on every
//! child mutation, so editing them directly is pointless.

mod status;
mod work_item;

pub use status::*;
pub use work_item::*;
