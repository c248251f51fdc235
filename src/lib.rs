//! work-rollup: a hierarchical work-item tracker.
//!
//! Work items form a tree. A parent's `done_ratio` and `estimated_hours` are
//! never edited directly — they are recomputed from its children by the
//! [`rollup`] engine whenever a child changes, and the recomputation
//! propagates up the ancestor chain via [`service::RollupService`].

pub mod db;
pub mod models;
pub mod rollup;
pub mod service;
