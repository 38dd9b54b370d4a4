//! Shared components for the aspect sensor workspace.
//!
//! Contains the building blocks that do not know anything about the Sun:
//! frame geometry, running statistics, bounded top-N peak selection,
//! 1-D morphology and (behind the `synthetic` feature) synthetic frame
//! generators used by tests, benches and the lab harness.

pub mod image_proc;
pub mod image_size;
pub mod stats_scan;

pub use image_size::{CropWindow, ImageSize};
pub use stats_scan::{StatsError, StatsScan, StdDevMode};
