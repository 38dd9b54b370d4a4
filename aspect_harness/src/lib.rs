//! Lab harness for the aspect engine
//!
//! Loads frames and masks from disk, builds an engine from a JSON config with
//! command-line overrides, and runs batches of frames in parallel the way the
//! acquisition loop would call the single-threaded core.

pub mod frames;
pub mod report;

use anyhow::{Context, Result};
use aspect::{AspectConfig, AspectEngine, FiducialMethod, FrameSolution};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Command-line overrides applied on top of a loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub method: Option<FiducialMethod>,
    pub mask_path: Option<PathBuf>,
    pub chord_count: Option<usize>,
    pub edge_threshold: Option<f64>,
    pub max_fiducials: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut AspectConfig) {
        if let Some(method) = self.method {
            config.fiducial_method = method;
        }
        if let Some(path) = &self.mask_path {
            config.matched_filter.mask_path = Some(path.clone());
        }
        if let Some(count) = self.chord_count {
            config.center.chord_count = count;
        }
        if let Some(threshold) = self.edge_threshold {
            config.center.edge_threshold = threshold;
        }
        if let Some(max) = self.max_fiducials {
            config.max_fiducials = max;
        }
    }
}

/// Load (or default) a configuration and apply overrides
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<AspectConfig> {
    let mut config = match path {
        Some(path) => AspectConfig::load_from_file(path)?,
        None => AspectConfig::default(),
    };
    overrides.apply(&mut config);
    Ok(config)
}

pub fn build_engine(config: AspectConfig) -> Result<AspectEngine> {
    AspectEngine::new(config).context("failed to build aspect engine")
}

/// Load and solve one frame
pub fn solve_file(engine: &AspectEngine, path: &Path) -> Result<FrameSolution> {
    let frame = frames::load_frame(path)?;
    Ok(engine.process_frame(frame.view()))
}

/// Solve every frame in parallel; results keep the input order
pub fn solve_batch(
    engine: &AspectEngine,
    paths: &[PathBuf],
) -> Vec<(PathBuf, Result<FrameSolution>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), solve_file(engine, path)))
        .collect()
}
