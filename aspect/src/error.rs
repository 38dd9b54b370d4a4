use crate::config::ConfigError;
use crate::fiducial::KernelError;
use thiserror::Error;

/// Errors building an [`AspectEngine`](crate::AspectEngine)
#[derive(Error, Debug)]
pub enum AspectError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("fiducial kernel: {0}")]
    Kernel(#[from] KernelError),
    #[error("matched filter selected but matched_filter.mask_path is not set")]
    MissingMaskPath,
}
