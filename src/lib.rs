//! Turboflow data modules
//!
//! Datasets and data modules that feed image-fitting and patch-regression
//! training loops built on candle.
//!
//! # Variants
//!
//! - **Coordinate grid**: one image, paired with a normalized (x, y) grid
//! - **Paired arrays**: pre-split (input, target) arrays, one sample each
//! - **Patches**: many pre-extracted (input, target) patches, batched and shuffled
//!
//! # Example
//!
//! ```ignore
//! use turboflow::data::{CoordinateGridDataModule, DataModule};
//! use turboflow::{GridDataModuleConfig, Image};
//!
//! let image = Image::from_npy("image.npy")?;
//! let config = GridDataModuleConfig::default();
//! let mut dm = CoordinateGridDataModule::new(image, config, Device::Cpu)?;
//! dm.prepare_data()?;
//! let mut loader = dm.train_dataloader()?;
//! while let Some((coords, pixels)) = loader.next_batch(&Device::Cpu)? { /* ... */ }
//! ```

pub mod config;
pub mod data;

// Re-export commonly used items
pub use config::{GridDataModuleConfig, LoaderConfig, PatchDataModuleConfig};
pub use data::image::Image;

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Image is not within [-1, 1]. Max is {max:.2}")]
    OutOfRange { max: f32 },

    #[error("Shape mismatch: input {input:?} != target {target:?}")]
    ShapeMismatch { input: Vec<usize>, target: Vec<usize> },

    #[error("Length mismatch: {inputs} inputs != {targets} targets")]
    LengthMismatch { inputs: usize, targets: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Datasets not prepared, call prepare_data() first")]
    NotPrepared,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("NumPy error: {0}")]
    Npy(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
