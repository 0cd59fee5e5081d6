/// Datasets, batch loaders and data modules
pub mod grid;
pub mod image;
pub mod loader;
pub mod paired;
pub mod patch;

pub use grid::{coordinate_grid, linspace_open, CoordinateGridDataModule, CoordinateGridDataset};
pub use image::Image;
pub use loader::{Batches, DataLoader};
pub use paired::{PairedDataModule, PairedDataset};
pub use patch::{PatchDataModule, PatchDataset};

use candle_core::{Device, Result, Tensor};
use std::sync::Arc;

use crate::config::LoaderConfig;

/// Indexed collection of (input, target) samples
pub trait SampleDataset: Send + Sync {
    /// Total number of samples
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the sample at `index` on `device`
    fn get(&self, index: usize, device: &Device) -> Result<(Tensor, Tensor)>;
}

/// Generic data loader trait
pub trait BatchDataLoader {
    /// Get next batch of (input, target) tensors
    fn next_batch(&mut self, device: &Device) -> Result<Option<(Tensor, Tensor)>>;

    /// Reset loader for new epoch
    fn reset(&mut self);

    /// Get total number of batches
    fn num_batches(&self) -> usize;
}

/// Dataset split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

/// Train, validation and test datasets owned by a data module
#[derive(Debug)]
pub struct Splits<D> {
    pub train: Arc<D>,
    pub val: Arc<D>,
    pub test: Arc<D>,
}

impl<D> Splits<D> {
    pub fn new(train: D, val: D, test: D) -> Self {
        Self {
            train: Arc::new(train),
            val: Arc::new(val),
            test: Arc::new(test),
        }
    }

    pub fn get(&self, split: Split) -> &Arc<D> {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }
}

/// Owns the three dataset splits and hands out loaders over them.
///
/// Datasets are built by [`prepare_data`](DataModule::prepare_data); asking
/// for a loader before that fails with [`NotPrepared`](crate::DataError::NotPrepared).
pub trait DataModule {
    type Dataset: SampleDataset;

    /// Build the train, validation and test datasets
    fn prepare_data(&mut self) -> crate::Result<()>;

    /// Prepared datasets, if any
    fn splits(&self) -> Option<&Splits<Self::Dataset>>;

    /// Loader settings for `split`
    fn loader_config(&self, split: Split) -> LoaderConfig;

    fn dataloader(&self, split: Split) -> crate::Result<DataLoader<Self::Dataset>> {
        let splits = self.splits().ok_or(crate::DataError::NotPrepared)?;
        DataLoader::from_config(Arc::clone(splits.get(split)), &self.loader_config(split))
    }

    fn train_dataloader(&self) -> crate::Result<DataLoader<Self::Dataset>> {
        self.dataloader(Split::Train)
    }

    fn val_dataloader(&self) -> crate::Result<DataLoader<Self::Dataset>> {
        self.dataloader(Split::Val)
    }

    fn test_dataloader(&self) -> crate::Result<DataLoader<Self::Dataset>> {
        self.dataloader(Split::Test)
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        candle_core::bail!("index {} out of range for dataset of length {}", index, len);
    }
    Ok(())
}
