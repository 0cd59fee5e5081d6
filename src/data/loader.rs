/// Batch loader over any [`SampleDataset`]
use candle_core::{Device, Result, Tensor};
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::sync::Arc;

use super::{BatchDataLoader, SampleDataset};
use crate::config::LoaderConfig;

/// Data loader yielding stacked (input, target) batches
pub struct DataLoader<D> {
    dataset: Arc<D>,
    batch_size: usize,
    current_idx: usize,
    indices: Vec<usize>,
    shuffle: bool,
    drop_last: bool,
    pool: Option<rayon::ThreadPool>,
}

impl<D: SampleDataset> DataLoader<D> {
    /// Create new data loader fetching on the calling thread
    pub fn new(dataset: Arc<D>, batch_size: usize, shuffle: bool) -> Self {
        let num_samples = dataset.len();
        let mut indices: Vec<usize> = (0..num_samples).collect();

        if shuffle {
            let mut rng = rand::thread_rng();
            indices.shuffle(&mut rng);
        }

        Self {
            dataset,
            batch_size: batch_size.max(1),
            current_idx: 0,
            indices,
            shuffle,
            drop_last: false,
            pool: None,
        }
    }

    /// Create from a validated [`LoaderConfig`]
    pub fn from_config(dataset: Arc<D>, config: &LoaderConfig) -> crate::Result<Self> {
        config.validate()?;
        Self::new(dataset, config.batch_size, config.shuffle)
            .drop_last(config.drop_last)
            .num_workers(config.num_workers)
    }

    /// Drop the final batch when it is short
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Fetch samples on a pool of `num_workers` threads (0 disables the pool)
    pub fn num_workers(mut self, num_workers: usize) -> crate::Result<Self> {
        self.pool = if num_workers == 0 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .thread_name(|i| format!("turboflow-fetch-{}", i))
                .build()
                .map_err(|e| crate::DataError::Config(format!("worker pool: {}", e)))?;
            Some(pool)
        };
        Ok(self)
    }

    fn fetch(&self, batch_indices: &[usize], device: &Device) -> Result<Vec<(Tensor, Tensor)>> {
        let dataset = &self.dataset;
        match &self.pool {
            Some(pool) => pool.install(|| {
                batch_indices
                    .par_iter()
                    .map(|&idx| dataset.get(idx, device))
                    .collect()
            }),
            None => batch_indices
                .iter()
                .map(|&idx| dataset.get(idx, device))
                .collect(),
        }
    }

    /// Get next batch (inputs, targets), each stacked along a new leading axis
    pub fn next_batch(&mut self, device: &Device) -> Result<Option<(Tensor, Tensor)>> {
        if self.current_idx >= self.indices.len() {
            return Ok(None);
        }

        let end_idx = (self.current_idx + self.batch_size).min(self.indices.len());
        if self.drop_last && end_idx - self.current_idx < self.batch_size {
            self.current_idx = self.indices.len();
            return Ok(None);
        }

        let samples = self.fetch(&self.indices[self.current_idx..end_idx], device)?;
        self.current_idx = end_idx;

        let (inputs, targets): (Vec<Tensor>, Vec<Tensor>) = samples.into_iter().unzip();
        let input_tensor = Tensor::stack(&inputs, 0)?;
        let target_tensor = Tensor::stack(&targets, 0)?;

        log::debug!(
            "Batch inputs {:?}, targets {:?}",
            input_tensor.dims(),
            target_tensor.dims()
        );

        Ok(Some((input_tensor, target_tensor)))
    }

    /// Reset loader for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;

        if self.shuffle {
            let mut rng = rand::thread_rng();
            self.indices.shuffle(&mut rng);
        }
    }

    /// Get number of batches per epoch
    pub fn num_batches(&self) -> usize {
        if self.drop_last {
            self.dataset.len() / self.batch_size
        } else {
            (self.dataset.len() + self.batch_size - 1) / self.batch_size
        }
    }

    /// Restart the epoch and iterate over its batches
    pub fn batches(&mut self, device: &Device) -> Batches<'_, D> {
        self.reset();
        Batches {
            loader: self,
            device: device.clone(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    /// Number of fetch workers (0 when fetching on the calling thread)
    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.current_num_threads())
    }

    /// Get dataset reference
    pub fn dataset(&self) -> &D {
        &self.dataset
    }
}

impl<D: SampleDataset> BatchDataLoader for DataLoader<D> {
    fn next_batch(&mut self, device: &Device) -> Result<Option<(Tensor, Tensor)>> {
        DataLoader::next_batch(self, device)
    }

    fn reset(&mut self) {
        DataLoader::reset(self)
    }

    fn num_batches(&self) -> usize {
        DataLoader::num_batches(self)
    }
}

/// One epoch of batches from a [`DataLoader`]
pub struct Batches<'a, D> {
    loader: &'a mut DataLoader<D>,
    device: Device,
}

impl<D: SampleDataset> Iterator for Batches<'_, D> {
    type Item = Result<(Tensor, Tensor)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch(&self.device).transpose()
    }
}
