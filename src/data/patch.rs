/// Patch dataset and data module with real batching
use candle_core::{Device, Result, Tensor};
use ndarray::{ArrayD, Axis};
use std::path::Path;

use super::image::{array_to_tensor, read_npy_f32};
use super::{check_index, DataModule, SampleDataset, Split, Splits};
use crate::config::{LoaderConfig, PatchDataModuleConfig};

/// Parallel input and target patch sequences
pub type PatchPairs = (Vec<ArrayD<f32>>, Vec<ArrayD<f32>>);

/// Pre-extracted (input, target) patches, converted to tensors on access
#[derive(Debug, Clone)]
pub struct PatchDataset {
    inputs: Vec<ArrayD<f32>>,
    targets: Vec<ArrayD<f32>>,
}

impl PatchDataset {
    pub fn new(inputs: Vec<ArrayD<f32>>, targets: Vec<ArrayD<f32>>) -> crate::Result<Self> {
        if inputs.len() != targets.len() {
            return Err(crate::DataError::LengthMismatch {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }
        Ok(Self { inputs, targets })
    }

    /// Split arrays along their leading sample axis
    pub fn from_stacked(inputs: &ArrayD<f32>, targets: &ArrayD<f32>) -> crate::Result<Self> {
        if inputs.ndim() == 0 || targets.ndim() == 0 {
            return Err(crate::DataError::Config(
                "stacked patches need a leading sample axis".to_string(),
            ));
        }
        let split = |a: &ArrayD<f32>| -> Vec<ArrayD<f32>> {
            a.axis_iter(Axis(0)).map(|p| p.to_owned()).collect()
        };
        Self::new(split(inputs), split(targets))
    }

    /// Load `(N, ...)` input and target arrays saved with `numpy.save`
    pub fn from_npy<P: AsRef<Path>, Q: AsRef<Path>>(inputs: P, targets: Q) -> crate::Result<Self> {
        log::info!(
            "Loading patches from: {:?}, {:?}",
            inputs.as_ref(),
            targets.as_ref()
        );
        let inputs = read_npy_f32(inputs)?;
        let targets = read_npy_f32(targets)?;
        log::info!(
            "Loaded patches: inputs {:?}, targets {:?}",
            inputs.shape(),
            targets.shape()
        );
        Self::from_stacked(&inputs, &targets)
    }
}

impl SampleDataset for PatchDataset {
    fn len(&self) -> usize {
        self.inputs.len()
    }

    fn get(&self, index: usize, device: &Device) -> Result<(Tensor, Tensor)> {
        check_index(index, self.len())?;
        let x = array_to_tensor(self.inputs[index].view(), device)?;
        let y = array_to_tensor(self.targets[index].view(), device)?;
        Ok((x, y))
    }
}

/// Shuffled, batched loaders over train/val/test patches.
///
/// Training fetches with `num_workers` threads; validation and test fetch
/// on the calling thread.
pub struct PatchDataModule {
    pending: Option<(PatchPairs, PatchPairs, PatchPairs)>,
    config: PatchDataModuleConfig,
    splits: Option<Splits<PatchDataset>>,
}

impl PatchDataModule {
    pub fn new(
        train_data: PatchPairs,
        val_data: PatchPairs,
        test_data: PatchPairs,
        config: PatchDataModuleConfig,
    ) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            pending: Some((train_data, val_data, test_data)),
            config,
            splits: None,
        })
    }

    pub fn config(&self) -> &PatchDataModuleConfig {
        &self.config
    }
}

impl DataModule for PatchDataModule {
    type Dataset = PatchDataset;

    fn prepare_data(&mut self) -> crate::Result<()> {
        let Some((train, val, test)) = self.pending.as_ref() else {
            // patches were already moved into the datasets
            return Ok(());
        };

        // check every split before taking ownership
        for (x, y) in [train, val, test] {
            if x.len() != y.len() {
                return Err(crate::DataError::LengthMismatch {
                    inputs: x.len(),
                    targets: y.len(),
                });
            }
        }

        let Some(((train_x, train_y), (val_x, val_y), (test_x, test_y))) = self.pending.take()
        else {
            return Ok(());
        };
        let train = PatchDataset::new(train_x, train_y)?;
        let val = PatchDataset::new(val_x, val_y)?;
        let test = PatchDataset::new(test_x, test_y)?;

        log::info!(
            "Prepared patch datasets: train {}, val {}, test {} patches",
            train.len(),
            val.len(),
            test.len()
        );

        self.splits = Some(Splits::new(train, val, test));
        Ok(())
    }

    fn splits(&self) -> Option<&Splits<Self::Dataset>> {
        self.splits.as_ref()
    }

    fn loader_config(&self, split: Split) -> LoaderConfig {
        match split {
            Split::Train => self.config.train_loader(),
            Split::Val | Split::Test => self.config.eval_loader(),
        }
    }
}
