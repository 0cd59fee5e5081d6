/// Dataset and data module for pre-split (input, target) arrays
use candle_core::{Device, Result, Tensor};
use ndarray::ArrayD;

use super::image::{array_to_tensor, check_range};
use super::{check_index, DataModule, SampleDataset, Split, Splits};
use crate::config::LoaderConfig;

/// An (input, target) array pair
pub type ArrayPair = (ArrayD<f32>, ArrayD<f32>);

/// One (input, target) pair treated as a single sample.
///
/// Targets must lie in [-1, 1]. Inputs and targets that disagree on their
/// first two dimensions are logged, not rejected.
#[derive(Debug, Clone)]
pub struct PairedDataset {
    inputs: Tensor,
    target: Tensor,
}

impl PairedDataset {
    pub fn new(inputs: &ArrayD<f32>, target: &ArrayD<f32>, device: &Device) -> crate::Result<Self> {
        check_range(target.iter())?;

        log::debug!("Inputs shape: {:?}", inputs.shape());
        log::debug!("Target shape: {:?}", target.shape());

        let input_extent = inputs.shape().iter().take(2);
        let target_extent = target.shape().iter().take(2);
        if input_extent.ne(target_extent) {
            log::warn!(
                "Dimension error: inputs {:?}, target {:?}",
                inputs.shape(),
                target.shape()
            );
        }

        Ok(Self {
            inputs: array_to_tensor(inputs.view(), device)?,
            target: array_to_tensor(target.view(), device)?,
        })
    }

    pub fn inputs(&self) -> &Tensor {
        &self.inputs
    }

    pub fn target(&self) -> &Tensor {
        &self.target
    }
}

impl SampleDataset for PairedDataset {
    fn len(&self) -> usize {
        1
    }

    fn get(&self, index: usize, device: &Device) -> Result<(Tensor, Tensor)> {
        check_index(index, self.len())?;
        Ok((self.inputs.to_device(device)?, self.target.to_device(device)?))
    }
}

/// Single-sample loaders over caller-provided train/val/test pairs
pub struct PairedDataModule {
    train_data: ArrayPair,
    val_data: ArrayPair,
    test_data: ArrayPair,
    device: Device,
    splits: Option<Splits<PairedDataset>>,
}

impl PairedDataModule {
    pub fn new(
        train_data: ArrayPair,
        val_data: ArrayPair,
        test_data: ArrayPair,
        device: Device,
    ) -> Self {
        Self {
            train_data,
            val_data,
            test_data,
            device,
            splits: None,
        }
    }
}

impl DataModule for PairedDataModule {
    type Dataset = PairedDataset;

    fn prepare_data(&mut self) -> crate::Result<()> {
        let build = |(x, y): &ArrayPair| PairedDataset::new(x, y, &self.device);
        let train = build(&self.train_data)?;
        let val = build(&self.val_data)?;
        let test = build(&self.test_data)?;

        log::info!(
            "Prepared paired datasets: train {:?}, val {:?}, test {:?}",
            train.inputs.dims(),
            val.inputs.dims(),
            test.inputs.dims()
        );

        self.splits = Some(Splits::new(train, val, test));
        Ok(())
    }

    fn splits(&self) -> Option<&Splits<Self::Dataset>> {
        self.splits.as_ref()
    }

    fn loader_config(&self, _split: Split) -> LoaderConfig {
        LoaderConfig::single()
    }
}
