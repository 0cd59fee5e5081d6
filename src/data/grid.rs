/// Coordinate-grid dataset and data module for fitting a single image
use candle_core::{Device, Result, Tensor};
use ndarray::Array3;

use super::image::Image;
use super::{check_index, DataModule, SampleDataset, Split, Splits};
use crate::config::{GridDataModuleConfig, LoaderConfig};

/// Offset keeping the first coordinate away from zero
const COORD_EPS: f64 = 1e-15;

/// `n` evenly spaced values from `COORD_EPS` up to, but excluding, 1
pub fn linspace_open(n: usize) -> Vec<f32> {
    let step = (1.0 - COORD_EPS) / n as f64;
    (0..n).map(|i| (COORD_EPS + i as f64 * step) as f32).collect()
}

/// Normalized `(height, width, 2)` grid; channel 0 is x (column), channel 1 is y (row)
pub fn coordinate_grid(height: usize, width: usize, device: &Device) -> Result<Tensor> {
    let xs = linspace_open(width);
    let ys = linspace_open(height);

    let mut data = Vec::with_capacity(height * width * 2);
    for &y in &ys {
        for &x in &xs {
            data.push(x);
            data.push(y);
        }
    }

    Tensor::from_vec(data, (height, width, 2), device)
}

/// A single image paired with its coordinate grid
#[derive(Debug, Clone)]
pub struct CoordinateGridDataset {
    inputs: Tensor,  // [H, W, 2]
    target: Tensor,  // [H, W, C]
}

impl CoordinateGridDataset {
    pub fn new(image: &Image, device: &Device) -> crate::Result<Self> {
        let inputs = coordinate_grid(image.height(), image.width(), device)?;
        Self::with_grid(inputs, image, device)
    }

    /// Pair `image` with a precomputed `(H, W, 2)` grid whose extent must match the image
    pub fn with_grid(inputs: Tensor, image: &Image, device: &Device) -> crate::Result<Self> {
        let inputs = inputs.to_device(device)?;
        let target = image.to_tensor(device)?;

        if inputs.rank() < 2 || inputs.dims()[..2] != target.dims()[..2] {
            return Err(crate::DataError::ShapeMismatch {
                input: inputs.dims().to_vec(),
                target: target.dims().to_vec(),
            });
        }

        Ok(Self { inputs, target })
    }

    pub fn inputs(&self) -> &Tensor {
        &self.inputs
    }

    pub fn target(&self) -> &Tensor {
        &self.target
    }
}

impl SampleDataset for CoordinateGridDataset {
    fn len(&self) -> usize {
        1
    }

    fn get(&self, index: usize, device: &Device) -> Result<(Tensor, Tensor)> {
        check_index(index, self.len())?;
        Ok((self.inputs.to_device(device)?, self.target.to_device(device)?))
    }
}

/// Downsampled train/validation grids and a full-resolution test grid
pub struct CoordinateGridDataModule {
    image: Image,
    config: GridDataModuleConfig,
    device: Device,
    splits: Option<Splits<CoordinateGridDataset>>,
}

impl CoordinateGridDataModule {
    pub fn new(image: Image, config: GridDataModuleConfig, device: Device) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            image,
            config,
            device,
            splits: None,
        })
    }

    /// Validate a raw `(H, W, C)` array and build the module around it
    pub fn from_array(
        array: Array3<f32>,
        config: GridDataModuleConfig,
        device: Device,
    ) -> crate::Result<Self> {
        Self::new(Image::new(array)?, config, device)
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn config(&self) -> &GridDataModuleConfig {
        &self.config
    }
}

impl DataModule for CoordinateGridDataModule {
    type Dataset = CoordinateGridDataset;

    fn prepare_data(&mut self) -> crate::Result<()> {
        let small = self.image.downsample(self.config.training_downsampling_factor)?;

        let train = CoordinateGridDataset::new(&small, &self.device)?;
        let val = CoordinateGridDataset::new(&small, &self.device)?;
        let test = CoordinateGridDataset::new(&self.image, &self.device)?;

        log::info!(
            "Prepared coordinate grids: train/val {:?}, test {:?}",
            small.shape(),
            self.image.shape()
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
