/// Walk the coordinate-grid and patch loaders the way a training loop would
use candle_core::Device;
use ndarray::{Array, ArrayD, IxDyn};
use turboflow::data::{BatchDataLoader, CoordinateGridDataModule, DataModule, PatchDataModule};
use turboflow::{GridDataModuleConfig, Image, PatchDataModuleConfig};

fn drain(name: &str, loader: &mut impl BatchDataLoader, device: &Device) -> anyhow::Result<()> {
    loader.reset();
    let mut count = 0;
    while let Some((inputs, targets)) = loader.next_batch(device)? {
        count += 1;
        log::debug!("{} batch {}: {:?} -> {:?}", name, count, inputs.dims(), targets.dims());
    }
    log::info!("{}: {} batches (expected {})", name, count, loader.num_batches());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = if candle_core::utils::cuda_is_available() {
        Device::new_cuda(0)?
    } else {
        Device::Cpu
    };
    log::info!("Using device: {:?}", device);

    // First argument: optional .npy image in [-1, 1]; otherwise a synthetic gradient
    let image = match std::env::args().nth(1) {
        Some(path) => Image::from_npy(path)?,
        None => Image::from_gray(Array::from_shape_fn((64, 64), |(i, j)| {
            ((i + j) as f32 / 128.0) * 2.0 - 1.0
        }))?,
    };
    log::info!("Image shape: {:?}", image.shape());

    let grid_config = GridDataModuleConfig::default();
    let mut grid = CoordinateGridDataModule::new(image, grid_config, device.clone())?;
    grid.prepare_data()?;
    drain("grid/train", &mut grid.train_dataloader()?, &device)?;
    drain("grid/val", &mut grid.val_dataloader()?, &device)?;
    drain("grid/test", &mut grid.test_dataloader()?, &device)?;

    let patches = |n: usize| {
        let inputs: Vec<ArrayD<f32>> = (0..n).map(|_| ArrayD::zeros(IxDyn(&[8, 8, 2]))).collect();
        let targets: Vec<ArrayD<f32>> = (0..n).map(|_| ArrayD::zeros(IxDyn(&[8, 8, 3]))).collect();
        (inputs, targets)
    };
    let patch_config = PatchDataModuleConfig::default();
    let mut patch = PatchDataModule::new(patches(500), patches(100), patches(100), patch_config)?;
    patch.prepare_data()?;
    drain("patch/train", &mut patch.train_dataloader()?, &device)?;
    drain("patch/val", &mut patch.val_dataloader()?, &device)?;
    drain("patch/test", &mut patch.test_dataloader()?, &device)?;

    Ok(())
}
