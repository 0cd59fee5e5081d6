/// Image arrays with values in [-1, 1]
use candle_core::{Device, Result, Tensor};
use ndarray::{s, Array2, Array3, ArrayD, ArrayView, Axis, Dimension, Ix3};
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use std::fs::File;
use std::path::Path;

/// Largest absolute value in `values`. NaN propagates.
pub fn max_abs<'a, I: IntoIterator<Item = &'a f32>>(values: I) -> f32 {
    values.into_iter().fold(0.0f32, |max, &x| {
        let a = x.abs();
        if a > max || a.is_nan() {
            a
        } else {
            max
        }
    })
}

/// Fail unless every value lies in [-1, 1]
pub fn check_range<'a, I: IntoIterator<Item = &'a f32>>(values: I) -> crate::Result<()> {
    let max = max_abs(values);
    // negated so NaN is rejected too
    if !(max <= 1.0) {
        return Err(crate::DataError::OutOfRange { max });
    }
    Ok(())
}

/// Copy an array into a contiguous F32 tensor of the same shape
pub fn array_to_tensor<D: Dimension>(
    array: ArrayView<'_, f32, D>,
    device: &Device,
) -> Result<Tensor> {
    let shape = array.shape().to_vec();
    let data: Vec<f32> = array.iter().copied().collect();
    Tensor::from_vec(data, shape, device)
}

/// Read a `.npy` file as f32, casting from f64 when the descriptor says so
pub fn read_npy_f32<P: AsRef<Path>>(path: P) -> crate::Result<ArrayD<f32>> {
    let path = path.as_ref();
    let npy_err =
        |e: ReadNpyError| crate::DataError::Npy(format!("Failed to read {:?}: {}", path, e));

    match ArrayD::<f32>::read_npy(File::open(path)?) {
        Ok(array) => Ok(array),
        Err(ReadNpyError::WrongDescriptor(descr)) => {
            log::debug!("{:?} has descriptor {:?}, retrying as f64", path, descr);
            let array = ArrayD::<f64>::read_npy(File::open(path)?).map_err(npy_err)?;
            Ok(array.mapv(|x| x as f32))
        }
        Err(e) => Err(npy_err(e)),
    }
}

/// A `height x width x channels` image whose values lie in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Image(Array3<f32>);

impl Image {
    /// Wrap an array, rejecting values outside [-1, 1]
    pub fn new(array: Array3<f32>) -> crate::Result<Self> {
        check_range(array.iter())?;
        Ok(Self(array))
    }

    /// Wrap a single-channel image, adding a trailing channel axis
    pub fn from_gray(array: Array2<f32>) -> crate::Result<Self> {
        Self::new(array.insert_axis(Axis(2)))
    }

    /// Load a 2D or 3D image saved with `numpy.save`
    pub fn from_npy<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading image from: {:?}", path);

        let array = read_npy_f32(path)?;
        let array = match array.ndim() {
            2 => array.insert_axis(Axis(2)),
            3 => array,
            n => {
                return Err(crate::DataError::Config(format!(
                    "Image must be 2D or 3D, got {} dimensions",
                    n
                )))
            }
        };
        let array = array
            .into_dimensionality::<Ix3>()
            .map_err(|e| crate::DataError::Npy(e.to_string()))?;

        Self::new(array)
    }

    pub fn height(&self) -> usize {
        self.0.dim().0
    }

    pub fn width(&self) -> usize {
        self.0.dim().1
    }

    pub fn channels(&self) -> usize {
        self.0.dim().2
    }

    pub fn shape(&self) -> [usize; 3] {
        let (h, w, c) = self.0.dim();
        [h, w, c]
    }

    pub fn as_array(&self) -> &Array3<f32> {
        &self.0
    }

    /// Keep every `factor`-th row and column, starting at the first.
    ///
    /// The result is `ceil(h / factor) x ceil(w / factor)`.
    pub fn downsample(&self, factor: usize) -> crate::Result<Self> {
        if factor == 0 {
            return Err(crate::DataError::Config(
                "downsampling factor must be > 0".to_string(),
            ));
        }
        let step = factor as isize;
        let array = self.0.slice(s![..;step, ..;step, ..]).to_owned();
        Ok(Self(array))
    }

    /// Convert to an F32 tensor of shape `(height, width, channels)`
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        array_to_tensor(self.0.view(), device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn ramp(h: usize, w: usize) -> Array2<f32> {
        Array::from_shape_fn((h, w), |(i, j)| (i * w + j) as f32 / (h * w) as f32)
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut array = ramp(4, 4);
        array[[1, 2]] = 1.5;
        match Image::from_gray(array) {
            Err(crate::DataError::OutOfRange { max }) => assert_eq!(max, 1.5),
            other => panic!("expected range error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_negative_out_of_range() {
        let mut array = ramp(3, 3);
        array[[0, 0]] = -2.0;
        let err = Image::from_gray(array).unwrap_err();
        assert_eq!(err.to_string(), "Image is not within [-1, 1]. Max is 2.00");
    }

    #[test]
    fn test_rejects_nan() {
        let mut array = ramp(2, 2);
        array[[0, 1]] = f32::NAN;
        assert!(Image::from_gray(array).is_err());
    }

    #[test]
    fn test_accepts_bounds() {
        let mut array = ramp(2, 2);
        array[[0, 0]] = -1.0;
        array[[1, 1]] = 1.0;
        assert!(Image::from_gray(array).is_ok());
    }

    #[test]
    fn test_from_gray_adds_channel() -> crate::Result<()> {
        let image = Image::from_gray(ramp(5, 3))?;
        assert_eq!(image.shape(), [5, 3, 1]);
        Ok(())
    }

    #[test]
    fn test_downsample_shape() -> crate::Result<()> {
        let image = Image::new(Array3::zeros((7, 7, 3)))?;
        assert_eq!(image.downsample(2)?.shape(), [4, 4, 3]);
        assert_eq!(image.downsample(3)?.shape(), [3, 3, 3]);
        assert_eq!(image.downsample(1)?, image);
        assert!(image.downsample(0).is_err());
        Ok(())
    }

    #[test]
    fn test_downsample_keeps_strided_pixels() -> crate::Result<()> {
        let image = Image::from_gray(ramp(4, 4))?;
        let small = image.downsample(2)?;
        let a = small.as_array();
        assert_eq!(a[[0, 0, 0]], image.as_array()[[0, 0, 0]]);
        assert_eq!(a[[1, 1, 0]], image.as_array()[[2, 2, 0]]);
        assert_eq!(a[[0, 1, 0]], image.as_array()[[0, 2, 0]]);
        Ok(())
    }

    #[test]
    fn test_to_tensor() -> crate::Result<()> {
        let image = Image::from_gray(ramp(2, 3))?;
        let tensor = image.to_tensor(&Device::Cpu)?;
        assert_eq!(tensor.dims(), &[2, 3, 1]);
        let values = tensor.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(values, image.as_array().iter().copied().collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_from_npy_f64() -> crate::Result<()> {
        use ndarray_npy::WriteNpyExt;

        let path = std::env::temp_dir().join("turboflow_image_f64.npy");
        let array = Array2::<f64>::from_elem((3, 2), 0.5);
        array
            .write_npy(File::create(&path)?)
            .map_err(|e| crate::DataError::Npy(e.to_string()))?;

        let image = Image::from_npy(&path);
        std::fs::remove_file(&path).ok();

        let image = image?;
        assert_eq!(image.shape(), [3, 2, 1]);
        assert!(image.as_array().iter().all(|&x| x == 0.5));
        Ok(())
    }

    #[test]
    fn test_from_npy_truncated_f32() -> crate::Result<()> {
        use ndarray_npy::WriteNpyExt;

        let path = std::env::temp_dir().join("turboflow_image_truncated.npy");
        Array2::<f32>::zeros((8, 8))
            .write_npy(File::create(&path)?)
            .map_err(|e| crate::DataError::Npy(e.to_string()))?;
        let bytes = std::fs::read(&path)?;
        std::fs::write(&path, &bytes[..bytes.len() - 10])?;

        let result = Image::from_npy(&path);
        std::fs::remove_file(&path).ok();

        match result {
            Err(crate::DataError::Npy(msg)) => {
                assert!(!msg.contains("descriptor"), "unexpected message: {}", msg)
            }
            other => panic!("expected npy error, got {:?}", other),
        }
        Ok(())
    }
}
