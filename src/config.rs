/// Configuration for data modules and batch loaders
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> crate::Result<T> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Settings handed to a [`DataLoader`](crate::data::DataLoader)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Samples per batch
    pub batch_size: usize,

    /// Reshuffle sample order at the start of every epoch
    pub shuffle: bool,

    /// Parallel fetch workers (0 fetches on the calling thread)
    pub num_workers: usize,

    /// Drop the final batch when it is shorter than `batch_size`
    pub drop_last: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            shuffle: false,
            num_workers: 0,
            drop_last: false,
        }
    }
}

impl LoaderConfig {
    /// Single-sample loader used by the whole-image data modules
    pub fn single() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(crate::DataError::Config(
                "batch_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the coordinate-grid data module
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GridDataModuleConfig {
    /// Keep every k-th row and column for the train and validation images
    pub training_downsampling_factor: usize,
}

impl Default for GridDataModuleConfig {
    fn default() -> Self {
        Self {
            training_downsampling_factor: 2,
        }
    }
}

impl GridDataModuleConfig {
    /// Load from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let config: Self = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.training_downsampling_factor == 0 {
            return Err(crate::DataError::Config(
                "training_downsampling_factor must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the patch data module
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PatchDataModuleConfig {
    /// Patches per batch, shared by all three splits
    pub batch_size: usize,

    /// Parallel fetch workers for the training loader
    pub num_workers: usize,
}

impl Default for PatchDataModuleConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            num_workers: 8,
        }
    }
}

impl PatchDataModuleConfig {
    /// Load from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let config: Self = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(crate::DataError::Config(
                "batch_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Loader settings for the training split
    pub fn train_loader(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size,
            shuffle: true,
            num_workers: self.num_workers,
            drop_last: false,
        }
    }

    /// Loader settings for the validation and test splits
    pub fn eval_loader(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size,
            shuffle: true,
            num_workers: 0,
            drop_last: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let grid = GridDataModuleConfig::default();
        assert_eq!(grid.training_downsampling_factor, 2);
        assert!(grid.validate().is_ok());

        let patch = PatchDataModuleConfig::default();
        assert_eq!(patch.batch_size, 64);
        assert_eq!(patch.num_workers, 8);
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_patch_loader_settings() {
        let patch = PatchDataModuleConfig {
            batch_size: 16,
            num_workers: 4,
        };
        let train = patch.train_loader();
        assert_eq!(train.batch_size, 16);
        assert!(train.shuffle);
        assert_eq!(train.num_workers, 4);

        let eval = patch.eval_loader();
        assert!(eval.shuffle);
        assert_eq!(eval.num_workers, 0);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let grid = GridDataModuleConfig {
            training_downsampling_factor: 0,
        };
        assert!(matches!(grid.validate(), Err(crate::DataError::Config(_))));

        let loader = LoaderConfig {
            batch_size: 0,
            ..LoaderConfig::default()
        };
        assert!(loader.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "batch_size": 32 }"#;
        let config: PatchDataModuleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.num_workers, 8);
    }

    #[test]
    fn test_from_json_file() -> crate::Result<()> {
        let path = std::env::temp_dir().join("turboflow_grid_config.json");
        std::fs::write(&path, r#"{ "training_downsampling_factor": 4 }"#)?;

        let config = GridDataModuleConfig::from_json_file(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(config?.training_downsampling_factor, 4);
        Ok(())
    }
}
