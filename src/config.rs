use crate::error::AppError;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

/// Upper bound for `scale_percent`; keeps scaled dimensions inside `u32`.
pub const MAX_SCALE_PERCENT: u32 = 1000;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub parent_directory: PathBuf,
    pub delimiter: String,
    pub pixel_value: Option<u32>,
    pub scale_percent: Option<u32>,
    pub log_level: String,
    #[serde(default)]
    pub provider: ProviderSettings,
}

/// Settings for the Bing image provider. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub adult_filter_off: bool,
    pub filter: String,
    pub timeout_secs: u64,
    pub force_replace: bool,
    pub user_agent: String,
    pub max_pages: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.bing.com".to_string(),
            adult_filter_off: true,
            filter: String::new(),
            timeout_secs: 60,
            force_replace: false,
            user_agent: "Mozilla/5.0 (X11; Fedora; Linux x86_64; rv:60.0) Gecko/20100101 Firefox/60.0"
                .to_string(),
            max_pages: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSettings {
    pub target_pixels: u32,
    pub scale_percent: u32,
}

impl AppConfig {
    /// Loads the configuration file at `path`, then applies `DATASET_*`
    /// environment overrides (`DATASET_PROVIDER__TIMEOUT_SECS=10`).
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let s = Config::builder()
            .set_default("log_level", "info")?
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix("DATASET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parent_directory.as_os_str().is_empty() {
            return Err(ConfigError::Message("parent_directory must not be empty".into()));
        }
        if self.delimiter.is_empty() {
            return Err(ConfigError::Message("delimiter must not be empty".into()));
        }
        if self.pixel_value == Some(0) {
            return Err(ConfigError::Message("pixel_value must be greater than zero".into()));
        }
        if let Some(scale) = self.scale_percent {
            if scale == 0 || scale > MAX_SCALE_PERCENT {
                return Err(ConfigError::Message(format!(
                    "scale_percent must be between 1 and {}, got {}",
                    MAX_SCALE_PERCENT, scale
                )));
            }
        }
        if !matches!(
            self.provider.filter.as_str(),
            "" | "line" | "photo" | "clipart" | "gif" | "transparent"
        ) {
            return Err(ConfigError::Message(format!(
                "unknown provider filter {:?}",
                self.provider.filter
            )));
        }
        Ok(())
    }

    /// The crop stage runs only when both crop keys are configured.
    pub fn crop_settings(&self) -> Option<CropSettings> {
        match (self.pixel_value, self.scale_percent) {
            (Some(target_pixels), Some(scale_percent)) => Some(CropSettings {
                target_pixels,
                scale_percent,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("settings.yaml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_required_and_optional_keys() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "parent_directory: data\ndelimiter: \",\"\npixel_value: 224\nscale_percent: 50\nprovider:\n  timeout_secs: 5\n  filter: photo\n",
        );

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.parent_directory, PathBuf::from("data"));
        assert_eq!(config.delimiter, ",");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.provider.timeout_secs, 5);
        assert_eq!(config.provider.filter, "photo");
        assert!(config.provider.adult_filter_off);
        assert_eq!(
            config.crop_settings(),
            Some(CropSettings {
                target_pixels: 224,
                scale_percent: 50
            })
        );
    }

    #[test]
    fn crop_disabled_without_both_keys() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "parent_directory: data\ndelimiter: \";\"\npixel_value: 64\n");

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.crop_settings(), None);
        assert_eq!(config.provider.base_url, "https://www.bing.com");
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "delimiter: \",\"\n");
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(AppConfig::load(&dir.path().join("absent.yaml")).is_err());
    }

    #[test]
    fn zero_scale_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "parent_directory: data\ndelimiter: \",\"\npixel_value: 64\nscale_percent: 0\n",
        );
        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("scale_percent"));
    }

    #[test]
    fn oversized_scale_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "parent_directory: data\ndelimiter: \",\"\npixel_value: 64\nscale_percent: 4294967295\n",
        );
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("scale_percent"));
    }

    #[test]
    fn empty_delimiter_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "parent_directory: data\ndelimiter: \"\"\n");
        assert!(AppConfig::load(&path).is_err());
    }
}
