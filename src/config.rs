use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::models::DEFAULT_PROXY_PREFIX;
use crate::api::FetchConfig;
use crate::domain::AppError;
use crate::utils::{is_safe_relative_path, output_filename};

const ENV_PREFIX: &str = "FROSTY_CUSTOMIZER";
const DEFAULT_CONFIG_FILE: &str = "customizer";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub proxy_prefix: String,
    pub catalog_path: PathBuf,
    pub product_name: String,
    pub product_version: String,
    /// Directory inside the base archive that receives every extra.
    pub injection_dir: String,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            catalog_path: PathBuf::from("mappings.json"),
            product_name: "FrostyEditor".to_string(),
            product_version: "1.0.6.3".to_string(),
            injection_dir: "FrostyEditor/".to_string(),
            verbose: false,
        }
    }
}

impl AppConfig {
    /// Defaults, then `path` (or an optional `customizer.*` in the working
    /// directory), then `FROSTY_CUSTOMIZER__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("proxy_prefix", defaults.proxy_prefix)
            .and_then(|b| {
                b.set_default(
                    "catalog_path",
                    defaults.catalog_path.to_string_lossy().into_owned(),
                )
            })
            .and_then(|b| b.set_default("product_name", defaults.product_name))
            .and_then(|b| b.set_default("product_version", defaults.product_version))
            .and_then(|b| b.set_default("injection_dir", defaults.injection_dir))
            .and_then(|b| b.set_default("verbose", defaults.verbose))
            .map_err(|e| AppError::Config(e.to_string()))?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            proxy_prefix: self.proxy_prefix.clone(),
            ..FetchConfig::default()
        }
    }

    pub fn output_filename(&self) -> String {
        output_filename(&self.product_name, &self.product_version)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.product_name.trim().is_empty() || self.product_version.trim().is_empty() {
            return Err(AppError::Config(
                "product_name and product_version must not be empty".to_string(),
            ));
        }

        if !is_safe_relative_path(&self.injection_dir) {
            return Err(AppError::Config(format!(
                "injection_dir '{}' must be a relative path inside the archive",
                self.injection_dir
            )));
        }

        if self.catalog_path.as_os_str().is_empty() {
            return Err(AppError::Config("catalog_path must not be empty".to_string()));
        }

        Ok(())
    }
}
