//! # Upscaler Configuration
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Unknown keys are rejected.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `output` | `enhanced_hd.png` | Output path when none is given |
//! | `remote_size_limit` | 5 MiB | Largest input offered to providers |
//! | `input_size_limit` | 10 MiB | Largest file read from disk |
//! | `max_output_pixels` | 64 Mpx | Largest locally upscaled image |
//! | `remote_timeout_secs` | 30 | Per-provider time budget |
//! | `noise` | 1 | Provider denoise level, 0-3 |
//! | `style` | `art` | `art` or `photo` |
//! | `sharpen` | true | Sharpen the local fallback output |
//! | `engine` | `bilinear` | Local resampler: `bilinear` or `simd` |
//! | `allow_oversized_local` | false | Upscale oversized inputs locally instead of failing |
//!
//! Providers are configured in `[waifu2x]` and `[deepai]` tables and tried in
//! that order. Credentials are never stored in the file: `deepai.api_key_env`
//! names the environment variable holding the key.
//!
//! ## Example
//!
//! ```toml
//! remote_timeout_secs = 10
//! style = "photo"
//!
//! [deepai]
//! enabled = true
//! api_key_env = "MY_DEEPAI_KEY"
//! ```
//!
//! ```rust
//! use hd_upscaler::config::UpscaleConfig;
//!
//! let config: UpscaleConfig = toml::from_str("noise = 2").unwrap();
//! assert_eq!(config.noise, 2);
//! assert!(config.validate().is_ok());
//! ```

use std::path::Path;
use std::time::Duration;

use hd_scale::{DEFAULT_MAX_OUTPUT_PIXELS, ResampleEngine};
use serde::Deserialize;
use tracing::info;

use crate::error::{UpscaleError, UpscaleResult};
use crate::pipeline::{DEFAULT_REMOTE_SIZE_LIMIT, EnhancementPipeline};
use crate::remote::{DeepAiProvider, Noise, RequestOptions, Style, Waifu2xProvider, deepai, waifu2x};
use crate::util::DEFAULT_INPUT_SIZE_LIMIT;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Waifu2xConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for Waifu2xConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: waifu2x::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeepAiConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for DeepAiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: deepai::DEFAULT_ENDPOINT.to_string(),
            api_key_env: deepai::DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpscaleConfig {
    pub output: String,
    pub remote_size_limit: u64,
    pub input_size_limit: u64,
    pub max_output_pixels: u64,
    pub remote_timeout_secs: u64,
    pub noise: u8,
    pub style: Style,
    pub sharpen: bool,
    pub engine: String,
    pub allow_oversized_local: bool,
    pub waifu2x: Waifu2xConfig,
    pub deepai: DeepAiConfig,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            output: "enhanced_hd.png".to_string(),
            remote_size_limit: DEFAULT_REMOTE_SIZE_LIMIT,
            input_size_limit: DEFAULT_INPUT_SIZE_LIMIT,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
            remote_timeout_secs: 30,
            noise: 1,
            style: Style::Art,
            sharpen: true,
            engine: "bilinear".to_string(),
            allow_oversized_local: false,
            waifu2x: Waifu2xConfig::default(),
            deepai: DeepAiConfig::default(),
        }
    }
}

impl UpscaleConfig {
    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> UpscaleResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| UpscaleError::io("read config", e).with_path(path.display().to_string()))?;
        toml::from_str(&text).map_err(|e| {
            UpscaleError::config("file", path.display().to_string(), e.message().to_string())
        })
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.output.trim().is_empty() {
            return Err("Output path must not be empty".to_string());
        }
        if self.remote_size_limit == 0 {
            return Err("remote_size_limit must be greater than 0".to_string());
        }
        if self.input_size_limit == 0 {
            return Err("input_size_limit must be greater than 0".to_string());
        }
        if self.max_output_pixels == 0 {
            return Err("max_output_pixels must be greater than 0".to_string());
        }
        if self.remote_timeout_secs == 0 {
            return Err("remote_timeout_secs must be greater than 0".to_string());
        }
        if self.noise > Noise::MAX {
            return Err(format!("noise must be between 0 and {}", Noise::MAX));
        }
        if self.engine.parse::<ResampleEngine>().is_err() {
            return Err(format!("Unknown engine '{}': use bilinear or simd", self.engine));
        }
        if self.waifu2x.enabled && self.waifu2x.endpoint.trim().is_empty() {
            return Err("waifu2x.endpoint must be set when waifu2x is enabled".to_string());
        }
        if self.deepai.enabled && self.deepai.endpoint.trim().is_empty() {
            return Err("deepai.endpoint must be set when deepai is enabled".to_string());
        }
        if self.deepai.enabled && self.deepai.api_key_env.trim().is_empty() {
            return Err("deepai.api_key_env must name an environment variable".to_string());
        }
        Ok(())
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn request_options(&self) -> UpscaleResult<RequestOptions> {
        Ok(RequestOptions {
            noise: Noise::new(self.noise)?,
            style: self.style,
        })
    }

    /// Build a pipeline with providers read from the process environment.
    pub fn build_pipeline(&self, offline: bool) -> UpscaleResult<EnhancementPipeline> {
        self.build_pipeline_with(offline, |name| std::env::var(name).ok())
    }

    /// Build a pipeline, resolving credentials through `lookup`.
    pub fn build_pipeline_with(
        &self,
        offline: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> UpscaleResult<EnhancementPipeline> {
        self.validate()
            .map_err(|reason| UpscaleError::config("config", "", reason))?;
        let engine = self
            .engine
            .parse::<ResampleEngine>()
            .map_err(|e| UpscaleError::config("engine", &self.engine, e.to_string()))?;

        let mut builder = EnhancementPipeline::builder()
            .with_engine(engine)
            .with_remote_size_limit(self.remote_size_limit)
            .with_max_output_pixels(self.max_output_pixels)
            .with_remote_timeout(self.remote_timeout())
            .allow_oversized_local(self.allow_oversized_local);
        if !self.sharpen {
            builder = builder.without_filter();
        }

        if offline {
            info!("offline mode: remote providers disabled");
            return builder.build();
        }

        let client = reqwest::Client::builder()
            .timeout(self.remote_timeout())
            .user_agent(concat!("hd_upscaler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpscaleError::config("http_client", "", e.to_string()))?;
        let options = self.request_options()?;

        if self.waifu2x.enabled {
            builder = builder.with_provider(Waifu2xProvider::new(
                client.clone(),
                &self.waifu2x.endpoint,
                options,
            ));
        }

        if self.deepai.enabled {
            match lookup(&self.deepai.api_key_env).filter(|key| !key.trim().is_empty()) {
                Some(key) => {
                    builder = builder.with_provider(DeepAiProvider::new(
                        client,
                        &self.deepai.endpoint,
                        key,
                        options,
                    ));
                }
                None => info!(
                    var = %self.deepai.api_key_env,
                    "deepai provider disabled: API key variable not set"
                ),
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpscaleConfig::default();
        assert_eq!(config.output, "enhanced_hd.png");
        assert_eq!(config.remote_size_limit, 5 * 1024 * 1024);
        assert_eq!(config.input_size_limit, 10 * 1024 * 1024);
        assert_eq!(config.noise, 1);
        assert_eq!(config.style, Style::Art);
        assert!(config.sharpen);
        assert!(!config.allow_oversized_local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = UpscaleConfig::default();

        config.noise = 4;
        assert!(config.validate().is_err());
        config.noise = 1;

        config.remote_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.remote_timeout_secs = 30;

        config.max_output_pixels = 0;
        assert!(config.validate().is_err());
        config.max_output_pixels = 1024;

        config.engine = "nearest".to_string();
        assert!(config.validate().is_err());
        config.engine = "simd".to_string();

        config.deepai.api_key_env = String::new();
        assert!(config.validate().is_err());
        config.deepai.enabled = false;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: UpscaleConfig = toml::from_str(
            r#"
            style = "photo"
            [deepai]
            api_key_env = "OTHER_KEY"
            "#,
        )
        .unwrap();
        assert_eq!(config.style, Style::Photo);
        assert_eq!(config.deepai.api_key_env, "OTHER_KEY");
        assert_eq!(config.deepai.endpoint, deepai::DEFAULT_ENDPOINT);
        assert!(config.waifu2x.enabled);
    }

    #[test]
    fn test_unknown_keys_and_bad_style_rejected() {
        assert!(toml::from_str::<UpscaleConfig>("colour = 1").is_err());
        assert!(toml::from_str::<UpscaleConfig>("style = \"anime\"").is_err());
    }

    #[test]
    fn test_provider_order_and_missing_key() {
        let config = UpscaleConfig::default();

        let with_key = config
            .build_pipeline_with(false, |name| {
                (name == "DEEPAI_API_KEY").then(|| "k".to_string())
            })
            .unwrap();
        assert_eq!(with_key.provider_names(), vec!["waifu2x", "deepai"]);

        let without_key = config.build_pipeline_with(false, |_| None).unwrap();
        assert_eq!(without_key.provider_names(), vec!["waifu2x"]);

        let offline = config.build_pipeline_with(true, |_| Some("k".into())).unwrap();
        assert!(offline.provider_names().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upscale.toml");
        std::fs::write(
            &path,
            "remote_timeout_secs = 5\nmax_output_pixels = 4096\n[waifu2x]\nenabled = false\n",
        )
        .unwrap();
        let config = UpscaleConfig::load(&path).unwrap();
        assert_eq!(config.max_output_pixels, 4096);
        assert_eq!(config.remote_timeout(), Duration::from_secs(5));
        assert!(!config.waifu2x.enabled);

        std::fs::write(&path, "remote_timeout_secs = \"soon\"").unwrap();
        assert!(UpscaleConfig::load(&path).is_err());
    }
}
